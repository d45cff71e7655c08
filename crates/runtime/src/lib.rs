//! Selection policies, launcher, loader, and reaper for the hangar update
//! core.
//!
//! The flow between the pieces: the launch policy picks the stored update
//! to run at process start; the launcher materializes its assets and
//! reports a runnable bundle; the load policy decides whether a freshly
//! fetched manifest is persisted for next launch; the reaper periodically
//! deletes superseded updates and garbage-collects orphaned assets.
//!
//! The launcher and reaper may run concurrently: the reap policy never
//! selects the currently launched update, so a launch never races its own
//! deletion.

pub mod controller;
pub mod error;
pub mod launcher;
pub mod loader;
pub mod policy;
pub mod reaper;

pub use controller::UpdatesController;
pub use error::{LaunchError, LoadError};
pub use launcher::{LaunchedBundle, Launcher};
pub use loader::{LoadOutcome, Loader};
pub use policy::{
    BoundedRetentionReaperPolicy, FilterAwareLauncherPolicy, FilterAwareLoaderPolicy,
    FilterAwareReaperPolicy, KeepNewestReaperPolicy, LauncherSelectionPolicy,
    LoaderSelectionPolicy, NewestLauncherPolicy, ReaperSelectionPolicy, SelectionPolicy,
};
pub use reaper::{run_reap_task, ReapContext, ReapStats, Reaper};
