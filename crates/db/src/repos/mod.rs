//! Repository traits for update store operations.

pub mod assets;
pub mod updates;

pub use assets::AssetRepo;
pub use updates::UpdateRepo;
