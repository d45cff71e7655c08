//! Remote fetch trait definition.

use crate::error::RemoteError;
use async_trait::async_trait;
use bytes::Bytes;

/// The externally supplied fetch primitive for remote asset bytes.
///
/// HTTP transport, retries, and caching headers live behind this seam; the
/// launcher calls it once per missing asset and treats any error as that
/// asset being unavailable for the launch attempt in progress.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the full contents of a remote asset.
    async fn fetch(&self, url: &str) -> Result<Bytes, RemoteError>;
}
