//! Durable Storage Persistence
//!
//! Browsers and mobile platforms may evict local data under storage pressure.
//! Hosts that can pin the application's storage expose that through
//! [`StoragePersistence`].

use crate::{error::Result, platform::PlatformSendSync};

/// Best-effort request for eviction-proof storage.
///
/// - **Web**: `navigator.storage.persist()`
/// - **Desktop**: storage is always durable
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::StoragePersistence;
///
/// async fn startup(storage: &dyn StoragePersistence) {
///     if let Err(e) = storage.persist().await {
///         tracing::warn!(error = %e, "Storage may be evicted");
///     }
/// }
/// ```
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait StoragePersistence: PlatformSendSync {
    /// Ask the platform to keep local data durable.
    ///
    /// Returns `Ok(true)` when granted and `Ok(false)` when the platform
    /// declined without an error.
    async fn persist(&self) -> Result<bool>;

    /// Whether storage is already durable.
    async fn is_persisted(&self) -> Result<bool> {
        Ok(false)
    }
}
