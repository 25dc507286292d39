//! Background Task Dispatch
//!
//! Event listeners run synchronously inside the emitting call. Work that must
//! suspend (store writes, network pushes) is handed to a [`TaskSpawner`] so the
//! host's executor drives it to completion.

use crate::platform::{PlatformBoxFuture, PlatformSendSync};

/// Fire-and-forget task dispatch.
///
/// - **Desktop**: `tokio::spawn` on the current runtime
/// - **Web**: `wasm_bindgen_futures::spawn_local`
///
/// # Example
///
/// ```ignore
/// use bridge_traits::background::TaskSpawner;
///
/// fn push_later(spawner: &dyn TaskSpawner) {
///     spawner.spawn(Box::pin(async move {
///         tracing::debug!("running deferred push");
///     }));
/// }
/// ```
pub trait TaskSpawner: PlatformSendSync {
    /// Schedule a future for execution. Must not block the caller.
    fn spawn(&self, task: PlatformBoxFuture<'static, ()>);
}
