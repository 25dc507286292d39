//! Background Task Execution Implementation

use bridge_traits::{
    background::TaskSpawner,
    error::{BridgeError, Result},
    platform::PlatformBoxFuture,
};
use tokio::runtime::Handle;
use tracing::trace;

/// Tokio-backed task spawner for desktop.
///
/// Tasks run on the runtime the spawner was created in, so listeners invoked
/// from non-async host callbacks can still hand work to it.
#[derive(Debug, Clone)]
pub struct TokioTaskSpawner {
    handle: Handle,
}

impl TokioTaskSpawner {
    /// Bind to the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Fails when called outside a Tokio runtime.
    pub fn new() -> Result<Self> {
        Handle::try_current()
            .map(Self::with_handle)
            .map_err(|e| BridgeError::NotAvailable(format!("Tokio runtime: {e}")))
    }

    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl TaskSpawner for TokioTaskSpawner {
    fn spawn(&self, task: PlatformBoxFuture<'static, ()>) {
        trace!("Spawning background task");
        self.handle.spawn(task);
    }
}
