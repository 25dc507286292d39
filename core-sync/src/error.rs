use bridge_traits::error::BridgeError;
use core_library::error::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote returned HTTP {status} for {url}")]
    Remote { status: u16, url: String },

    #[error("Malformed position payload from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Local store error: {0}")]
    Library(#[from] LibraryError),

    #[error("No active book")]
    NoActiveBook,
}

impl SyncError {
    /// Failures that leave the local record set untouched and are retried
    /// on the next trigger.
    pub fn is_network_error(&self) -> bool {
        match self {
            SyncError::Remote { .. } | SyncError::Malformed { .. } | SyncError::Bridge(_) => true,
            SyncError::Library(e) => e.is_network_error(),
            SyncError::NoActiveBook => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
