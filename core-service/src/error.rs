use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("No book is open")]
    NoActiveBook,
}

pub type Result<T> = std::result::Result<T, ServiceError>;
