use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Malformed response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl LibraryError {
    /// Whether the failure came from the network rather than the local store.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            LibraryError::Bridge(_) | LibraryError::Http { .. } | LibraryError::Decode { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
