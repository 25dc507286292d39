//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with retry and exponential backoff
//! - `TaskSpawner` using the Tokio runtime
//! - `StoragePersistence` creating the per-user data directory
//!
//! Desktop hosts supply their own `MediaElement`; the core never renders
//! audio.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioTaskSpawner};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http = ReqwestHttpClient::new()?;
//!     let spawner = TokioTaskSpawner::new()?;
//!     // Hand both to core_service::CoreDependencies
//!     Ok(())
//! }
//! ```

mod background;
mod http;
mod storage;

pub use background::TokioTaskSpawner;
pub use http::ReqwestHttpClient;
pub use storage::{default_data_dir, default_database_path, DesktopStoragePersistence};
