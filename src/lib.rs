//! Workspace facade crate.
//!
//! Re-exports the client service so host applications can depend on
//! `audiobook-client` and enable the documented features without wiring each
//! workspace crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
