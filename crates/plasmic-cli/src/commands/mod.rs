//! Command implementations for plasmic-cli

pub mod auth;
pub mod sync;

pub use auth::run_auth;
pub use sync::run_sync;
