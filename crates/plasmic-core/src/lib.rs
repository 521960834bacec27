//! Core sync layer for plasmic
//!
//! This crate pulls generated component code from the Plasmic server into a
//! local source tree, implementing:
//!
//! - **State store**: `plasmic.json` and `plasmic.lock`, with schema migrations
//! - **Version resolution**: which project versions to sync, dependencies included
//! - **Path repair**: finding files the user moved and normalizing extensions
//! - **SyncEngine**: one buffered transaction per sync, from fetch to post-sync commands
//! - **Import fixup**: repointing marker imports at the files' current locations
//!
//! # Architecture
//!
//! `plasmic-core` sits above the Layer 0 crates and below the CLI:
//!
//! ```text
//!          plasmic-cli
//!               |
//!         plasmic-core
//!               |
//!       +-------+-------+
//!       |               |
//!   plasmic-fs    plasmic-code
//! ```
//!
//! The server is reached through the [`PlasmicApi`] trait and questions to
//! the user go through [`Confirmer`], so the whole pipeline runs against
//! in-memory fakes in tests.
//!
//! # Example
//!
//! ```ignore
//! use plasmic_core::{AssumeDefaults, SyncEngine, SyncOptions};
//!
//! let engine = SyncEngine::new(&api, &AssumeDefaults);
//! let report = engine.sync(&SyncOptions::new("."))?;
//! println!("{} files written", report.files_written());
//! ```

pub mod api;
pub mod config;
pub mod confirm;
pub mod error;
pub mod fixup;
pub mod hooks;
pub mod packages;
pub mod paths;
pub mod resolve;
pub mod sync;
pub mod version;

pub use api::PlasmicApi;
pub use config::{Config, Lock, StateStore};
pub use confirm::{AssumeDefaults, Confirmer, FixedAnswer};
pub use error::{Error, Result};
pub use resolve::{ProjectSpec, VersionResolver};
pub use sync::{SyncEngine, SyncOptions, SyncReport, UpdateSummary};
pub use version::VersionRange;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn error_config_not_found_displays_correctly() {
        let error = Error::ConfigNotFound {
            path: PathBuf::from("/path/to/app"),
        };

        let display = error.to_string();
        assert!(display.contains("/path/to/app"), "got: {display}");
        assert!(display.contains("plasmic.json"), "got: {display}");
    }
}
