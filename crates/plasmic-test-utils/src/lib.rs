//! Shared test utilities for the plasmic workspace.
//!
//! This crate provides standardised test fixtures to eliminate duplication
//! across crate test suites. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`api`]: [`MockApi`], an in-memory Plasmic server
//! - [`project`]: [`TestProject`], a temporary app directory with assertions

pub mod api;
pub mod project;

pub use api::{MockApi, MockComponent, MockVersion};
pub use project::TestProject;
