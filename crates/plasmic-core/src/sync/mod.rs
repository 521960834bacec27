//! Sync orchestration
//!
//! This module provides:
//! - **engine**: the top-level sync run, from loading state to post-sync commands
//! - **project**: project-level assets (css, themes, global variants, tokens, icons, images)
//! - **components**: new, changed, renamed and deleted components
//! - **merge**: deferred three-way merges of direct-scheme components

mod components;
mod context;
mod engine;
mod merge;
mod project;

pub use components::UpdateSummary;
pub use engine::{SyncEngine, SyncOptions, SyncReport, SyncedProject, tool_version};
pub use merge::{ApiMetadataProvider, CodeMerger, LineMerger, MergeFile, MetadataProvider, PendingMerge};
