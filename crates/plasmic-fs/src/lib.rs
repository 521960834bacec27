//! Filesystem layer for plasmic sync
//!
//! Provides normalized path handling, content checksums, atomic I/O and the
//! [`FsTransaction`] that buffers every write of a sync run until it is
//! flushed in one batch.

pub mod checksum;
pub mod error;
pub mod io;
pub mod json;
pub mod path;
pub mod transaction;
pub mod walk;

pub use error::{Error, Result};
pub use json::JsonStore;
pub use path::{NormalizedPath, relative_import_path, relative_path, strip_extension};
pub use transaction::{FileChange, FileChangeKind, FsTransaction};
pub use walk::{BaseNameIndex, SourceFilter};
