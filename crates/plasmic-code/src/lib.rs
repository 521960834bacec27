//! Source-code manipulation for plasmic sync
//!
//! Provides the pieces of the sync pipeline that need to look inside
//! generated modules:
//!
//! - **imports**: locate `// plasmic-import: <id>/<kind>` marker imports and
//!   rewrite their module paths and specifiers
//! - **jsx**: erase TypeScript syntax so generated TSX can be written as JSX
//! - **merge**: line-based three-way merge of an edited file against a new
//!   generated version
//! - **edit**: byte-range edits applied to a source string

pub mod edit;
pub mod error;
pub mod imports;
pub mod jsx;
pub mod merge;
pub mod parser;

pub use edit::{Edit, EditKind, apply_edits};
pub use error::{Error, Result};
pub use imports::{
    ImportDecl, ImportKind, ImportMarker, ImportSpecifier, find_managed_jsx_revision, marked_imports,
    parse_marker, restore_markers, rewrite_marked_imports, strip_markers,
};
pub use jsx::{maybe_convert_tsx_to_jsx, tsx_to_jsx};
pub use merge::{MergeOutcome, three_way_merge};
pub use parser::SourceParser;
