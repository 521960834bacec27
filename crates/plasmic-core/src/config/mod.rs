//! Local state: `plasmic.json`, `plasmic.lock` and `.plasmic.auth`
//!
//! The config records what the user wants synced and where it lives; the
//! lock records exactly what was synced last. Both are read once per sync,
//! mutated in memory and written back through the sync's transaction.

pub mod auth;
pub mod lock;
pub mod migrations;
pub mod model;
pub mod store;

pub use auth::{AuthConfig, AuthSource, load_auth, write_auth};
pub use lock::{FileLock, FileLockKind, LOCK_FILE_NAME, Lock, ProjectLock};
pub use migrations::{Migration, MigrationContext};
pub use model::{
    CONFIG_FILE_NAME, CodeConfig, ComponentConfig, ComponentKind, ComponentScheme, ComponentType,
    Config, GlobalVariantGroupConfig, IconConfig, ImageConfig, ImageScheme, ImagesConfig,
    ImportSpec, JsBundleThemeConfig, Lang, PagesConfig, Platform, ProjectConfig, ReactRuntime,
    StyleConfig, StyleScheme, TokensConfig,
};
pub use store::{StateStore, find_file_upwards};
