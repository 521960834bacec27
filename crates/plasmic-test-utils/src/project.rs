//! [`TestProject`] builder for sync scenarios.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use plasmic_core::config::{CONFIG_FILE_NAME, Config, LOCK_FILE_NAME, Lock};
use plasmic_core::resolve::ProjectSpec;
use plasmic_core::sync::SyncOptions;
use plasmic_fs::NormalizedPath;
use serde_json::Value;
use tempfile::TempDir;

/// Where generated files land with the default config.
pub const SRC_DIR: &str = "src/components";

/// A temporary app directory with helpers for setup and assertion.
///
/// # Example
///
/// ```rust,no_run
/// use plasmic_test_utils::TestProject;
///
/// let project = TestProject::new();
/// project.write_src("Button.tsx", "export default function Button() {}\n");
/// project.assert_src_exists("Button.tsx");
/// ```
pub struct TestProject {
    temp_dir: TempDir,
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

impl TestProject {
    /// Create an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a directory holding `plasmic.json` with `config`.
    pub fn with_config(config: Value) -> Self {
        let project = Self::new();
        project.write_config(&config);
        project
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn root_path(&self) -> NormalizedPath {
        NormalizedPath::new(self.root())
    }

    /// Sync options rooted here, syncing `projects` (`id[:token][@range]`).
    pub fn options(&self, projects: &[&str]) -> SyncOptions {
        let mut options = SyncOptions::new(self.root());
        options.projects = projects
            .iter()
            .map(|spec| ProjectSpec::parse(spec).unwrap())
            .collect();
        options
    }

    pub fn write_config(&self, config: &Value) {
        fs::write(
            self.root().join(CONFIG_FILE_NAME),
            serde_json::to_string_pretty(config).unwrap(),
        )
        .unwrap();
    }

    /// Parse the current `plasmic.json`.
    pub fn config(&self) -> Config {
        let content = fs::read_to_string(self.root().join(CONFIG_FILE_NAME))
            .unwrap_or_else(|e| panic!("Could not read {CONFIG_FILE_NAME}: {e}"));
        serde_json::from_str(&content).unwrap()
    }

    /// Parse the current `plasmic.lock`.
    pub fn lock(&self) -> Lock {
        let content = fs::read_to_string(self.root().join(LOCK_FILE_NAME))
            .unwrap_or_else(|e| panic!("Could not read {LOCK_FILE_NAME}: {e}"));
        serde_json::from_str(&content).unwrap()
    }

    /// Path of `rel` inside the source directory.
    pub fn src(&self, rel: &str) -> PathBuf {
        self.root().join(SRC_DIR).join(rel)
    }

    pub fn write_src(&self, rel: &str, content: &str) {
        let path = self.src(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn read_src(&self, rel: &str) -> String {
        let path = self.src(rel);
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    /// Every file under the root with its content, keyed by relative path.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect(self.root(), self.root(), &mut files);
        files
    }

    /// Assert that `rel` exists in the source directory.
    ///
    /// # Panics
    /// Panics with a descriptive message if the file does not exist.
    pub fn assert_src_exists(&self, rel: &str) {
        let path = self.src(rel);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// Assert that `rel` does **not** exist in the source directory.
    ///
    /// # Panics
    /// Panics with a descriptive message if the file exists.
    pub fn assert_src_missing(&self, rel: &str) {
        let path = self.src(rel);
        assert!(!path.exists(), "Expected file NOT to exist: {}", path.display());
    }

    /// Assert that the source file `rel` contains `content`.
    ///
    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_src_contains(&self, rel: &str, content: &str) {
        let actual = self.read_src(rel);
        assert!(
            actual.contains(content),
            "File {rel} does not contain expected content.\nExpected: {content}\nActual: {actual}"
        );
    }
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<String, Vec<u8>>) {
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            files.insert(rel, fs::read(&path).unwrap());
        }
    }
}
