//! Loading and saving `plasmic.json` and `plasmic.lock`

use plasmic_fs::{FsTransaction, JsonStore, NormalizedPath};
use semver::Version;
use serde_json::Value;
use tracing::{debug, info};

use super::lock::{LOCK_FILE_NAME, Lock};
use super::migrations::{self, MigrationContext};
use super::model::{CONFIG_FILE_NAME, Config};
use crate::error::{Error, Result};
use crate::version::parse_version;

/// The pair of state documents that live at a project root.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: NormalizedPath,
    config_path: NormalizedPath,
    lock_path: NormalizedPath,
    json: JsonStore,
}

impl StateStore {
    /// State documents next to `config_path`.
    pub fn new(config_path: NormalizedPath) -> Self {
        let root = config_path
            .parent()
            .unwrap_or_else(|| NormalizedPath::new("."));
        Self {
            lock_path: root.join(LOCK_FILE_NAME),
            root,
            config_path,
            json: JsonStore::new(),
        }
    }

    /// State documents rooted at `dir`.
    pub fn at(dir: &NormalizedPath) -> Self {
        Self::new(dir.join(CONFIG_FILE_NAME))
    }

    /// Find the nearest `plasmic.json` at or above `start`.
    pub fn discover(start: &NormalizedPath) -> Option<Self> {
        find_file_upwards(start, CONFIG_FILE_NAME).map(Self::new)
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn config_path(&self) -> &NormalizedPath {
        &self.config_path
    }

    pub fn lock_path(&self) -> &NormalizedPath {
        &self.lock_path
    }

    pub fn config_exists(&self) -> bool {
        self.config_path.is_file()
    }

    /// Absolute source directory declared by `config`.
    pub fn src_dir(&self, config: &Config) -> NormalizedPath {
        self.root.join(&config.src_dir)
    }

    /// Load the config, migrating it first when it was written by an older
    /// tool. A missing file yields the default config.
    ///
    /// Each migration step is written back before the next one runs.
    pub fn load_config(&self, tool_version: &Version) -> Result<Config> {
        let loaded = self
            .json
            .load_optional::<Value>(&self.config_path)
            .map_err(invalid_document)?;
        let Some(mut raw) = loaded else {
            debug!(path = %self.config_path, "no config file, using defaults");
            return Ok(Config::default());
        };

        let recorded = raw
            .get("cliVersion")
            .and_then(Value::as_str)
            .map(str::to_string);
        if let Some(recorded) = recorded.as_deref()
            && !recorded.is_empty()
            && parse_version(recorded)? > *tool_version
        {
            return Err(Error::ConfigTooNew {
                path: self.config_path.to_native(),
                found: recorded.to_string(),
                current: tool_version.to_string(),
            });
        }

        let steps = migrations::pending(recorded.as_deref(), tool_version)?;
        if !steps.is_empty() {
            let src_dir = raw
                .get("srcDir")
                .and_then(Value::as_str)
                .unwrap_or("./src/components");
            let ctx = MigrationContext {
                src_dir: self.root.join(src_dir).as_str().to_string(),
            };
            for step in steps {
                info!(version = %step.version, path = %self.config_path, "migrating config");
                raw = (step.transform)(raw, &ctx)?;
                if let Some(root) = raw.as_object_mut() {
                    root.insert("cliVersion".into(), Value::String(step.version.to_string()));
                }
                self.json.save(&self.config_path, &raw)?;
            }
        }

        serde_json::from_value(raw).map_err(|e| Error::InvalidConfig {
            path: self.config_path.to_native(),
            message: e.to_string(),
        })
    }

    /// Load the lock, or an empty one when it does not exist yet.
    pub fn load_lock(&self) -> Result<Lock> {
        let lock = self
            .json
            .load_optional::<Lock>(&self.lock_path)
            .map_err(invalid_document)?;
        Ok(lock.unwrap_or_default())
    }

    /// Stage the config for writing.
    pub fn write_config(&self, tx: &mut FsTransaction, config: &Config) -> Result<()> {
        let content = JsonStore::render(&self.config_path, config)?;
        tx.write(&self.config_path, content)?;
        Ok(())
    }

    /// Stage the lock for writing.
    pub fn write_lock(&self, tx: &mut FsTransaction, lock: &Lock) -> Result<()> {
        let content = JsonStore::render(&self.lock_path, lock)?;
        tx.write(&self.lock_path, content)?;
        Ok(())
    }
}

fn invalid_document(e: plasmic_fs::Error) -> Error {
    match e {
        plasmic_fs::Error::Parse { path, message } => Error::InvalidConfig { path, message },
        other => other.into(),
    }
}

/// Look for `name` in `start` and each of its ancestors.
pub fn find_file_upwards(start: &NormalizedPath, name: &str) -> Option<NormalizedPath> {
    let mut dir = Some(start.clone());
    while let Some(current) = dir {
        let candidate = current.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> StateStore {
        StateStore::at(&NormalizedPath::new(temp.path()))
    }

    #[test]
    fn missing_files_give_defaults() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let config = store.load_config(&Version::new(0, 2, 0)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(store.load_lock().unwrap(), Lock::default());
    }

    #[test]
    fn newer_config_is_refused() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        std::fs::write(
            store.config_path().to_native(),
            json!({"cliVersion": "9.0.0"}).to_string(),
        )
        .unwrap();

        let err = store.load_config(&Version::new(0, 2, 0)).unwrap_err();
        assert!(matches!(err, Error::ConfigTooNew { .. }));
    }

    #[test]
    fn migration_progress_is_persisted() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        std::fs::write(
            store.config_path().to_native(),
            json!({"cliVersion": "0.1.40", "projects": []}).to_string(),
        )
        .unwrap();

        let config = store.load_config(&Version::new(0, 2, 0)).unwrap();
        assert_eq!(config.cli_version.as_deref(), Some("0.1.64"));

        let on_disk: Value =
            serde_json::from_str(&std::fs::read_to_string(store.config_path().to_native()).unwrap())
                .unwrap();
        assert_eq!(on_disk["cliVersion"], json!("0.1.64"));
        assert_eq!(on_disk["images"], json!({"scheme": "inlined"}));
    }

    #[test]
    fn discover_walks_up() {
        let temp = TempDir::new().unwrap();
        let root = NormalizedPath::new(temp.path());
        std::fs::write(root.join(CONFIG_FILE_NAME).to_native(), "{}").unwrap();
        let nested = root.join("src/components/deep");
        std::fs::create_dir_all(nested.to_native()).unwrap();

        let found = StateStore::discover(&nested).unwrap();
        assert_eq!(found.root(), &root);
        assert_eq!(found.lock_path(), &root.join(LOCK_FILE_NAME));
    }

    #[test]
    fn writes_go_through_the_transaction() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let mut tx = FsTransaction::new();
        store.write_lock(&mut tx, &Lock::default()).unwrap();
        assert!(!store.lock_path().exists());
        tx.commit().unwrap();
        assert_eq!(store.load_lock().unwrap(), Lock::default());
    }
}
