//! JSON document loading and saving

use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, NormalizedPath, Result, io};

/// Loads and saves pretty-printed JSON documents.
///
/// Both `plasmic.json` and `plasmic.lock` are JSON regardless of their
/// extension, so the format is fixed rather than detected.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStore;

impl JsonStore {
    pub fn new() -> Self {
        Self
    }

    /// Load and deserialize a document.
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let content = io::read_text(path)?;
        Self::parse(path, &content)
    }

    /// Load a document, or `None` when the file does not exist.
    pub fn load_optional<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<Option<T>> {
        match io::read_text_optional(path)? {
            Some(content) => Self::parse(path, &content).map(Some),
            None => Ok(None),
        }
    }

    /// Serialize and atomically write a document.
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let content = Self::render(path, value)?;
        io::write_atomic(path, content.as_bytes())
    }

    /// Deserialize `content` that was read from `path`.
    pub fn parse<T: DeserializeOwned>(path: &NormalizedPath, content: &str) -> Result<T> {
        serde_json::from_str(content).map_err(|e| Error::Parse {
            path: path.to_native(),
            message: e.to_string(),
        })
    }

    /// Pretty-print `value` with two-space indent and a trailing newline.
    pub fn render<T: Serialize>(path: &NormalizedPath, value: &T) -> Result<String> {
        let mut content = serde_json::to_string_pretty(value).map_err(|e| Error::Serialize {
            path: path.to_native(),
            message: e.to_string(),
        })?;
        content.push('\n');
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("plasmic.lock"));
        let store = JsonStore::new();

        store
            .save(&path, &Doc {
                name: "lock".into(),
            })
            .unwrap();
        let raw = std::fs::read_to_string(path.to_native()).unwrap();
        assert!(raw.ends_with("}\n"));

        let loaded: Doc = store.load(&path).unwrap();
        assert_eq!(loaded.name, "lock");
    }

    #[test]
    fn load_optional_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = NormalizedPath::new(dir.path().join("missing.json"));
        let loaded: Option<Doc> = JsonStore::new().load_optional(&path).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn parse_error_names_file() {
        let path = NormalizedPath::new("/project/plasmic.json");
        let err = JsonStore::parse::<Doc>(&path, "{ nope").unwrap_err();
        assert!(err.to_string().contains("plasmic.json"));
    }
}
