use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::{AnchorStore, STORAGE_KEY};
use crate::error::{ReformaError, Result};

/// JSON file store laid out like the extension's local storage:
/// `{ "reforma_highlights": { "<page key>": [ ... ] } }`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Result<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        let root: Value = serde_json::from_str(&content).map_err(|e| {
            ReformaError::StorageError(format!("{} is not valid JSON: {}", self.path.display(), e))
        })?;
        match root.get(STORAGE_KEY) {
            Some(Value::Object(map)) => Ok(map.clone()),
            None | Some(Value::Null) => Ok(Map::new()),
            Some(_) => Err(ReformaError::StorageError(format!(
                "{} in {} is not an object",
                STORAGE_KEY,
                self.path.display()
            ))),
        }
    }

    /// Write through a temp file and rename, so readers never see a
    /// half-written document.
    async fn write_map(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut root = Map::new();
        root.insert(STORAGE_KEY.to_string(), Value::Object(map));
        let content = serde_json::to_string_pretty(&Value::Object(root))?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl AnchorStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value);
        self.write_map(map).await?;
        tracing::debug!("Wrote bucket {} to {}", key, self.path.display());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(map).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_map().await?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("highlights.json"));

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_persists_under_storage_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("highlights.json");
        let store = FileStore::new(&path);

        store.set("https://example.com/", json!([{"id": "a", "text": "t"}])).await.unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[STORAGE_KEY]["https://example.com/"][0]["id"], "a");

        let reopened = FileStore::new(&path);
        assert_eq!(
            reopened.get("https://example.com/").await.unwrap(),
            Some(json!([{"id": "a", "text": "t"}]))
        );
    }

    #[tokio::test]
    async fn remove_drops_only_that_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("h.json"));
        store.set("a", json!([])).await.unwrap();
        store.set("b", json!([])).await.unwrap();

        store.remove("a").await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::new(&path);
        assert!(matches!(store.get("a").await, Err(ReformaError::StorageError(_))));
    }
}
