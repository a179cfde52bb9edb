//! Local key-value store holding the last successful outcome.
//!
//! One JSON object file. Keys other than the two the popup owns are left untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

pub const LAST_RESUME_TEXT_KEY: &str = "lastResumeText";
pub const LAST_RESULT_KEY: &str = "lastResult";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store file {0} does not hold a JSON object")]
    NotAnObject(PathBuf),

    #[error("Store task failed: {0}")]
    Task(String),
}

/// Values read at popup initialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedState {
    pub last_resume_text: Option<String>,
    pub last_result: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whole store contents. A missing file is an empty store.
    pub async fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject(self.path.clone())),
        }
    }

    pub async fn load_cached_state(&self) -> Result<CachedState, StoreError> {
        let mut map = self.read_all().await?;
        Ok(CachedState {
            last_resume_text: match map.remove(LAST_RESUME_TEXT_KEY) {
                Some(Value::String(text)) => Some(text),
                _ => None,
            },
            last_result: map.remove(LAST_RESULT_KEY).filter(|v| !v.is_null()),
        })
    }

    /// Overwrites `lastResult` and `lastResumeText`.
    pub async fn save_outcome(&self, resume_text: &str, result: &Value) -> Result<(), StoreError> {
        let mut map = self.read_all().await?;
        map.insert(
            LAST_RESUME_TEXT_KEY.to_string(),
            Value::String(resume_text.to_string()),
        );
        map.insert(LAST_RESULT_KEY.to_string(), result.clone());
        self.write_all(map).await
    }

    /// Atomic replace: temp file in the same directory, then rename over the store.
    async fn write_all(&self, map: Map<String, Value>) -> Result<(), StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let dir = match path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
                _ => PathBuf::from("."),
            };
            std::fs::create_dir_all(&dir)?;

            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            serde_json::to_writer_pretty(&mut tmp, &Value::Object(map))?;
            tmp.write_all(b"\n")?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

            debug!("Store written to {}", path.display());
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("storage.json"));
        assert_eq!(store.load_cached_state().await.unwrap(), CachedState::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("nested").join("storage.json"));

        store
            .save_outcome("I am a software engineer", &json!({"score": 0.82}))
            .await
            .unwrap();

        let state = store.load_cached_state().await.unwrap();
        assert_eq!(state.last_resume_text.as_deref(), Some("I am a software engineer"));
        assert_eq!(state.last_result, Some(json!({"score": 0.82})));
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("storage.json"));

        store.save_outcome("first", &json!({"score": 0.1})).await.unwrap();
        store.save_outcome("second", &json!({"score": 0.9})).await.unwrap();

        let state = store.load_cached_state().await.unwrap();
        assert_eq!(state.last_resume_text.as_deref(), Some("second"));
        assert_eq!(state.last_result, Some(json!({"score": 0.9})));
    }

    #[tokio::test]
    async fn test_unrelated_keys_are_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = LocalStore::new(&path);
        store.save_outcome("resume", &json!({"ok": 1})).await.unwrap();

        let all = store.read_all().await.unwrap();
        assert_eq!(all["theme"], json!("dark"));
        assert_eq!(all[LAST_RESULT_KEY], json!({"ok": 1}));
    }

    #[tokio::test]
    async fn test_non_object_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = LocalStore::new(&path).read_all().await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject(_)));
    }
}
