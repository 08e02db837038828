//! Whole-collection JSON snapshots, one file per resource.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::PersistenceError;

/// Reads and replaces snapshot files under one directory.
///
/// There is no locking here. Callers that load, mutate and save the same
/// resource concurrently must hold that resource's lock across the cycle.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Location of the snapshot for `resource`, e.g. `data/class.json`.
    pub fn path(&self, resource: &str) -> PathBuf {
        self.dir.join(format!("{resource}.json"))
    }

    /// Loads the collection stored for `resource`.
    ///
    /// A resource that was never written (or is zero-length) is an empty
    /// collection. Every other read or parse failure is an error.
    pub async fn load<T: DeserializeOwned>(
        &self,
        resource: &str,
    ) -> Result<Vec<T>, PersistenceError> {
        let path = self.path(resource);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(PersistenceError::Io { path, source }),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Malformed { path, source })
    }

    /// Replaces the stored collection for `resource` with `items`.
    ///
    /// The snapshot is encoded in memory, written to a sibling temp file and
    /// renamed over the old one, so a reader sees either the old or the new
    /// collection in full.
    pub async fn save<T: Serialize>(
        &self,
        resource: &str,
        items: &[T],
    ) -> Result<(), PersistenceError> {
        let bytes = serde_json::to_vec_pretty(items).map_err(PersistenceError::Encode)?;
        let path = self.path(resource);

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| PersistenceError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let tmp = path.with_extension("json.tmp");
        write_synced(&tmp, &bytes)
            .await
            .map_err(|source| PersistenceError::Io {
                path: tmp.clone(),
                source,
            })?;

        if let Err(source) = fs::rename(&tmp, &path).await {
            _ = fs::remove_file(&tmp).await;
            return Err(PersistenceError::Io { path, source });
        }

        tracing::debug!("Saved {} {} record(s) to {}", items.len(), resource, path.display());
        Ok(())
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Class;

    #[tokio::test]
    async fn missing_resource_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let classes: Vec<Class> = store.load("class").await.unwrap();
        assert!(classes.is_empty());
    }

    #[tokio::test]
    async fn save_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let first = vec![
            Class::new(1, "Math", "Science", "Mr. A"),
            Class::new(2, "Literature", "Arts", "Ms. B"),
        ];
        store.save("class", &first).await.unwrap();
        store.save("class", &first[1..]).await.unwrap();

        let loaded: Vec<Class> = store.load("class").await.unwrap();
        assert_eq!(loaded, first[1..].to_vec());
        assert!(!store.path("class").with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn saves_into_a_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("data"));

        store.save("class", &[Class::new(1, "Math", "", "")]).await.unwrap();
        let loaded: Vec<Class> = store.load("class").await.unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_uses_attribute_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save("class", &[Class::new(7, "Math", "Science", "Mr. A")]).await.unwrap();

        let raw = std::fs::read_to_string(store.path("class")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["Id"], 7);
        assert_eq!(value[0]["ClassName"], "Math");
    }

    #[tokio::test]
    async fn empty_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.path("class"), b"").unwrap();

        let classes: Vec<Class> = store.load("class").await.unwrap();
        assert!(classes.is_empty());
    }

    #[tokio::test]
    async fn malformed_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.path("class"), b"[{\"Id\": 1,").unwrap();

        let err = store.load::<Class>("class").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed { .. }));
    }

    #[tokio::test]
    async fn unreadable_resource_is_not_mistaken_for_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        // A directory where the snapshot should be cannot be read as a file
        std::fs::create_dir(store.path("class")).unwrap();

        let err = store.load::<Class>("class").await.unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }
}
