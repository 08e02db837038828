//! The CRUD contract shared by every backend, and its file-backed implementation.

use std::future::Future;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;

use crate::database::file_store::FileStore;
use crate::database::lock::ResourceLocks;
use crate::error::{Error, Result};
use crate::model::Entity;

/// CRUD by `Id` over one entity collection.
pub trait Repository<T: Entity>: Send + Sync {
    /// Every entity, in stored order. Always read fresh from the backend.
    fn list(&self) -> impl Future<Output = Result<Vec<T>>> + Send;

    fn find_by_id(&self, id: i32) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Stores `entity`, assigning `1 + max(Id)` when its `Id` is unset.
    /// Returns the entity as stored.
    fn add(&self, entity: T) -> impl Future<Output = Result<T>> + Send;

    /// Replaces every field of the entity with the same `Id`.
    /// Fails with [`Error::NotFound`] and changes nothing when there is none.
    fn update(&self, entity: T) -> impl Future<Output = Result<T>> + Send;

    /// Deletes the entity with `id`. Returns whether one existed; removing an
    /// absent `Id` succeeds without touching storage.
    fn remove(&self, id: i32) -> impl Future<Output = Result<bool>> + Send;
}

/// Keeps the collection as a JSON snapshot that is rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileRepository<T> {
    store: FileStore,
    locks: Arc<ResourceLocks>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> FileRepository<T> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_locks(dir, ResourceLocks::global())
    }

    pub fn with_locks(dir: impl Into<PathBuf>, locks: Arc<ResourceLocks>) -> Self {
        Self {
            store: FileStore::new(dir),
            locks,
            _entity: PhantomData,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.store.path(T::RESOURCE)
    }

    async fn lock(&self) -> OwnedMutexGuard<()> {
        self.locks.acquire(&self.path()).await
    }

    async fn load(&self) -> Result<Vec<T>> {
        Ok(self.store.load(T::RESOURCE).await?)
    }

    async fn save(&self, items: &[T]) -> Result<()> {
        Ok(self.store.save(T::RESOURCE, items).await?)
    }
}

impl<T: Entity> Repository<T> for FileRepository<T> {
    async fn list(&self) -> Result<Vec<T>> {
        self.load().await
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<T>> {
        Ok(self.load().await?.into_iter().find(|e| e.id() == id))
    }

    async fn add(&self, mut entity: T) -> Result<T> {
        let _guard = self.lock().await;
        let mut items = self.load().await?;

        if entity.has_id() {
            if items.iter().any(|e| e.id() == entity.id()) {
                return Err(Error::Conflict {
                    resource: T::RESOURCE,
                    id: entity.id(),
                });
            }
        } else {
            let max = items.iter().map(Entity::id).max().unwrap_or(0).max(0);
            let Some(next) = max.checked_add(1) else {
                return Err(Error::IdsExhausted {
                    resource: T::RESOURCE,
                });
            };
            entity.set_id(next);
        }

        items.push(entity.clone());
        self.save(&items).await?;
        Ok(entity)
    }

    async fn update(&self, entity: T) -> Result<T> {
        let _guard = self.lock().await;
        let mut items = self.load().await?;

        let Some(slot) = items.iter_mut().find(|e| e.id() == entity.id()) else {
            return Err(Error::NotFound {
                resource: T::RESOURCE,
                id: entity.id(),
            });
        };
        *slot = entity.clone();

        self.save(&items).await?;
        Ok(entity)
    }

    async fn remove(&self, id: i32) -> Result<bool> {
        let _guard = self.lock().await;
        let items = self.load().await?;
        let before = items.len();

        let kept: Vec<T> = items.into_iter().filter(|e| e.id() != id).collect();
        if kept.len() == before {
            return Ok(false);
        }

        self.save(&kept).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, Course};

    fn repository(dir: &tempfile::TempDir) -> FileRepository<Class> {
        FileRepository::with_locks(dir.path(), Arc::new(ResourceLocks::new()))
    }

    async fn seeded(dir: &tempfile::TempDir) -> FileRepository<Class> {
        let repo = repository(dir);
        FileStore::new(dir.path())
            .save(
                "class",
                &[
                    Class::new(1, "Math", "Science", "Mr. A"),
                    Class::new(2, "Literature", "Arts", "Ms. B"),
                ],
            )
            .await
            .unwrap();
        repo
    }

    #[tokio::test]
    async fn add_assigns_next_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded(&dir).await;

        let added = repo.add(Class::new(0, "Physics", "Science", "Mr. C")).await.unwrap();
        assert_eq!(added.id, 3);
        assert_eq!(repo.find_by_id(3).await.unwrap(), Some(added));
    }

    #[tokio::test]
    async fn first_add_gets_id_one() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);

        let added = repo.add(Class::new(0, "Math", "", "")).await.unwrap();
        assert_eq!(added.id, 1);
    }

    #[tokio::test]
    async fn add_keeps_caller_supplied_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded(&dir).await;

        let added = repo.add(Class::new(40, "Physics", "", "")).await.unwrap();
        assert_eq!(added.id, 40);
        assert_eq!(repo.add(Class::new(0, "Chemistry", "", "")).await.unwrap().id, 41);
    }

    #[tokio::test]
    async fn add_rejects_duplicate_id() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded(&dir).await;

        let err = repo.add(Class::new(2, "Physics", "", "")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { id: 2, .. }));
        assert_eq!(repo.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn add_past_the_largest_id_fails() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);
        repo.add(Class::new(i32::MAX, "Last", "", "")).await.unwrap();

        let err = repo.add(Class::new(0, "Overflow", "", "")).await.unwrap_err();
        assert!(matches!(err, Error::IdsExhausted { resource: "class" }));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded(&dir).await;

        let changed = Class::new(2, "Updated", "UpdatedMajor", "UpdatedLec");
        repo.update(changed.clone()).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed[1], changed);
        assert_eq!(listed[0].class_name, "Math");
    }

    #[tokio::test]
    async fn update_of_missing_id_leaves_store_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded(&dir).await;
        let before = std::fs::read(repo.path()).unwrap();

        let err = repo.update(Class::new(999, "Ghost", "", "")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(std::fs::read(repo.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = seeded(&dir).await;

        assert!(repo.remove(1).await.unwrap());
        assert_eq!(repo.find_by_id(1).await.unwrap(), None);
        let after_first = std::fs::read(repo.path()).unwrap();

        assert!(!repo.remove(1).await.unwrap());
        assert_eq!(std::fs::read(repo.path()).unwrap(), after_first);

        let ids: Vec<i32> = repo.list().await.unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn remove_on_missing_resource_does_not_create_it() {
        let dir = tempfile::tempdir().unwrap();
        let repo = repository(&dir);

        assert!(!repo.remove(1).await.unwrap());
        assert!(!repo.path().exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let repo: Arc<FileRepository<Course>> = Arc::new(FileRepository::with_locks(
            dir.path(),
            Arc::new(ResourceLocks::new()),
        ));

        let tasks: Vec<_> = (0..24)
            .map(|n| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    let course = Course {
                        name: format!("Course {n}"),
                        class: "SE06301".into(),
                        ..Default::default()
                    };
                    repo.add(course).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let mut ids: Vec<i32> = repo.list().await.unwrap().iter().map(|c| c.id).collect();
        ids.sort();
        assert_eq!(ids, (1..=24).collect::<Vec<_>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_update_and_remove_keep_both_changes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(seeded(&dir).await);

        let updater = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.update(Class::new(2, "Poetry", "Arts", "Ms. B")).await })
        };
        let remover = {
            let repo = repo.clone();
            tokio::spawn(async move { repo.remove(1).await })
        };
        updater.await.unwrap().unwrap();
        remover.await.unwrap().unwrap();

        assert_eq!(repo.list().await.unwrap(), vec![Class::new(2, "Poetry", "Arts", "Ms. B")]);
    }
}
