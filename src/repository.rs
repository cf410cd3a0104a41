//! Persistence boundary for the admin catalog.
//!
//! The stores themselves are in-memory. A `ConfigRepository` saves and loads a
//! `CatalogSnapshot` of both of them: buttons in display order plus every
//! workflow. Sessions are never persisted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::buttons::{ButtonConfig, ButtonConfigStore};
use crate::error::ConfigError;
use crate::workflow::{WorkflowConfig, WorkflowConfigStore};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed catalog: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Unsupported catalog version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything the admin console has configured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub version: u32,
    pub buttons: Vec<ButtonConfig>,
    #[serde(default)]
    pub workflows: Vec<WorkflowConfig>,
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            buttons: Vec::new(),
            workflows: Vec::new(),
        }
    }
}

impl CatalogSnapshot {
    /// Copy of the live stores. Only workflows belonging to a current button are kept.
    pub fn capture(store: &ButtonConfigStore) -> Self {
        let buttons = store.list();
        let workflows = store
            .workflows()
            .snapshot()
            .into_iter()
            .filter(|w| buttons.iter().any(|b| b.id == w.button_id))
            .collect();
        Self {
            version: SNAPSHOT_VERSION,
            buttons,
            workflows,
        }
    }

    /// Replace the live stores with this snapshot
    pub fn apply(self, store: &ButtonConfigStore) -> Result<(), RepositoryError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(RepositoryError::UnsupportedVersion {
                found: self.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let workflows: Vec<_> = self
            .workflows
            .into_iter()
            .filter(|w| self.buttons.iter().any(|b| b.id == w.button_id))
            .collect();
        // Both halves are checked before either store changes
        ButtonConfigStore::validate(&self.buttons)?;
        WorkflowConfigStore::validate(&workflows)?;
        store.restore(self.buttons)?;
        store.workflows().restore(workflows)?;
        Ok(())
    }
}

#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// Stored catalog, or `None` if nothing has been saved yet
    async fn load(&self) -> Result<Option<CatalogSnapshot>, RepositoryError>;

    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), RepositoryError>;
}

/// Keeps the last saved snapshot in memory; lost on restart
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    snapshot: RwLock<Option<CatalogSnapshot>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfigRepository for InMemoryRepository {
    async fn load(&self) -> Result<Option<CatalogSnapshot>, RepositoryError> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), RepositoryError> {
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(())
    }
}

/// Pretty-printed JSON file, replaced atomically on save
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> RepositoryError {
        RepositoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ConfigRepository for JsonFileRepository {
    async fn load(&self) -> Result<Option<CatalogSnapshot>, RepositoryError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved catalog");
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };
        let snapshot: CatalogSnapshot = serde_json::from_slice(&raw)?;
        info!(
            path = %self.path.display(),
            buttons = snapshot.buttons.len(),
            "Loaded catalog"
        );
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), RepositoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_vec_pretty(snapshot)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, body)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        info!(
            path = %self.path.display(),
            buttons = snapshot.buttons.len(),
            "Saved catalog"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::{ButtonType, NewButton};
    use crate::workflow::{CustomField, FieldFlags, StandardField};
    use std::sync::Arc;

    fn store() -> ButtonConfigStore {
        ButtonConfigStore::new(Arc::new(WorkflowConfigStore::new()))
    }

    fn populated() -> ButtonConfigStore {
        let store = store();
        let visit = store
            .add(NewButton::new("Visit Employee", ButtonType::VisitEmployee))
            .unwrap();
        store.add(NewButton::new("Delivery", ButtonType::Delivery)).unwrap();
        store
            .workflows()
            .set_field_flags(&visit.id, StandardField::Phone, FieldFlags::REQUIRED)
            .unwrap();
        store
            .workflows()
            .add_custom_field(&visit.id, "Badge number")
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_in_memory_repository() {
        let repo = InMemoryRepository::new();
        assert!(repo.load().await.unwrap().is_none());

        let snapshot = CatalogSnapshot::capture(&populated());
        repo.save(&snapshot).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn test_json_file_restores_catalog() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("nested").join("catalog.json"));
        assert!(repo.load().await.unwrap().is_none());

        let original = populated();
        repo.save(&CatalogSnapshot::capture(&original)).await.unwrap();

        let restored = store();
        repo.load().await.unwrap().unwrap().apply(&restored).unwrap();
        assert_eq!(restored.list(), original.list());
        assert_eq!(restored.workflows().snapshot(), original.workflows().snapshot());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = JsonFileRepository::new(&path).load().await.unwrap_err();
        assert!(matches!(err, RepositoryError::Serialization(_)));
    }

    #[test]
    fn test_apply_rejects_unknown_version() {
        let snapshot = CatalogSnapshot {
            version: 99,
            ..CatalogSnapshot::default()
        };
        assert!(matches!(
            snapshot.apply(&store()),
            Err(RepositoryError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let live = populated();
        let before_buttons = live.list();
        let before_workflows = live.workflows().snapshot();

        let mut snapshot = CatalogSnapshot::capture(&live);
        snapshot.buttons.retain(|b| b.button_type == ButtonType::VisitEmployee);
        let visit = snapshot
            .workflows
            .iter_mut()
            .find(|w| !w.custom_fields.is_empty())
            .unwrap();
        let first = visit.custom_fields[0].id.clone();
        visit.custom_fields.push(CustomField {
            id: first,
            label: String::new(),
            flags: FieldFlags::OPTIONAL,
        });

        assert!(matches!(
            snapshot.apply(&live),
            Err(RepositoryError::Config(ConfigError::InvalidField { .. }))
        ));
        assert_eq!(live.list(), before_buttons);
        assert_eq!(live.workflows().snapshot(), before_workflows);
    }
}
