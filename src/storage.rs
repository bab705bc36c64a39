//! The storage provider capability: persistence of document blobs, an
//! external collaborator consumed only through its trait boundary. This
//! module also ships the reference `JsonFileStorage` implementation: one
//! self-describing JSON file per document under
//! `<directory>/<name>/<id>.json`.
//!
//! Grounded on `storage::StoreData`'s trait (list/load/store/delete over a
//! path-backed store), generalized from a single whole-store blob to one
//! file per document so that deleting a file deletes exactly one document
//! and recovery is possible from the per-document files alone.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::document::Document;
use crate::error::{Result, VecturaError};

/// Basic persistence contract every storage provider must satisfy.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    async fn list_ids(&self) -> Result<Vec<Uuid>>;
    async fn load(&self, id: Uuid) -> Result<Document>;
    async fn store(&self, document: &Document) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn delete_all(&self) -> Result<()>;
}

/// Optional extension: a provider may keep its own ANN structure, coarse
/// quantizer, or simply return every id — any subset is acceptable
/// provided recall is reasonable. Providers that don't implement this are
/// used via `MemoryStrategy::Indexed`'s silent degrade to full-memory (see
/// `memory_strategy.rs`).
#[async_trait]
pub trait IndexedStorageProvider: StorageProvider {
    async fn candidate_ids(&self, query_vec: &[f32], k: usize) -> Result<Vec<Uuid>>;
}

/// Reference `StorageProvider`: one JSON file per document under
/// `<directory>/<name>/<id>.json`. Round-trips `embedding` bit-exact (JSON
/// floats are decimal but `serde_json`'s f32 formatting/parsing is lossless
/// for IEEE-754 values) and preserves `id`/`created_at` exactly.
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    /// Creates (if absent) `<directory>/<name>` with owner-only permissions
    /// and returns a provider rooted there.
    pub async fn new(directory: &Path, name: &str) -> Result<Self> {
        let dir = directory.join(name);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| VecturaError::StorageFailed {
                operation: "create_dir_all".into(),
                reason: e.to_string(),
            })?;
        set_owner_only(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

#[cfg(unix)]
fn set_owner_only(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o700);
    std::fs::set_permissions(dir, perms).map_err(|e| VecturaError::StorageFailed {
        operation: "set_permissions".into(),
        reason: e.to_string(),
    })
}

#[cfg(not(unix))]
fn set_owner_only(_dir: &Path) -> Result<()> {
    Ok(())
}

#[async_trait]
impl StorageProvider for JsonFileStorage {
    async fn list_ids(&self) -> Result<Vec<Uuid>> {
        let mut entries =
            tokio::fs::read_dir(&self.dir)
                .await
                .map_err(|e| VecturaError::StorageFailed {
                    operation: "read_dir".into(),
                    reason: e.to_string(),
                })?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| VecturaError::StorageFailed {
                operation: "read_dir_entry".into(),
                reason: e.to_string(),
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(id) = Uuid::parse_str(stem) {
                    ids.push(id);
                }
            }
        }
        Ok(ids)
    }

    async fn load(&self, id: Uuid) -> Result<Document> {
        let path = self.path_for(id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| VecturaError::StorageFailed {
                operation: format!("load({id})"),
                reason: e.to_string(),
            })?;
        serde_json::from_slice(&bytes).map_err(|e| VecturaError::StorageFailed {
            operation: format!("decode({id})"),
            reason: e.to_string(),
        })
    }

    async fn store(&self, document: &Document) -> Result<()> {
        let path = self.path_for(document.id);
        let bytes =
            serde_json::to_vec_pretty(document).map_err(|e| VecturaError::StorageFailed {
                operation: format!("encode({})", document.id),
                reason: e.to_string(),
            })?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| VecturaError::StorageFailed {
                operation: format!("store({})", document.id),
                reason: e.to_string(),
            })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VecturaError::StorageFailed {
                operation: format!("delete({id})"),
                reason: e.to_string(),
            }),
        }
    }

    async fn delete_all(&self) -> Result<()> {
        let ids = self.list_ids().await?;
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }
}
