//! File-backed model store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <model_id>/lineage        last assigned version (survives delete)
//! <model_id>/v000003.bin    weights blob
//! <model_id>/v000003.json   metadata, published after the blob
//! ```
//!
//! Every file is written to a temporary sibling, synced, then renamed into
//! place, so readers see either the old state or the complete new one. A
//! version is visible once its `.json` exists.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use planforge_core::{PlanForgeError, Result};
use tracing::{debug, error};

use crate::metadata::ModelMetadata;
use crate::traits::{not_found, validate_model_id, ModelStore, StoredModel};

const LINEAGE_FILE: &str = "lineage";

/// Model store persisting each version as a pair of files.
#[derive(Debug)]
pub struct FileModelStore {
    root: PathBuf,
    // Serializes version assignment between writers of this process.
    write_lock: Mutex<()>,
}

impl FileModelStore {
    /// Opens (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            error!(path = %root.display(), "failed to create model store root: {e}");
            PlanForgeError::Persistence(format!(
                "failed to create store root {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn model_dir(&self, model_id: &str) -> PathBuf {
        self.root.join(model_id)
    }

    fn blob_path(dir: &Path, version: u32) -> PathBuf {
        dir.join(format!("v{version:06}.bin"))
    }

    fn meta_path(dir: &Path, version: u32) -> PathBuf {
        dir.join(format!("v{version:06}.json"))
    }

    /// Published versions of a model, ascending.
    fn published_versions(dir: &Path) -> Result<Vec<u32>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut versions = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(v) = name
                .strip_prefix('v')
                .and_then(|rest| rest.strip_suffix(".json"))
                .and_then(|num| num.parse::<u32>().ok())
            {
                versions.push(v);
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    fn read_lineage(dir: &Path) -> Result<u32> {
        match fs::read_to_string(dir.join(LINEAGE_FILE)) {
            Ok(s) => s.trim().parse::<u32>().map_err(|e| {
                PlanForgeError::Persistence(format!(
                    "corrupt lineage file in {}: {e}",
                    dir.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Metadata of `version`, or `None` if it was unpublished since the
    /// directory was scanned.
    fn read_metadata(dir: &Path, version: u32) -> Result<Option<ModelMetadata>> {
        let bytes = match fs::read(Self::meta_path(dir, version)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            PlanForgeError::Persistence(format!(
                "corrupt metadata for version {version} in {}: {e}",
                dir.display()
            ))
        })
    }

    fn read_model(&self, model_id: &str, version: u32) -> Result<StoredModel> {
        let dir = self.model_dir(model_id);
        let Some(metadata) = Self::read_metadata(&dir, version)? else {
            debug!(model_id, version, "metadata vanished during read");
            return Err(not_found(model_id, Some(version)));
        };
        let blob = fs::read(Self::blob_path(&dir, version))?;
        Ok(StoredModel { metadata, blob })
    }
}

/// Writes `bytes` to `path` via a synced temporary file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| PlanForgeError::Internal(format!("bad path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    let result = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    result.map_err(|e| {
        let _ = fs::remove_file(&tmp);
        error!(path = %path.display(), "atomic write failed: {e}");
        PlanForgeError::Persistence(format!("failed to write {}: {e}", path.display()))
    })
}

impl ModelStore for FileModelStore {
    fn save(&self, metadata: ModelMetadata, blob: &[u8]) -> Result<ModelMetadata> {
        validate_model_id(&metadata.model_id)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PlanForgeError::Internal("model store lock poisoned".into()))?;

        let dir = self.model_dir(&metadata.model_id);
        fs::create_dir_all(&dir)?;

        let last = Self::published_versions(&dir)?
            .last()
            .copied()
            .unwrap_or(0)
            .max(Self::read_lineage(&dir)?);
        let version = last
            .checked_add(1)
            .ok_or_else(|| PlanForgeError::Internal("model version overflow".into()))?;
        let metadata = metadata.assign_version(version);

        let json = serde_json::to_vec_pretty(&metadata)
            .map_err(|e| PlanForgeError::Internal(format!("metadata encoding failed: {e}")))?;

        // Blob first: a published .json always has its blob in place.
        write_atomic(&Self::blob_path(&dir, version), blob)?;
        write_atomic(&Self::meta_path(&dir, version), &json)?;
        write_atomic(&dir.join(LINEAGE_FILE), version.to_string().as_bytes())?;

        debug!(
            event = "store_save",
            model_id = %metadata.model_id,
            version,
            bytes = blob.len()
        );
        Ok(metadata)
    }

    fn load(&self, model_id: &str) -> Result<StoredModel> {
        validate_model_id(model_id)?;
        let versions = Self::published_versions(&self.model_dir(model_id))?;
        let latest = versions.last().copied().ok_or_else(|| not_found(model_id, None))?;
        self.read_model(model_id, latest)
    }

    fn load_version(&self, model_id: &str, version: u32) -> Result<StoredModel> {
        validate_model_id(model_id)?;
        let versions = Self::published_versions(&self.model_dir(model_id))?;
        if !versions.contains(&version) {
            return Err(not_found(model_id, Some(version)));
        }
        self.read_model(model_id, version)
    }

    fn list(&self) -> Result<Vec<ModelMetadata>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let dir = entry.path();
            // Newest version still readable; a model deleted mid-scan is skipped.
            for version in Self::published_versions(&dir)?.into_iter().rev() {
                if let Some(metadata) = Self::read_metadata(&dir, version)? {
                    out.push(metadata);
                    break;
                }
            }
        }
        out.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        Ok(out)
    }

    fn versions(&self, model_id: &str) -> Result<Vec<ModelMetadata>> {
        validate_model_id(model_id)?;
        let dir = self.model_dir(model_id);
        let mut out = Vec::new();
        for version in Self::published_versions(&dir)? {
            if let Some(metadata) = Self::read_metadata(&dir, version)? {
                out.push(metadata);
            }
        }
        Ok(out)
    }

    fn delete(&self, model_id: &str) -> Result<()> {
        validate_model_id(model_id)?;
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| PlanForgeError::Internal("model store lock poisoned".into()))?;

        let dir = self.model_dir(model_id);
        let versions = Self::published_versions(&dir)?;
        if versions.is_empty() {
            return Err(not_found(model_id, None));
        }

        let last = *versions.last().unwrap_or(&0);
        let lineage = Self::read_lineage(&dir)?.max(last);
        write_atomic(&dir.join(LINEAGE_FILE), lineage.to_string().as_bytes())?;

        // Unpublish metadata first so readers never see a .json without its blob.
        for &v in &versions {
            fs::remove_file(Self::meta_path(&dir, v))?;
        }
        for &v in &versions {
            match fs::remove_file(Self::blob_path(&dir, v)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        debug!(event = "store_delete", model_id, versions = versions.len());
        Ok(())
    }
}
