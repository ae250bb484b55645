//! In-memory model store for tests and ephemeral engines.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use planforge_core::{PlanForgeError, Result};

use crate::metadata::ModelMetadata;
use crate::traits::{not_found, validate_model_id, ModelStore, StoredModel};

#[derive(Debug, Default)]
struct Lineage {
    last_version: u32,
    versions: BTreeMap<u32, StoredModel>,
}

/// Model store keeping every version in process memory.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    models: RwLock<HashMap<String, Lineage>>,
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> PlanForgeError {
    PlanForgeError::Internal("model store lock poisoned".into())
}

impl ModelStore for InMemoryModelStore {
    fn save(&self, metadata: ModelMetadata, blob: &[u8]) -> Result<ModelMetadata> {
        validate_model_id(&metadata.model_id)?;
        let mut models = self.models.write().map_err(|_| poisoned())?;
        let lineage = models.entry(metadata.model_id.clone()).or_default();
        let version = lineage
            .last_version
            .checked_add(1)
            .ok_or_else(|| PlanForgeError::Internal("model version overflow".into()))?;
        let metadata = metadata.assign_version(version);
        lineage.last_version = version;
        lineage.versions.insert(
            version,
            StoredModel {
                metadata: metadata.clone(),
                blob: blob.to_vec(),
            },
        );
        Ok(metadata)
    }

    fn load(&self, model_id: &str) -> Result<StoredModel> {
        validate_model_id(model_id)?;
        let models = self.models.read().map_err(|_| poisoned())?;
        models
            .get(model_id)
            .and_then(|l| l.versions.values().next_back())
            .cloned()
            .ok_or_else(|| not_found(model_id, None))
    }

    fn load_version(&self, model_id: &str, version: u32) -> Result<StoredModel> {
        validate_model_id(model_id)?;
        let models = self.models.read().map_err(|_| poisoned())?;
        models
            .get(model_id)
            .and_then(|l| l.versions.get(&version))
            .cloned()
            .ok_or_else(|| not_found(model_id, Some(version)))
    }

    fn list(&self) -> Result<Vec<ModelMetadata>> {
        let models = self.models.read().map_err(|_| poisoned())?;
        let mut out: Vec<ModelMetadata> = models
            .values()
            .filter_map(|l| l.versions.values().next_back())
            .map(|m| m.metadata.clone())
            .collect();
        out.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        Ok(out)
    }

    fn versions(&self, model_id: &str) -> Result<Vec<ModelMetadata>> {
        validate_model_id(model_id)?;
        let models = self.models.read().map_err(|_| poisoned())?;
        Ok(models
            .get(model_id)
            .map(|l| l.versions.values().map(|m| m.metadata.clone()).collect())
            .unwrap_or_default())
    }

    fn delete(&self, model_id: &str) -> Result<()> {
        validate_model_id(model_id)?;
        let mut models = self.models.write().map_err(|_| poisoned())?;
        match models.get_mut(model_id) {
            Some(lineage) if !lineage.versions.is_empty() => {
                // Keep the counter so versions are never reused.
                lineage.versions.clear();
                Ok(())
            }
            _ => Err(not_found(model_id, None)),
        }
    }
}
