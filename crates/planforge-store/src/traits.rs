//! Model store contract.

use planforge_core::{PlanForgeError, Result};

use crate::metadata::ModelMetadata;

/// A stored model: metadata plus its opaque weights blob.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredModel {
    pub metadata: ModelMetadata,
    pub blob: Vec<u8>,
}

/// Versioned key-value storage of model artifacts.
///
/// Implementations must be safe under concurrent readers, assign strictly
/// increasing versions per model id (never reusing a version, even after
/// `delete`) and never expose a partially written artifact.
pub trait ModelStore: Send + Sync {
    /// Stores a new version of `metadata.model_id`.
    ///
    /// The incoming `version` and `weights_ref` are ignored; the returned
    /// metadata carries the assigned values.
    fn save(&self, metadata: ModelMetadata, blob: &[u8]) -> Result<ModelMetadata>;

    /// Loads the latest version of `model_id`.
    fn load(&self, model_id: &str) -> Result<StoredModel>;

    /// Loads a specific version of `model_id`.
    fn load_version(&self, model_id: &str, version: u32) -> Result<StoredModel>;

    /// Returns metadata of the latest version of every model, sorted by id.
    fn list(&self) -> Result<Vec<ModelMetadata>>;

    /// Returns metadata of every stored version of `model_id`, oldest first.
    fn versions(&self, model_id: &str) -> Result<Vec<ModelMetadata>>;

    /// Removes every version of `model_id`.
    fn delete(&self, model_id: &str) -> Result<()>;
}

/// Rejects ids that are empty or could escape a store directory.
pub fn validate_model_id(model_id: &str) -> Result<()> {
    let valid = !model_id.is_empty()
        && model_id.len() <= 128
        && model_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(PlanForgeError::Validation(format!(
            "invalid model id '{model_id}': use 1-128 characters from [A-Za-z0-9_-]"
        )))
    }
}

pub(crate) fn not_found(model_id: &str, version: Option<u32>) -> PlanForgeError {
    PlanForgeError::ModelNotFound {
        model_id: model_id.to_string(),
        version,
    }
}
