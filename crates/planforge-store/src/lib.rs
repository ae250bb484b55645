//! Versioned model store for PlanForge.
//!
//! Trained models are persisted as an opaque weights blob plus JSON
//! metadata. Versions are assigned by the store and strictly increase per
//! model id; a deleted model's counter is kept so versions are never
//! reused.
//!
//! # Example
//!
//! ```
//! use planforge_store::{InMemoryModelStore, ModelMetadata, ModelStore, ModelType, NormalizationParams};
//!
//! let store = InMemoryModelStore::new();
//! let draft = ModelMetadata::draft(
//!     "cost_forecaster",
//!     ModelType::CostForecaster,
//!     NormalizationParams::identity(10),
//! );
//! let saved = store.save(draft, b"weights").unwrap();
//! assert_eq!(saved.version, 1);
//! assert_eq!(store.load("cost_forecaster").unwrap().blob, b"weights");
//! ```

mod file;
mod memory;
mod metadata;
mod retry;
mod traits;

pub use file::FileModelStore;
pub use memory::InMemoryModelStore;
pub use metadata::{BlobRef, ColumnScale, ModelMetadata, ModelType, NormalizationParams};
pub use retry::{RetryPolicy, RetryingStore};
pub use traits::{validate_model_id, ModelStore, StoredModel};

#[cfg(test)]
mod tests;
