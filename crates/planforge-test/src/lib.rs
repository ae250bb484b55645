//! Shared test fixtures for PlanForge crates.
//!
//! This crate provides deterministic data builders for tests. It depends
//! only on `planforge-core` so every other crate can use it as a
//! dev-dependency without cycles.
//!
//! - [`project`] - resource pools, task lists and optimization requests
//! - [`history`] - historical project series for forecasting
//! - [`data`] - raw feature rows for training models
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! planforge-test = { workspace = true }
//! ```
//!
//! ```
//! use planforge_test::project::project_request;
//!
//! let request = project_request(6, 3);
//! assert_eq!(request.tasks.len(), 6);
//! assert!(request.validate().is_ok());
//! ```

pub mod data;
pub mod history;
pub mod project;

pub use data::{separable_rows, sequence_rows};
pub use history::{overrun_history, steady_history};
pub use project::{chained_request, project_request, resources, tasks, SKILLS};
