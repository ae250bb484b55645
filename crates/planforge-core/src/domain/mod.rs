//! Project snapshots consumed by the engine.
//!
//! Resources and tasks are immutable, per-request copies of business
//! objects owned by an external system. The engine never writes them back.

mod graph;
mod resource;
mod task;

pub use graph::dependency_order;
pub use resource::{AvailabilityWindow, Resource};
pub use task::{Priority, Task};

#[cfg(test)]
mod tests;
