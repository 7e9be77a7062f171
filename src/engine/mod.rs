//! Compatibility resolution engine.
//!
//! - [`registry`] — one shared node per `(name, version)`, resolved through
//!   the metadata source during the build phase.
//! - [`builder`] — per-project top-level references, in manifest order.
//! - [`propagator`] — effective status with cycle-safe, memoised traversal.
//! - [`result`] — the read-only query surface handed to renderers.
//! - [`investigator`] — runs build then propagation for a set of manifests.

pub mod builder;
pub mod graph;
pub mod investigator;
pub mod propagator;
pub mod registry;
pub mod result;

#[cfg(test)]
pub(crate) mod testing;

pub use graph::NodeId;
pub use investigator::Investigator;
pub use registry::RegistryOptions;
pub use result::{InvestigationResult, ReportDocument};
