use thiserror::Error;

/// Conditions that make a whole investigation meaningless.
///
/// Per-package problems never end up here; they degrade to
/// [`CompatibilityStatus::Unknown`](crate::models::CompatibilityStatus::Unknown)
/// and a [`Diagnostic`](crate::models::Diagnostic).
#[derive(Debug, Error)]
pub enum InvestigationError {
    #[error("no projects were supplied to the investigation")]
    NoProjects,
}
