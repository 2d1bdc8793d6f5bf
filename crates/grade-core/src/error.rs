//! Error types for malformed input.
//!
//! Physically unresolvable spans are not errors; they are reported as
//! [`crate::corrector::UnresolvedSpan`] values.

use serde::Serialize;
use thiserror::Error;

/// Invalid [`crate::GradientRules`] values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RulesError {
    #[error("{name} must be finite, got {value}")]
    NonFinite { name: &'static str, value: f64 },
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error(
        "drop_structure_gradient ({drop_structure_gradient}) must be steeper than min_gradient ({min_gradient})"
    )]
    DropStructureTooShallow {
        drop_structure_gradient: f64,
        min_gradient: f64,
    },
}

/// Problems that prevent building a network at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("invalid rules: {0}")]
    Rules(#[from] RulesError),
}

/// Malformed input for a single alignment. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentError {
    #[error("alignment id '{alignment_id}' appears more than once")]
    DuplicateId { alignment_id: String },
    #[error("alignment '{alignment_id}' has {count} point(s); at least 2 are required")]
    TooFewPoints { alignment_id: String, count: usize },
    #[error("alignment '{alignment_id}' point {index} has a non-finite coordinate")]
    NonFinitePoint { alignment_id: String, index: usize },
    #[error(
        "alignment '{alignment_id}' run {start_index}->{} has zero horizontal length ({length_m} m)",
        .start_index + 1
    )]
    DegenerateRun {
        alignment_id: String,
        start_index: usize,
        length_m: f64,
    },
    #[error("alignment '{alignment_id}' anchors to node '{node_id}', whose id is not unique")]
    DuplicateNode {
        alignment_id: String,
        node_id: String,
    },
    #[error(
        "alignment '{alignment_id}' point {index} is equidistant ({distance_m} m) from nodes {candidates:?}"
    )]
    AmbiguousAnchor {
        alignment_id: String,
        index: usize,
        distance_m: f64,
        candidates: Vec<String>,
    },
}

impl AlignmentError {
    pub fn alignment_id(&self) -> &str {
        match self {
            AlignmentError::DuplicateId { alignment_id }
            | AlignmentError::TooFewPoints { alignment_id, .. }
            | AlignmentError::NonFinitePoint { alignment_id, .. }
            | AlignmentError::DegenerateRun { alignment_id, .. }
            | AlignmentError::DuplicateNode { alignment_id, .. }
            | AlignmentError::AmbiguousAnchor { alignment_id, .. } => alignment_id,
        }
    }
}
