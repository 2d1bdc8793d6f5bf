//! Gradient certification and repair for gravity pipe networks.
//!
//! Three stages, each depending only on the one before it:
//! connectivity (which alignment points sit on which nodes), classification
//! (slope of every run) and correction (rewrite non-anchor elevations so
//! every run flows downhill at or above the minimum gradient).

pub mod analysis;
pub mod classifier;
pub mod connectivity;
pub mod corrector;
pub mod error;
pub mod models;
pub mod report;
pub mod rules;

pub use analysis::{
    analyze_alignment, analyze_indexed, analyze_network, run_analysis, AlignmentOutcome,
};
pub use classifier::{classify_gradient, classify_runs};
pub use connectivity::{
    build_network, AlignmentConnectivity, AnchorMatch, EndpointAnchor, NetworkGraph, NodeIncidence,
};
pub use corrector::{
    correct_alignment, CorrectionResult, CorrectionStatus, PointAdjustment, Span, SpanAction,
    SpanBoundary, SpanOutcome, UnresolvedReason, UnresolvedSpan,
};
pub use error::{AlignmentError, NetworkError, RulesError};
pub use models::{Alignment, Classification, Node, Point, Run};
pub use report::NetworkReport;
pub use rules::GradientRules;
