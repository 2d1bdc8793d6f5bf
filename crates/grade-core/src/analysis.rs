//! Per-alignment analysis pipeline.
//!
//! Connectivity must be resolved for the whole network first; after that
//! each alignment is classified and corrected on its own, reading the
//! shared [`NetworkGraph`] snapshot.

use crate::classifier::classify_runs;
use crate::connectivity::{build_network, AlignmentConnectivity, NetworkGraph};
use crate::corrector::{anchored_profile, correct_alignment, CorrectionResult};
use crate::error::{AlignmentError, NetworkError};
use crate::models::{Alignment, Node};
use crate::rules::GradientRules;
use serde::Serialize;

/// Result of analysing one alignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlignmentOutcome {
    Analyzed(CorrectionResult),
    Rejected {
        alignment_id: String,
        message: String,
        error: AlignmentError,
    },
}

impl AlignmentOutcome {
    pub fn rejected(error: AlignmentError) -> Self {
        AlignmentOutcome::Rejected {
            alignment_id: error.alignment_id().to_string(),
            message: error.to_string(),
            error,
        }
    }

    pub fn alignment_id(&self) -> &str {
        match self {
            AlignmentOutcome::Analyzed(result) => &result.alignment_id,
            AlignmentOutcome::Rejected { alignment_id, .. } => alignment_id,
        }
    }

    pub fn result(&self) -> Option<&CorrectionResult> {
        match self {
            AlignmentOutcome::Analyzed(result) => Some(result),
            AlignmentOutcome::Rejected { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&AlignmentError> {
        match self {
            AlignmentOutcome::Analyzed(_) => None,
            AlignmentOutcome::Rejected { error, .. } => Some(error),
        }
    }
}

/// Classify and correct one alignment against its resolved connectivity.
pub fn analyze_alignment(
    alignment: &Alignment,
    connectivity: &Result<AlignmentConnectivity, AlignmentError>,
    rules: &GradientRules,
) -> AlignmentOutcome {
    let connectivity = match connectivity {
        Ok(connectivity) => connectivity,
        Err(err) => return AlignmentOutcome::rejected(err.clone()),
    };

    let profile = anchored_profile(alignment, connectivity);
    let runs = match classify_runs(&alignment.id, &profile, rules) {
        Ok(runs) => runs,
        Err(err) => {
            tracing::warn!(alignment = %alignment.id, "rejected alignment: {}", err);
            return AlignmentOutcome::rejected(err);
        }
    };

    AlignmentOutcome::Analyzed(correct_alignment(alignment, connectivity, &runs, rules))
}

/// Analyse the alignment at `index` of the input used to build `graph`.
pub fn analyze_indexed(
    alignments: &[Alignment],
    graph: &NetworkGraph,
    index: usize,
    rules: &GradientRules,
) -> Option<AlignmentOutcome> {
    let alignment = alignments.get(index)?;
    let connectivity = graph.connectivity(index)?;
    Some(analyze_alignment(alignment, connectivity, rules))
}

/// Sequentially analyse every alignment of a built network, in input order.
pub fn analyze_network(
    alignments: &[Alignment],
    graph: &NetworkGraph,
    rules: &GradientRules,
) -> Vec<AlignmentOutcome> {
    alignments
        .iter()
        .zip(graph.connectivities())
        .map(|(alignment, connectivity)| analyze_alignment(alignment, connectivity, rules))
        .collect()
}

/// Build the network and analyse it in one call.
pub fn run_analysis(
    alignments: &[Alignment],
    nodes: &[Node],
    rules: &GradientRules,
) -> Result<Vec<AlignmentOutcome>, NetworkError> {
    let graph = build_network(alignments, nodes, rules)?;
    Ok(analyze_network(alignments, &graph, rules))
}
