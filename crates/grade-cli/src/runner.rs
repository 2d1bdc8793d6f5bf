//! Parallel per-alignment analysis.
//!
//! The network graph is built before this runs and is only read here. Each
//! alignment gets its own blocking task; results are put back in input order.

use anyhow::{Context, Result};
use grade_core::{analyze_indexed, Alignment, AlignmentOutcome, GradientRules, NetworkGraph};
use std::sync::Arc;
use tokio::task::JoinSet;

pub async fn analyze_parallel(
    alignments: Arc<[Alignment]>,
    graph: Arc<NetworkGraph>,
    rules: Arc<GradientRules>,
) -> Result<Vec<AlignmentOutcome>> {
    let mut tasks = JoinSet::new();
    for index in 0..alignments.len() {
        let alignments = Arc::clone(&alignments);
        let graph = Arc::clone(&graph);
        let rules = Arc::clone(&rules);
        tasks.spawn_blocking(move || (index, analyze_indexed(&alignments, &graph, index, &rules)));
    }

    let mut slots: Vec<Option<AlignmentOutcome>> = (0..alignments.len()).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let (index, outcome) = joined.context("alignment analysis task failed")?;
        slots[index] = outcome;
    }

    Ok(slots.into_iter().flatten().collect())
}
