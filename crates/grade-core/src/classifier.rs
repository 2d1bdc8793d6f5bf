//! Gradient classifier.
//!
//! Walks an alignment's ordered points and classifies every run by flow
//! direction and slope severity. There is no upper severity band: a drop
//! structure is just a very negative `Ok` run.

use crate::error::AlignmentError;
use crate::models::{Classification, Point, Run};
use crate::rules::GradientRules;

/// Classify a gradient (negative = downhill in point order).
pub fn classify_gradient(gradient: f64, rules: &GradientRules) -> Classification {
    let eps = rules.gradient_epsilon;
    if gradient <= -rules.min_gradient + eps {
        Classification::Ok
    } else if gradient > eps {
        Classification::Uphill
    } else {
        Classification::Insufficient
    }
}

fn measure_run(
    alignment_id: &str,
    start_index: usize,
    upstream: &Point,
    downstream: &Point,
    rules: &GradientRules,
) -> Result<Run, AlignmentError> {
    let horizontal_length_m = upstream.distance_2d(downstream);
    if !(horizontal_length_m >= rules.min_run_length_m) {
        return Err(AlignmentError::DegenerateRun {
            alignment_id: alignment_id.to_string(),
            start_index,
            length_m: horizontal_length_m,
        });
    }

    let elevation_delta_m = downstream.z - upstream.z;
    let gradient = elevation_delta_m / horizontal_length_m;
    Ok(Run {
        start_index,
        horizontal_length_m,
        elevation_delta_m,
        gradient,
        classification: classify_gradient(gradient, rules),
    })
}

/// Classify every run of an alignment in flow order.
///
/// Degenerate runs reject the whole alignment; gradient is undefined there.
pub fn classify_runs(
    alignment_id: &str,
    points: &[Point],
    rules: &GradientRules,
) -> Result<Vec<Run>, AlignmentError> {
    if points.len() < 2 {
        return Err(AlignmentError::TooFewPoints {
            alignment_id: alignment_id.to_string(),
            count: points.len(),
        });
    }

    points
        .windows(2)
        .enumerate()
        .map(|(start_index, pair)| {
            measure_run(alignment_id, start_index, &pair[0], &pair[1], rules)
        })
        .collect()
}

/// True if every run is `Ok`.
pub fn is_compliant(runs: &[Run]) -> bool {
    runs.iter().all(|run| run.classification.is_ok())
}
