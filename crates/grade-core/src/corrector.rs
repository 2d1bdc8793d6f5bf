//! Gradient corrector.
//!
//! Splits an alignment into spans at its anchors and repairs only the spans
//! that contain a violated run. Spans are index ranges into the point
//! sequence; repair is an in-place overwrite of that range in a fresh copy
//! of the profile. Anchor elevations are never touched.

use crate::classifier::{classify_gradient, classify_runs};
use crate::connectivity::AlignmentConnectivity;
use crate::models::{Alignment, Point, Run};
use crate::rules::GradientRules;
use serde::{Deserialize, Serialize};

/// One end of a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpanBoundary {
    Node { node_id: String },
    Unanchored,
}

impl SpanBoundary {
    pub fn is_anchored(&self) -> bool {
        matches!(self, SpanBoundary::Node { .. })
    }
}

impl std::fmt::Display for SpanBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpanBoundary::Node { node_id } => write!(f, "{}", node_id),
            SpanBoundary::Unanchored => write!(f, "unanchored"),
        }
    }
}

/// Anchor-to-anchor (or anchor-to-free-end) slice of an alignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_index: usize,
    pub end_index: usize,
    pub start: SpanBoundary,
    pub end: SpanBoundary,
}

impl Span {
    /// Run indices covered by this span.
    pub fn runs(&self) -> std::ops::Range<usize> {
        self.start_index..self.end_index
    }
}

/// What the corrector did with a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanAction {
    /// No violated run; passed through
    Unchanged,
    /// Uniform gradient between the two anchors
    Interpolated,
    /// Compliant runs kept, remaining drop spread uniformly over the rest
    CompliantRunsKept,
    /// Walked away from the single anchor, fixing runs to the minimum
    ClampedFromAnchor,
    /// Could not be repaired; original elevations kept
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanOutcome {
    pub span: Span,
    pub violated_runs: usize,
    pub action: SpanAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// Anchors do not drop enough over the span's horizontal length
    InsufficientDrop,
    /// No anchor bounds the span, so there is nothing to correct toward
    NoAnchor,
}

/// A span left uncorrected, with the drop it needed and the drop it had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedSpan {
    pub start_index: usize,
    pub end_index: usize,
    pub start: SpanBoundary,
    pub end: SpanBoundary,
    pub horizontal_length_m: f64,
    pub required_drop_m: f64,
    pub available_drop_m: f64,
    pub reason: UnresolvedReason,
}

/// A point whose elevation differs from the input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointAdjustment {
    pub index: usize,
    pub original_z: f64,
    pub corrected_z: f64,
}

impl PointAdjustment {
    pub fn delta(&self) -> f64 {
        self.corrected_z - self.original_z
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionStatus {
    /// Every run was already `Ok`
    Compliant,
    /// Every violation was repaired
    Corrected,
    /// At least one span could not be repaired
    Partial,
    /// No anchor at all; elevations left as supplied
    Unanchored,
}

/// Per-alignment correction output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionResult {
    pub alignment_id: String,
    pub original_points: Vec<Point>,
    pub corrected_points: Vec<Point>,
    /// Runs that were not `Ok` before correction
    pub violations: Vec<Run>,
    /// Runs still not `Ok` after correction
    pub remaining_violations: Vec<Run>,
    pub spans: Vec<SpanOutcome>,
    pub unresolved: Vec<UnresolvedSpan>,
    pub adjustments: Vec<PointAdjustment>,
    pub status: CorrectionStatus,
    pub fully_corrected: bool,
}

/// Input points with anchored points set to their node elevation.
pub fn anchored_profile(alignment: &Alignment, connectivity: &AlignmentConnectivity) -> Vec<Point> {
    let mut profile = alignment.points.clone();
    for anchor in &connectivity.anchors {
        if let Some(point) = profile.get_mut(anchor.point_index) {
            point.z = anchor.elevation;
        }
    }
    profile
}

/// Split `point_count` points into spans at the anchors.
pub fn split_spans(point_count: usize, connectivity: &AlignmentConnectivity) -> Vec<Span> {
    let last = point_count.saturating_sub(1);
    let boundary = |idx: usize| {
        connectivity
            .anchor_at(idx)
            .map(|anchor| SpanBoundary::Node {
                node_id: anchor.node_id.clone(),
            })
            .unwrap_or(SpanBoundary::Unanchored)
    };

    let anchor_indices: Vec<usize> = connectivity
        .anchors
        .iter()
        .map(|anchor| anchor.point_index)
        .filter(|&idx| idx <= last)
        .collect();

    let (Some(&first), Some(&final_anchor)) = (anchor_indices.first(), anchor_indices.last())
    else {
        return vec![Span {
            start_index: 0,
            end_index: last,
            start: SpanBoundary::Unanchored,
            end: SpanBoundary::Unanchored,
        }];
    };

    let mut spans = Vec::with_capacity(anchor_indices.len() + 1);
    if first > 0 {
        spans.push(Span {
            start_index: 0,
            end_index: first,
            start: SpanBoundary::Unanchored,
            end: boundary(first),
        });
    }
    for pair in anchor_indices.windows(2) {
        spans.push(Span {
            start_index: pair[0],
            end_index: pair[1],
            start: boundary(pair[0]),
            end: boundary(pair[1]),
        });
    }
    if final_anchor < last {
        spans.push(Span {
            start_index: final_anchor,
            end_index: last,
            start: boundary(final_anchor),
            end: SpanBoundary::Unanchored,
        });
    }
    spans
}

/// Repair an alignment.
///
/// `runs` must be the classification of [`anchored_profile`] for the same
/// alignment and connectivity; the analysis pipeline guarantees this.
pub fn correct_alignment(
    alignment: &Alignment,
    connectivity: &AlignmentConnectivity,
    runs: &[Run],
    rules: &GradientRules,
) -> CorrectionResult {
    let mut profile = anchored_profile(alignment, connectivity);
    let spans = split_spans(profile.len(), connectivity);

    let mut outcomes = Vec::with_capacity(spans.len());
    let mut unresolved = Vec::new();

    for span in spans {
        let violated_runs = runs[span.runs()]
            .iter()
            .filter(|run| run.is_violation())
            .count();

        let action = if violated_runs == 0 {
            SpanAction::Unchanged
        } else {
            match (span.start.is_anchored(), span.end.is_anchored()) {
                (true, true) => match repair_between_anchors(&mut profile, runs, &span, rules) {
                    Ok(action) => action,
                    Err(report) => {
                        unresolved.push(report);
                        SpanAction::Unresolved
                    }
                },
                (true, false) => {
                    clamp_downstream(&mut profile, runs, &span, rules);
                    SpanAction::ClampedFromAnchor
                }
                (false, true) => {
                    clamp_upstream(&mut profile, runs, &span, rules);
                    SpanAction::ClampedFromAnchor
                }
                (false, false) => {
                    unresolved.push(unresolved_span(
                        &profile,
                        runs,
                        &span,
                        rules,
                        UnresolvedReason::NoAnchor,
                    ));
                    SpanAction::Unresolved
                }
            }
        };

        tracing::debug!(
            alignment = %alignment.id,
            start = span.start_index,
            end = span.end_index,
            violated_runs,
            ?action,
            "span processed"
        );
        outcomes.push(SpanOutcome {
            span,
            violated_runs,
            action,
        });
    }

    for report in &unresolved {
        tracing::warn!(
            alignment = %alignment.id,
            "span {} ({}) -> {} ({}) unresolved: requires {:.3} m drop, has {:.3} m",
            report.start_index,
            report.start,
            report.end_index,
            report.end,
            report.required_drop_m,
            report.available_drop_m
        );
    }

    let violations: Vec<Run> = runs.iter().filter(|run| run.is_violation()).copied().collect();
    // Horizontal positions are unchanged, so re-measuring cannot hit a
    // degenerate run that classification did not already reject.
    let remaining_violations = classify_runs(&alignment.id, &profile, rules)
        .map(|after| after.into_iter().filter(|run| run.is_violation()).collect())
        .unwrap_or_default();

    let adjustments = alignment
        .points
        .iter()
        .zip(&profile)
        .enumerate()
        .filter(|(_, (before, after))| before.z.to_bits() != after.z.to_bits())
        .map(|(index, (before, after))| PointAdjustment {
            index,
            original_z: before.z,
            corrected_z: after.z,
        })
        .collect();

    let status = if connectivity.is_unanchored() {
        CorrectionStatus::Unanchored
    } else if violations.is_empty() {
        CorrectionStatus::Compliant
    } else if unresolved.is_empty() {
        CorrectionStatus::Corrected
    } else {
        CorrectionStatus::Partial
    };
    if status == CorrectionStatus::Unanchored {
        tracing::warn!(
            alignment = %alignment.id,
            violations = violations.len(),
            "alignment has no anchor; left uncorrected"
        );
    }

    CorrectionResult {
        alignment_id: alignment.id.clone(),
        original_points: alignment.points.clone(),
        corrected_points: profile,
        violations,
        remaining_violations,
        spans: outcomes,
        unresolved,
        adjustments,
        fully_corrected: matches!(
            status,
            CorrectionStatus::Compliant | CorrectionStatus::Corrected
        ),
        status,
    }
}

fn span_length(runs: &[Run], span: &Span) -> f64 {
    runs[span.runs()]
        .iter()
        .map(|run| run.horizontal_length_m)
        .sum()
}

fn unresolved_span(
    profile: &[Point],
    runs: &[Run],
    span: &Span,
    rules: &GradientRules,
    reason: UnresolvedReason,
) -> UnresolvedSpan {
    let horizontal_length_m = span_length(runs, span);
    UnresolvedSpan {
        start_index: span.start_index,
        end_index: span.end_index,
        start: span.start.clone(),
        end: span.end.clone(),
        horizontal_length_m,
        required_drop_m: rules.required_drop(horizontal_length_m),
        available_drop_m: profile[span.start_index].z - profile[span.end_index].z,
        reason,
    }
}

/// Repair a span bounded by anchors on both ends.
///
/// Kept runs (see [`is_kept`]) hold their drop and the remaining drop is
/// spread uniformly over the other runs. When nothing can be kept, or the
/// remainder would fall below the minimum, interior points go onto a
/// uniform gradient from anchor to anchor.
fn repair_between_anchors(
    profile: &mut [Point],
    runs: &[Run],
    span: &Span,
    rules: &GradientRules,
) -> Result<SpanAction, UnresolvedSpan> {
    let total_length = span_length(runs, span);
    let start_z = profile[span.start_index].z;
    let end_z = profile[span.end_index].z;
    let available = start_z - end_z;
    let slack = rules.gradient_epsilon * total_length;

    if available < rules.required_drop(total_length) - slack {
        return Err(unresolved_span(
            profile,
            runs,
            span,
            rules,
            UnresolvedReason::InsufficientDrop,
        ));
    }

    if keep_compliant_runs(profile, runs, span, rules) {
        return Ok(SpanAction::CompliantRunsKept);
    }

    let mut distance = 0.0;
    for run in &runs[span.start_index..span.end_index - 1] {
        distance += run.horizontal_length_m;
        profile[run.end_index()].z = start_z - available * distance / total_length;
    }
    Ok(SpanAction::Interpolated)
}

/// A compliant run keeps its drop when it shares no point with a violated
/// run of the same span, or when it is at least as steep as the configured
/// drop-structure gradient.
fn is_kept(runs: &[Run], span: &Span, index: usize, rules: &GradientRules) -> bool {
    let run = &runs[index];
    if !run.classification.is_ok() {
        return false;
    }
    if let Some(drop_gradient) = rules.drop_structure_gradient {
        if run.gradient <= -drop_gradient {
            return true;
        }
    }
    let violated_before = index > span.start_index && runs[index - 1].is_violation();
    let violated_after = index + 1 < span.end_index && runs[index + 1].is_violation();
    !violated_before && !violated_after
}

fn keep_compliant_runs(
    profile: &mut [Point],
    runs: &[Run],
    span: &Span,
    rules: &GradientRules,
) -> bool {
    let kept: Vec<bool> = span
        .runs()
        .map(|index| is_kept(runs, span, index, rules))
        .collect();
    let span_runs = &runs[span.runs()];

    let (kept_length, kept_drop) = span_runs
        .iter()
        .zip(&kept)
        .filter(|(_, keep)| **keep)
        .fold((0.0, 0.0), |(length, drop), (run, _)| {
            (length + run.horizontal_length_m, drop - run.elevation_delta_m)
        });
    if kept_length == 0.0 {
        return false;
    }

    let rest_length = span_length(runs, span) - kept_length;
    if rest_length <= 0.0 {
        return false;
    }
    let original: Vec<f64> = profile[span.start_index..=span.end_index]
        .iter()
        .map(|point| point.z)
        .collect();
    let rest_drop = (original[0] - original[original.len() - 1]) - kept_drop;
    if rest_drop < rules.required_drop(rest_length) - rules.gradient_epsilon * rest_length {
        return false;
    }

    // A kept run moves with its upstream point; while nothing upstream has
    // moved it keeps its surveyed elevations exactly.
    let rest_gradient = rest_drop / rest_length;
    for (offset, (run, &keep)) in span_runs
        .iter()
        .zip(&kept)
        .enumerate()
        .take(span_runs.len() - 1)
    {
        let upstream_z = profile[run.start_index].z;
        profile[run.end_index()].z = if keep {
            original[offset + 1] + (upstream_z - original[offset])
        } else {
            upstream_z - rest_gradient * run.horizontal_length_m
        };
    }
    true
}

/// Fix a span whose upstream end is anchored and downstream end is free.
/// Points are only ever lowered, and only as far as the minimum demands.
fn clamp_downstream(profile: &mut [Point], runs: &[Run], span: &Span, rules: &GradientRules) {
    for run in &runs[span.runs()] {
        let upstream_z = profile[run.start_index].z;
        let downstream = &mut profile[run.end_index()];
        let gradient = (downstream.z - upstream_z) / run.horizontal_length_m;
        if !classify_gradient(gradient, rules).is_ok() {
            downstream.z = upstream_z - rules.required_drop(run.horizontal_length_m);
        }
    }
}

/// Fix a span whose downstream end is anchored and upstream end is free.
/// Points are only ever raised, and only as far as the minimum demands.
fn clamp_upstream(profile: &mut [Point], runs: &[Run], span: &Span, rules: &GradientRules) {
    for run in runs[span.runs()].iter().rev() {
        let downstream_z = profile[run.end_index()].z;
        let upstream = &mut profile[run.start_index];
        let gradient = (downstream_z - upstream.z) / run.horizontal_length_m;
        if !classify_gradient(gradient, rules).is_ok() {
            upstream.z = downstream_z + rules.required_drop(run.horizontal_length_m);
        }
    }
}
