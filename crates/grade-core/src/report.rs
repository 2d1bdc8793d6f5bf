//! Network-wide summary of analysis outcomes.

use crate::analysis::AlignmentOutcome;
use crate::corrector::CorrectionStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    pub total_alignments: usize,
    pub compliant: usize,
    pub corrected: usize,
    pub partial: usize,
    pub unanchored: usize,
    pub rejected: usize,
    /// Runs that were not `Ok` before correction
    pub violations_found: usize,
    /// Runs still not `Ok` after correction
    pub violations_remaining: usize,
    pub adjusted_points: usize,
    pub unresolved_spans: usize,
    /// Sum of absolute elevation changes (meters)
    pub total_elevation_change_m: f64,
    /// Largest single-point elevation change (meters)
    pub max_elevation_change_m: f64,
}

impl NetworkReport {
    pub fn from_outcomes(outcomes: &[AlignmentOutcome]) -> Self {
        let mut report = NetworkReport {
            total_alignments: outcomes.len(),
            ..Default::default()
        };

        for outcome in outcomes {
            let Some(result) = outcome.result() else {
                report.rejected += 1;
                continue;
            };

            match result.status {
                CorrectionStatus::Compliant => report.compliant += 1,
                CorrectionStatus::Corrected => report.corrected += 1,
                CorrectionStatus::Partial => report.partial += 1,
                CorrectionStatus::Unanchored => report.unanchored += 1,
            }
            report.violations_found += result.violations.len();
            report.violations_remaining += result.remaining_violations.len();
            report.unresolved_spans += result.unresolved.len();
            report.adjusted_points += result.adjustments.len();
            for adjustment in &result.adjustments {
                let change = adjustment.delta().abs();
                report.total_elevation_change_m += change;
                report.max_elevation_change_m = report.max_elevation_change_m.max(change);
            }
        }

        report
    }

    /// Alignments whose result can be accepted without review.
    pub fn fully_corrected(&self) -> usize {
        self.compliant + self.corrected
    }

    pub fn needs_review(&self) -> bool {
        self.partial + self.unanchored + self.rejected > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::run_analysis;
    use crate::models::{Alignment, Node, Point};
    use crate::rules::GradientRules;

    #[test]
    fn report_counts_each_status() {
        let alignments = vec![
            // compliant
            Alignment::new("OK", vec![Point::new(0.0, 0.0, 100.0), Point::new(100.0, 0.0, 99.0)]),
            // corrected: uphill interior
            Alignment::new(
                "FIX",
                vec![
                    Point::new(0.0, 100.0, 100.0),
                    Point::new(50.0, 100.0, 100.5),
                    Point::new(100.0, 100.0, 99.0),
                ],
            ),
            // partial: anchors rise downstream
            Alignment::new(
                "RISE",
                vec![Point::new(0.0, 200.0, 99.0), Point::new(100.0, 200.0, 99.5)],
            ),
            // no anchors
            Alignment::new(
                "FREE",
                vec![Point::new(0.0, 900.0, 99.0), Point::new(100.0, 900.0, 98.0)],
            ),
            // rejected
            Alignment::new("ONE", vec![Point::new(0.0, 500.0, 99.0)]),
        ];
        let nodes = vec![
            Node::new("A", 0.0, 0.0, 100.0),
            Node::new("B", 100.0, 0.0, 99.0),
            Node::new("C", 0.0, 100.0, 100.0),
            Node::new("D", 100.0, 100.0, 99.0),
            Node::new("E", 0.0, 200.0, 99.0),
            Node::new("F", 100.0, 200.0, 99.5),
        ];

        let outcomes = run_analysis(&alignments, &nodes, &GradientRules::new(0.005, 0.05)).unwrap();
        let report = NetworkReport::from_outcomes(&outcomes);

        assert_eq!(report.total_alignments, 5);
        assert_eq!(report.compliant, 1);
        assert_eq!(report.corrected, 1);
        assert_eq!(report.partial, 1);
        assert_eq!(report.unanchored, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.fully_corrected(), 2);
        assert!(report.needs_review());
        assert_eq!(report.unresolved_spans, 1);
        assert_eq!(report.adjusted_points, 1);
        assert!((report.total_elevation_change_m - 1.0).abs() < 1e-9);
        assert_eq!(report.violations_remaining, 1);
    }

    #[test]
    fn empty_report_needs_no_review() {
        let report = NetworkReport::from_outcomes(&[]);
        assert_eq!(report, NetworkReport::default());
        assert!(!report.needs_review());
    }
}
