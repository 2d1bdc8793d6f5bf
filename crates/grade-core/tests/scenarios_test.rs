//! End-to-end correction scenarios over small surveyed networks.

use grade_core::{
    build_network, run_analysis, Alignment, AlignmentOutcome, Classification, CorrectionResult,
    CorrectionStatus, GradientRules, Node, Point, SpanAction, SpanBoundary, UnresolvedReason,
};

fn rules() -> GradientRules {
    GradientRules::new(0.005, 0.05)
}

fn pipe(id: &str, points: &[(f64, f64)]) -> Alignment {
    Alignment::new(
        id,
        points.iter().map(|&(x, z)| Point::new(x, 0.0, z)).collect(),
    )
}

fn analyze_one(alignment: Alignment, nodes: Vec<Node>, rules: &GradientRules) -> CorrectionResult {
    let outcomes = run_analysis(&[alignment], &nodes, rules).unwrap();
    match outcomes.into_iter().next() {
        Some(AlignmentOutcome::Analyzed(result)) => result,
        other => panic!("expected analyzed outcome, got {other:?}"),
    }
}

fn gradients(points: &[Point]) -> Vec<f64> {
    points
        .windows(2)
        .map(|pair| (pair[1].z - pair[0].z) / pair[0].distance_2d(&pair[1]))
        .collect()
}

fn assert_anchors_unchanged(result: &CorrectionResult, nodes: &[Node]) {
    for node in nodes {
        for point in &result.corrected_points {
            if point.distance_2d(&node.position) <= rules().anchor_tolerance_m {
                assert_eq!(
                    point.z.to_bits(),
                    node.position.z.to_bits(),
                    "anchor {} moved",
                    node.id
                );
            }
        }
    }
}

#[test]
fn noisy_terrain_between_two_manholes_is_straightened() {
    let nodes = vec![
        Node::new("MH1", 0.0, 0.0, 100.0),
        Node::new("MH2", 100.0, 0.0, 98.0),
    ];
    let alignment = pipe(
        "P1",
        &[(0.0, 100.0), (25.0, 99.6), (50.0, 99.7), (75.0, 98.4), (100.0, 98.0)],
    );

    let result = analyze_one(alignment, nodes.clone(), &rules());

    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].classification, Classification::Uphill);
    assert_eq!(result.status, CorrectionStatus::Corrected);
    assert!(result.fully_corrected);

    // last run is compliant and clear of the hump, so it keeps its 0.4 m;
    // the remaining 1.6 m is spread over the first 75 m
    let expected = [100.0, 100.0 - 1.6 / 3.0, 100.0 - 3.2 / 3.0, 98.4, 98.0];
    for (point, want) in result.corrected_points.iter().zip(expected) {
        assert!((point.z - want).abs() < 1e-9, "got {} want {}", point.z, want);
    }
    for gradient in gradients(&result.corrected_points) {
        assert!(gradient <= -0.005 + 1e-9);
    }
    assert_anchors_unchanged(&result, &nodes);
}

#[test]
fn gradient_exactly_at_minimum_is_ok() {
    let nodes = vec![
        Node::new("MH1", 0.0, 0.0, 100.00),
        Node::new("MH2", 10.0, 0.0, 99.95),
    ];
    let alignment = pipe("P1", &[(0.0, 100.00), (10.0, 99.95)]);

    let result = analyze_one(alignment, nodes, &rules());

    assert!(result.violations.is_empty());
    assert_eq!(result.status, CorrectionStatus::Compliant);
    assert!(result.adjustments.is_empty());
}

#[test]
fn downstream_manhole_higher_than_upstream_is_reported() {
    let nodes = vec![
        Node::new("MH1", 0.0, 0.0, 100.0),
        Node::new("MH2", 40.0, 0.0, 100.4),
    ];
    let alignment = pipe("P1", &[(0.0, 100.0), (20.0, 100.1), (40.0, 100.4)]);

    let result = analyze_one(alignment.clone(), nodes, &rules());

    assert_eq!(result.status, CorrectionStatus::Partial);
    assert!(!result.fully_corrected);
    assert_eq!(result.corrected_points, alignment.points);
    assert_eq!(result.unresolved.len(), 1);

    let span = &result.unresolved[0];
    assert_eq!(span.reason, UnresolvedReason::InsufficientDrop);
    assert_eq!(span.start, SpanBoundary::Node { node_id: "MH1".into() });
    assert_eq!(span.end, SpanBoundary::Node { node_id: "MH2".into() });
    assert!((span.required_drop_m - 0.2).abs() < 1e-9);
    assert!((span.available_drop_m + 0.4).abs() < 1e-9);
}

#[test]
fn short_steep_drop_between_compliant_runs_is_preserved() {
    let nodes = vec![
        Node::new("MH1", 0.0, 0.0, 100.0),
        Node::new("MH2", 21.0, 0.0, 99.33),
    ];
    // 2% over 10 m, 27% over 1 m, 2% over 10 m
    let alignment = pipe("P1", &[(0.0, 100.0), (10.0, 99.8), (11.0, 99.53), (21.0, 99.33)]);

    let result = analyze_one(alignment.clone(), nodes, &rules());

    assert_eq!(result.status, CorrectionStatus::Compliant);
    assert!(result.violations.is_empty());
    assert_eq!(result.corrected_points, alignment.points);
}

#[test]
fn drop_structure_survives_repair_of_uphill_run_in_same_span() {
    let nodes = vec![
        Node::new("MH1", 0.0, 0.0, 104.5),
        Node::new("MH2", 80.0, 0.0, 101.5),
    ];
    // 3%, 14% drop, 2%, uphill, 4%
    let alignment = pipe(
        "PIPE1",
        &[
            (0.0, 104.5),
            (20.0, 103.9),
            (30.0, 102.5),
            (50.0, 102.1),
            (60.0, 102.3),
            (80.0, 101.5),
        ],
    );

    let result = analyze_one(alignment.clone(), nodes.clone(), &rules());

    assert_eq!(result.status, CorrectionStatus::Corrected);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.spans[0].action, SpanAction::CompliantRunsKept);

    let before = gradients(&alignment.points);
    let after = gradients(&result.corrected_points);
    assert!((before[1] + 0.14).abs() < 1e-9);
    assert_eq!(after[1].to_bits(), before[1].to_bits());
    for gradient in &after {
        assert!(*gradient <= -0.005 + 1e-9, "gradient {gradient}");
    }
    assert!(result.remaining_violations.is_empty());
    assert_anchors_unchanged(&result, &nodes);
}

#[test]
fn correcting_corrected_output_changes_nothing() {
    let nodes = vec![
        Node::new("MH1", 0.0, 0.0, 100.0),
        Node::new("MH2", 60.0, 0.0, 99.0),
        Node::new("MH3", 120.0, 0.0, 98.2),
    ];
    let alignment = pipe(
        "P1",
        &[
            (0.0, 100.0),
            (20.0, 100.2),
            (40.0, 99.1),
            (60.0, 99.0),
            (90.0, 99.3),
            (120.0, 98.2),
        ],
    );

    let first = analyze_one(alignment, nodes.clone(), &rules());
    assert_eq!(first.status, CorrectionStatus::Corrected);

    let again = analyze_one(Alignment::new("P1", first.corrected_points.clone()), nodes, &rules());
    assert_eq!(again.status, CorrectionStatus::Compliant);
    assert!(again.adjustments.is_empty());
    assert_eq!(again.corrected_points, first.corrected_points);
}

#[test]
fn violation_in_one_span_leaves_distant_span_alone() {
    let nodes = vec![
        Node::new("MH1", 0.0, 0.0, 100.0),
        Node::new("MH2", 30.0, 0.0, 99.5),
        Node::new("MH3", 60.0, 0.0, 99.0),
        Node::new("MH4", 90.0, 0.0, 97.0),
    ];
    // first span has a hump, last span carries an odd but compliant profile
    let alignment = pipe(
        "P1",
        &[
            (0.0, 100.0),
            (15.0, 100.3),
            (30.0, 99.5),
            (45.0, 99.3),
            (60.0, 99.0),
            (70.0, 98.0),
            (80.0, 97.9),
            (90.0, 97.0),
        ],
    );

    let result = analyze_one(alignment.clone(), nodes.clone(), &rules());

    assert_eq!(result.spans.len(), 3);
    assert_eq!(result.spans[0].action, SpanAction::Interpolated);
    assert_eq!(result.spans[1].action, SpanAction::Unchanged);
    assert_eq!(result.spans[2].action, SpanAction::Unchanged);
    for idx in 2..alignment.points.len() {
        assert_eq!(
            result.corrected_points[idx].z.to_bits(),
            alignment.points[idx].z.to_bits()
        );
    }
    assert!((result.corrected_points[1].z - 99.75).abs() < 1e-9);
    assert_anchors_unchanged(&result, &nodes);
}

#[test]
fn one_unfixable_span_does_not_block_the_others() {
    let nodes = vec![
        Node::new("MH1", 0.0, 0.0, 100.0),
        Node::new("MH2", 20.0, 0.0, 99.0),
        Node::new("MH3", 40.0, 0.0, 99.2),
    ];
    let alignment = pipe(
        "P1",
        &[(0.0, 100.0), (10.0, 100.5), (20.0, 99.0), (30.0, 99.1), (40.0, 99.2)],
    );

    let result = analyze_one(alignment, nodes, &rules());

    assert_eq!(result.status, CorrectionStatus::Partial);
    assert_eq!(result.spans[0].action, SpanAction::Interpolated);
    assert_eq!(result.spans[1].action, SpanAction::Unresolved);
    assert!((result.corrected_points[1].z - 99.5).abs() < 1e-9);
    assert_eq!(result.corrected_points[3].z, 99.1);
    assert_eq!(result.remaining_violations.len(), 2);
}

#[test]
fn pipes_sharing_a_junction_are_corrected_independently() {
    let nodes = vec![
        Node::new("UP1", -50.0, 0.0, 101.0),
        Node::new("UP2", 0.0, -50.0, 101.0),
        Node::new("J", 0.0, 0.0, 100.0),
        Node::new("OUT", 50.0, 0.0, 99.0),
    ];
    let alignments = vec![
        Alignment::new(
            "A",
            vec![
                Point::new(-50.0, 0.0, 101.0),
                Point::new(-25.0, 0.0, 101.2),
                Point::new(0.0, 0.0, 100.0),
            ],
        ),
        Alignment::new(
            "B",
            vec![
                Point::new(0.0, -50.0, 101.0),
                Point::new(0.0, -25.0, 100.4),
                Point::new(0.0, 0.0, 100.0),
            ],
        ),
        Alignment::new(
            "C",
            vec![
                Point::new(0.0, 0.0, 100.0),
                Point::new(25.0, 0.0, 100.1),
                Point::new(50.0, 0.0, 99.0),
            ],
        ),
    ];

    let graph = build_network(&alignments, &nodes, &rules()).unwrap();
    assert_eq!(graph.alignments_at("J").len(), 3);

    let outcomes = run_analysis(&alignments, &nodes, &rules()).unwrap();
    let statuses: Vec<_> = outcomes
        .iter()
        .map(|outcome| outcome.result().unwrap().status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            CorrectionStatus::Corrected,
            CorrectionStatus::Compliant,
            CorrectionStatus::Corrected
        ]
    );
    for outcome in &outcomes {
        assert_anchors_unchanged(outcome.result().unwrap(), &nodes);
    }
}

#[test]
fn pipe_ending_away_from_any_manhole_uses_upstream_anchor() {
    let nodes = vec![Node::new("MH1", 0.0, 0.0, 100.0)];
    let alignment = pipe("P1", &[(0.0, 100.0), (20.0, 100.05), (40.0, 99.0)]);

    let result = analyze_one(alignment, nodes, &rules());

    assert_eq!(result.status, CorrectionStatus::Corrected);
    assert_eq!(result.spans[0].action, SpanAction::ClampedFromAnchor);
    assert!((result.corrected_points[1].z - 99.9).abs() < 1e-9);
    assert_eq!(result.corrected_points[2].z, 99.0);
}

#[test]
fn pipe_without_manholes_is_flagged() {
    let alignment = pipe("P1", &[(0.0, 100.0), (20.0, 100.5), (40.0, 99.0)]);

    let result = analyze_one(alignment.clone(), Vec::new(), &rules());

    assert_eq!(result.status, CorrectionStatus::Unanchored);
    assert!(!result.fully_corrected);
    assert_eq!(result.corrected_points, alignment.points);
    assert_eq!(result.unresolved[0].reason, UnresolvedReason::NoAnchor);
}
