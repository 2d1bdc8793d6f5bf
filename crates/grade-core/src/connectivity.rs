//! Connectivity builder.
//!
//! Matches alignment points to nodes by horizontal proximity and freezes the
//! result into a read-only [`NetworkGraph`] snapshot. Classification and
//! correction only ever borrow the snapshot, so alignments can be processed
//! in any order and on any thread once it is built.

use crate::error::{AlignmentError, NetworkError};
use crate::models::{Alignment, Node, Point};
use crate::rules::GradientRules;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Lower bound for grid cells so a zero tolerance still yields a usable index.
const MIN_CELL_SIZE_M: f64 = 0.01;

/// What an alignment endpoint terminates at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointAnchor {
    Node { node_id: String, distance_m: f64 },
    Unanchored,
}

impl EndpointAnchor {
    pub fn node_id(&self) -> Option<&str> {
        match self {
            EndpointAnchor::Node { node_id, .. } => Some(node_id),
            EndpointAnchor::Unanchored => None,
        }
    }

    pub fn is_anchored(&self) -> bool {
        matches!(self, EndpointAnchor::Node { .. })
    }
}

/// An alignment point that coincides with a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorMatch {
    pub point_index: usize,
    pub node_id: String,
    /// Horizontal distance between the point and the node
    pub distance_m: f64,
    /// Authoritative node elevation
    pub elevation: f64,
}

/// Resolved anchors for one alignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConnectivity {
    pub alignment_id: String,
    /// Anchors sorted by point index, at most one per point and per node
    pub anchors: Vec<AnchorMatch>,
    pub start: EndpointAnchor,
    pub end: EndpointAnchor,
}

impl AlignmentConnectivity {
    pub fn anchor_at(&self, point_index: usize) -> Option<&AnchorMatch> {
        self.anchors
            .binary_search_by_key(&point_index, |anchor| anchor.point_index)
            .ok()
            .map(|pos| &self.anchors[pos])
    }

    pub fn is_unanchored(&self) -> bool {
        self.anchors.is_empty()
    }
}

/// A pipe touching a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIncidence {
    pub alignment_id: String,
    pub point_index: usize,
}

/// Immutable network snapshot: one connectivity entry per input alignment,
/// in input order, plus the reverse node -> alignments relation.
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    nodes: Vec<Node>,
    alignments: Vec<Result<AlignmentConnectivity, AlignmentError>>,
    incidence: HashMap<String, Vec<NodeIncidence>>,
}

impl NetworkGraph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    /// Connectivity for the alignment at `index` of the builder input.
    pub fn connectivity(
        &self,
        index: usize,
    ) -> Option<&Result<AlignmentConnectivity, AlignmentError>> {
        self.alignments.get(index)
    }

    pub fn connectivities(&self) -> &[Result<AlignmentConnectivity, AlignmentError>] {
        &self.alignments
    }

    /// All alignments touching a node.
    pub fn alignments_at(&self, node_id: &str) -> &[NodeIncidence] {
        self.incidence
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn alignment_count(&self) -> usize {
        self.alignments.len()
    }
}

/// Uniform grid over node plan positions.
struct NodeIndex<'a> {
    nodes: &'a [Node],
    cell_size_m: f64,
    grid: HashMap<(i64, i64), Vec<usize>>,
}

impl<'a> NodeIndex<'a> {
    fn new(nodes: &'a [Node], tolerance_m: f64) -> Self {
        let cell_size_m = tolerance_m.max(MIN_CELL_SIZE_M);
        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            grid.entry(cell_of(&node.position, cell_size_m))
                .or_default()
                .push(idx);
        }
        Self {
            nodes,
            cell_size_m,
            grid,
        }
    }

    /// Nodes within `tolerance_m` of `point`, as (node index, distance).
    fn within(&self, point: &Point, tolerance_m: f64) -> Vec<(usize, f64)> {
        let (cell_x, cell_y) = cell_of(point, self.cell_size_m);
        let search_cells = (tolerance_m / self.cell_size_m).ceil() as i64;

        let mut found = Vec::new();
        for dx in -search_cells..=search_cells {
            for dy in -search_cells..=search_cells {
                let Some(indices) = self.grid.get(&(cell_x + dx, cell_y + dy)) else {
                    continue;
                };
                for &idx in indices {
                    let distance = point.distance_2d(&self.nodes[idx].position);
                    if distance <= tolerance_m {
                        found.push((idx, distance));
                    }
                }
            }
        }
        found
    }
}

fn cell_of(point: &Point, cell_size_m: f64) -> (i64, i64) {
    (
        (point.x / cell_size_m).floor() as i64,
        (point.y / cell_size_m).floor() as i64,
    )
}

/// Build the network snapshot.
///
/// Fails only on invalid rules. Nodes with a non-finite coordinate are
/// skipped; an alignment anchored to a node whose id is not unique is
/// rejected on its own. Per-alignment problems are stored in the graph and
/// leave every other alignment untouched.
pub fn build_network(
    alignments: &[Alignment],
    nodes: &[Node],
    rules: &GradientRules,
) -> Result<NetworkGraph, NetworkError> {
    rules.validate()?;

    let mut node_ids = HashSet::with_capacity(nodes.len());
    let mut duplicated = HashSet::new();
    let mut usable = Vec::with_capacity(nodes.len());
    for node in nodes {
        if !node.position.is_finite() {
            tracing::warn!(node = %node.id, "skipping node with non-finite coordinate");
            continue;
        }
        if !node_ids.insert(node.id.as_str()) {
            tracing::warn!(node = %node.id, "duplicate node id");
            duplicated.insert(node.id.as_str());
        }
        usable.push(node.clone());
    }

    let index = NodeIndex::new(&usable, rules.anchor_tolerance_m);
    let mut incidence: HashMap<String, Vec<NodeIncidence>> = HashMap::new();
    let mut resolved = Vec::with_capacity(alignments.len());
    let mut alignment_ids = HashSet::with_capacity(alignments.len());

    for alignment in alignments {
        let result = if alignment_ids.insert(alignment.id.as_str()) {
            resolve_alignment(alignment, &index, rules.anchor_tolerance_m)
                .and_then(|connectivity| reject_duplicate_nodes(connectivity, &duplicated))
        } else {
            Err(AlignmentError::DuplicateId {
                alignment_id: alignment.id.clone(),
            })
        };
        match &result {
            Ok(connectivity) => {
                tracing::debug!(
                    alignment = %alignment.id,
                    anchors = connectivity.anchors.len(),
                    start = ?connectivity.start.node_id(),
                    end = ?connectivity.end.node_id(),
                    "resolved alignment anchors"
                );
                for anchor in &connectivity.anchors {
                    incidence
                        .entry(anchor.node_id.clone())
                        .or_default()
                        .push(NodeIncidence {
                            alignment_id: alignment.id.clone(),
                            point_index: anchor.point_index,
                        });
                }
            }
            Err(err) => {
                tracing::warn!(alignment = %alignment.id, "rejected alignment: {}", err);
            }
        }
        resolved.push(result);
    }

    Ok(NetworkGraph {
        nodes: usable,
        alignments: resolved,
        incidence,
    })
}

fn resolve_alignment(
    alignment: &Alignment,
    index: &NodeIndex<'_>,
    tolerance_m: f64,
) -> Result<AlignmentConnectivity, AlignmentError> {
    if alignment.points.len() < 2 {
        return Err(AlignmentError::TooFewPoints {
            alignment_id: alignment.id.clone(),
            count: alignment.points.len(),
        });
    }
    if let Some(bad) = alignment.points.iter().position(|p| !p.is_finite()) {
        return Err(AlignmentError::NonFinitePoint {
            alignment_id: alignment.id.clone(),
            index: bad,
        });
    }

    // Nearest node per point; a node keeps only its closest point on this
    // alignment (first index wins an exact tie).
    let mut best_point_for_node: HashMap<usize, (usize, f64)> = HashMap::new();
    for (point_index, point) in alignment.points.iter().enumerate() {
        let Some((node_idx, distance)) =
            nearest_unambiguous(alignment, point_index, point, index, tolerance_m)?
        else {
            continue;
        };
        best_point_for_node
            .entry(node_idx)
            .and_modify(|best| {
                if distance < best.1 {
                    *best = (point_index, distance);
                }
            })
            .or_insert((point_index, distance));
    }

    let mut anchors: Vec<AnchorMatch> = best_point_for_node
        .into_iter()
        .map(|(node_idx, (point_index, distance_m))| {
            let node = &index.nodes[node_idx];
            AnchorMatch {
                point_index,
                node_id: node.id.clone(),
                distance_m,
                elevation: node.elevation(),
            }
        })
        .collect();
    anchors.sort_by_key(|anchor| anchor.point_index);

    let last_index = alignment.points.len() - 1;
    let endpoint = |point_index: usize| {
        anchors
            .iter()
            .find(|anchor| anchor.point_index == point_index)
            .map(|anchor| EndpointAnchor::Node {
                node_id: anchor.node_id.clone(),
                distance_m: anchor.distance_m,
            })
            .unwrap_or(EndpointAnchor::Unanchored)
    };
    let start = endpoint(0);
    let end = endpoint(last_index);

    Ok(AlignmentConnectivity {
        alignment_id: alignment.id.clone(),
        anchors,
        start,
        end,
    })
}

fn reject_duplicate_nodes(
    connectivity: AlignmentConnectivity,
    duplicated: &HashSet<&str>,
) -> Result<AlignmentConnectivity, AlignmentError> {
    match connectivity
        .anchors
        .iter()
        .find(|anchor| duplicated.contains(anchor.node_id.as_str()))
    {
        Some(anchor) => Err(AlignmentError::DuplicateNode {
            alignment_id: connectivity.alignment_id.clone(),
            node_id: anchor.node_id.clone(),
        }),
        None => Ok(connectivity),
    }
}

/// Nearest node within tolerance. An exact distance tie between distinct
/// nodes is an error rather than an arbitrary pick.
fn nearest_unambiguous(
    alignment: &Alignment,
    point_index: usize,
    point: &Point,
    index: &NodeIndex<'_>,
    tolerance_m: f64,
) -> Result<Option<(usize, f64)>, AlignmentError> {
    let candidates = index.within(point, tolerance_m);
    let Some(&(best_idx, best_distance)) = candidates
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
    else {
        return Ok(None);
    };

    let mut tied: Vec<String> = candidates
        .iter()
        .filter(|(_, distance)| *distance == best_distance)
        .map(|(idx, _)| index.nodes[*idx].id.clone())
        .collect();
    if tied.len() > 1 {
        tied.sort();
        return Err(AlignmentError::AmbiguousAnchor {
            alignment_id: alignment.id.clone(),
            index: point_index,
            distance_m: best_distance,
            candidates: tied,
        });
    }

    Ok(Some((best_idx, best_distance)))
}
