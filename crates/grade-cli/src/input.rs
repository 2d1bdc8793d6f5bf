//! Network input document.

use anyhow::{Context, Result};
use grade_core::{Alignment, Node, Point};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Invert elevation
    #[serde(alias = "elevation")]
    pub z: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlignmentRecord {
    pub id: String,
    pub points: Vec<Point>,
}

/// Already-resolved pipe alignments and manhole/junction nodes.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkFile {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    pub alignments: Vec<AlignmentRecord>,
}

impl NetworkFile {
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid network document")
    }

    pub fn into_parts(self) -> (Vec<Alignment>, Vec<Node>) {
        let alignments = self
            .alignments
            .into_iter()
            .map(|record| Alignment::new(record.id, record.points))
            .collect();
        let nodes = self
            .nodes
            .into_iter()
            .map(|record| Node::new(record.id, record.x, record.y, record.z))
            .collect();
        (alignments, nodes)
    }
}

pub fn read_network(path: &Path) -> Result<NetworkFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    NetworkFile::parse(&text).with_context(|| format!("failed to parse {}", path.display()))
}
