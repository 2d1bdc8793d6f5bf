//! Core data models for gravity pipe networks.

use serde::{Deserialize, Serialize};

/// A surveyed position in a single linear unit (meters).
///
/// `z` may be provisional (terrain-derived) until correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Horizontal (plan) distance to another point.
    pub fn distance_2d(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Same plan position with a different elevation.
    pub fn with_z(self, z: f64) -> Self {
        Self { z, ..self }
    }
}

/// One designed pipe run: ordered points, flow follows point order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alignment {
    pub id: String,
    pub points: Vec<Point>,
}

impl Alignment {
    pub fn new(id: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            id: id.into(),
            points,
        }
    }

    pub fn first(&self) -> Option<&Point> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    /// Total horizontal length along the alignment.
    pub fn length_2d(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| pair[0].distance_2d(&pair[1]))
            .sum()
    }
}

/// A manhole invert or designed junction with an authoritative elevation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub position: Point,
}

impl Node {
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            id: id.into(),
            position: Point::new(x, y, z),
        }
    }

    pub fn elevation(&self) -> f64 {
        self.position.z
    }
}

/// Slope classification of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// Downhill at or beyond the minimum gradient, however steep
    Ok,
    /// Rising in flow direction
    Uphill,
    /// Downhill or flat, but shallower than the minimum
    Insufficient,
}

impl Classification {
    pub fn is_ok(self) -> bool {
        matches!(self, Classification::Ok)
    }
}

/// One consecutive point pair of an alignment.
///
/// `start_index` addresses the upstream point; the downstream point is
/// `start_index + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub start_index: usize,
    pub horizontal_length_m: f64,
    pub elevation_delta_m: f64,
    /// Elevation delta over horizontal length; negative is downhill
    pub gradient: f64,
    pub classification: Classification,
}

impl Run {
    pub fn end_index(&self) -> usize {
        self.start_index + 1
    }

    pub fn is_violation(&self) -> bool {
        !self.classification.is_ok()
    }
}
