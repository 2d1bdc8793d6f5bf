//! Gradient rules and matching thresholds.

use crate::error::RulesError;
use serde::{Deserialize, Serialize};

const DEFAULT_GRADIENT_EPSILON: f64 = 1e-9;
const DEFAULT_MIN_RUN_LENGTH_M: f64 = 1e-6;

/// Configuration for classification and correction.
///
/// The minimum gradient and anchor tolerance have no defaults; they are
/// project inputs and must be supplied through [`GradientRules::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientRules {
    /// Minimum required downhill gradient as a fraction (0.005 = 0.5%)
    pub min_gradient: f64,
    /// Horizontal radius for matching alignment points to nodes (meters)
    pub anchor_tolerance_m: f64,
    /// Slack around gradient comparisons to absorb floating-point noise
    #[serde(default = "default_gradient_epsilon")]
    pub gradient_epsilon: f64,
    /// Runs shorter than this in plan are rejected as degenerate (meters)
    #[serde(default = "default_min_run_length_m")]
    pub min_run_length_m: f64,
    /// Compliant runs at least this steep keep their drop inside a repaired
    /// span even next to a violated run. Compliant runs clear of any
    /// violated run keep their drop regardless.
    #[serde(default)]
    pub drop_structure_gradient: Option<f64>,
}

fn default_gradient_epsilon() -> f64 {
    DEFAULT_GRADIENT_EPSILON
}

fn default_min_run_length_m() -> f64 {
    DEFAULT_MIN_RUN_LENGTH_M
}

impl GradientRules {
    pub fn new(min_gradient: f64, anchor_tolerance_m: f64) -> Self {
        Self {
            min_gradient,
            anchor_tolerance_m,
            gradient_epsilon: DEFAULT_GRADIENT_EPSILON,
            min_run_length_m: DEFAULT_MIN_RUN_LENGTH_M,
            drop_structure_gradient: None,
        }
    }

    /// Also keep steep compliant runs that border a violated run.
    pub fn with_drop_structure_gradient(mut self, gradient: f64) -> Self {
        self.drop_structure_gradient = Some(gradient);
        self
    }

    pub fn with_gradient_epsilon(mut self, epsilon: f64) -> Self {
        self.gradient_epsilon = epsilon;
        self
    }

    /// Check that every threshold is usable.
    pub fn validate(&self) -> Result<(), RulesError> {
        check_non_negative("min_gradient", self.min_gradient)?;
        check_non_negative("anchor_tolerance_m", self.anchor_tolerance_m)?;
        check_non_negative("gradient_epsilon", self.gradient_epsilon)?;
        check_non_negative("min_run_length_m", self.min_run_length_m)?;
        if self.min_run_length_m <= 0.0 {
            return Err(RulesError::NonPositive {
                name: "min_run_length_m",
                value: self.min_run_length_m,
            });
        }

        if let Some(drop) = self.drop_structure_gradient {
            check_non_negative("drop_structure_gradient", drop)?;
            if drop <= self.min_gradient {
                return Err(RulesError::DropStructureTooShallow {
                    drop_structure_gradient: drop,
                    min_gradient: self.min_gradient,
                });
            }
        }

        Ok(())
    }

    /// Elevation drop the minimum gradient demands over a horizontal distance.
    pub fn required_drop(&self, horizontal_length_m: f64) -> f64 {
        self.min_gradient * horizontal_length_m
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), RulesError> {
    if !value.is_finite() {
        return Err(RulesError::NonFinite { name, value });
    }
    if value < 0.0 {
        return Err(RulesError::Negative { name, value });
    }
    Ok(())
}
