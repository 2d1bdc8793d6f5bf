//! Gradient configuration from environment and command line.

use anyhow::{anyhow, Context, Result};
use grade_core::GradientRules;
use std::env;

pub const ENV_MIN_GRADIENT: &str = "GRADE_MIN_GRADIENT";
pub const ENV_ANCHOR_TOLERANCE_M: &str = "GRADE_ANCHOR_TOLERANCE_M";
pub const ENV_DROP_STRUCTURE_GRADIENT: &str = "GRADE_DROP_STRUCTURE_GRADIENT";

/// Layered configuration. Every value is optional until resolved; the
/// minimum gradient and anchor tolerance must be set by some layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub min_gradient: Option<f64>,
    pub anchor_tolerance_m: Option<f64>,
    pub drop_structure_gradient: Option<f64>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let number = |key: &str| -> Option<f64> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring {}={:?}: not a number", key, raw);
                    None
                }
            }
        };
        Self {
            min_gradient: number(ENV_MIN_GRADIENT),
            anchor_tolerance_m: number(ENV_ANCHOR_TOLERANCE_M),
            drop_structure_gradient: number(ENV_DROP_STRUCTURE_GRADIENT),
        }
    }

    /// Values set in `other` win.
    pub fn merge(self, other: Config) -> Self {
        Self {
            min_gradient: other.min_gradient.or(self.min_gradient),
            anchor_tolerance_m: other.anchor_tolerance_m.or(self.anchor_tolerance_m),
            drop_structure_gradient: other
                .drop_structure_gradient
                .or(self.drop_structure_gradient),
        }
    }

    pub fn into_rules(self) -> Result<GradientRules> {
        let min_gradient = self.min_gradient.ok_or_else(|| {
            anyhow!("minimum gradient not set (use --min-gradient or {ENV_MIN_GRADIENT})")
        })?;
        let anchor_tolerance_m = self.anchor_tolerance_m.ok_or_else(|| {
            anyhow!("anchor tolerance not set (use --tolerance or {ENV_ANCHOR_TOLERANCE_M})")
        })?;

        let mut rules = GradientRules::new(min_gradient, anchor_tolerance_m);
        if let Some(drop) = self.drop_structure_gradient {
            rules = rules.with_drop_structure_gradient(drop);
        }
        rules.validate().context("invalid gradient configuration")?;
        Ok(rules)
    }
}
