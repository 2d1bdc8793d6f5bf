//! Result document written after analysis.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use grade_core::{AlignmentOutcome, GradientRules, NetworkReport};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct OutputDocument {
    pub generated_at: DateTime<Utc>,
    pub rules: GradientRules,
    pub report: NetworkReport,
    pub alignments: Vec<AlignmentOutcome>,
}

impl OutputDocument {
    pub fn new(rules: GradientRules, outcomes: Vec<AlignmentOutcome>) -> Self {
        Self {
            generated_at: Utc::now(),
            report: NetworkReport::from_outcomes(&outcomes),
            rules,
            alignments: outcomes,
        }
    }
}

/// Write pretty JSON to `path`, or stdout when no path is given.
pub fn write_document(document: &OutputDocument, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_json(document, BufWriter::new(file))
                .with_context(|| format!("failed to write {}", path.display()))
        }
        None => write_json(document, io::stdout().lock()).context("failed to write stdout"),
    }
}

fn write_json(document: &OutputDocument, mut writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
