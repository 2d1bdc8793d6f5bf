//! grade - certify and repair gravity pipe gradients.
//!
//! Usage:
//!   grade --input network.json --min-gradient 0.005 --tolerance 0.05 [--output result.json]

mod config;
mod input;
mod output;
mod runner;

use anyhow::{bail, Context, Result};
use clap::Parser;
use grade_core::build_network;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::output::OutputDocument;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Network document (JSON with `nodes` and `alignments`)
    #[arg(long, short)]
    input: PathBuf,

    /// Result document; stdout if omitted
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Minimum downhill gradient as a fraction (0.005 = 0.5%)
    #[arg(long)]
    min_gradient: Option<f64>,

    /// Horizontal node matching tolerance in meters
    #[arg(long)]
    tolerance: Option<f64>,

    /// Keep compliant runs at least this steep when repairing a span
    #[arg(long)]
    drop_structure_gradient: Option<f64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Exit with an error if any alignment needs review
    #[arg(long)]
    fail_on_review: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            min_gradient: self.min_gradient,
            anchor_tolerance_m: self.tolerance,
            drop_structure_gradient: self.drop_structure_gradient,
        }
    }
}

fn init_tracing(json_logs: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("grade=info".parse()?)
        .add_directive("grade_core=info".parse()?);

    let json_layer = json_logs.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer =
        (!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs)?;

    let rules = Config::from_env().merge(args.config()).into_rules()?;
    let (alignments, nodes) = input::read_network(&args.input)?.into_parts();
    tracing::info!(
        "Loaded {} alignment(s) and {} node(s) from {}",
        alignments.len(),
        nodes.len(),
        args.input.display()
    );

    // Connectivity is resolved for the whole network before any correction.
    let graph = build_network(&alignments, &nodes, &rules).context("failed to build network")?;

    let outcomes = runner::analyze_parallel(
        Arc::from(alignments),
        Arc::new(graph),
        Arc::new(rules.clone()),
    )
    .await?;

    let document = OutputDocument::new(rules, outcomes);
    let report = &document.report;
    tracing::info!(
        "Compliant: {}, corrected: {}, partial: {}, unanchored: {}, rejected: {}",
        report.compliant,
        report.corrected,
        report.partial,
        report.unanchored,
        report.rejected
    );
    if report.adjusted_points > 0 {
        tracing::info!(
            "Adjusted {} point(s), total elevation change {:.3} m",
            report.adjusted_points,
            report.total_elevation_change_m
        );
    }

    output::write_document(&document, args.output.as_deref())?;

    if args.fail_on_review && document.report.needs_review() {
        bail!(
            "{} alignment(s) need review",
            document.report.total_alignments - document.report.fully_corrected()
        );
    }

    Ok(())
}
