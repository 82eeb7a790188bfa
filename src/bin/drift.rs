//! Registry Drift Detection CLI
//!
//! Regenerates every artifact in memory and compares it with the persisted
//! copy in a directory or a git revision. Reports changes for review.
//!
//! Exit codes: 0 in sync (or drift without --strict), 1 drift in strict
//! mode, 2 registry invalid.
//!
//! Usage:
//!   semconv-drift --baseline generated
//!   semconv-drift --git-revision HEAD --baseline generated --strict
//!   semconv-drift --help

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use semconv_registry::{
    pipeline, Baseline, ConsistencyChecker, DriftReport, DriftStatus, RegistryError, SemconvConfig, Target,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "semconv-drift")]
#[command(about = "Detect drift between the registry and persisted generated code")]
struct Cli {
    /// Config file
    #[arg(short, long)]
    config: Option<String>,

    /// Registry document files or directories (overrides config)
    #[arg(short, long)]
    source: Vec<PathBuf>,

    /// Targets to compare, comma separated
    #[arg(short, long, value_delimiter = ',')]
    target: Vec<String>,

    /// Directory with persisted artifacts (relative to the repository
    /// when --git-revision is given)
    #[arg(short, long)]
    baseline: Option<PathBuf>,

    /// Compare against artifacts committed at this revision
    #[arg(long)]
    git_revision: Option<String>,

    /// Repository for --git-revision
    #[arg(long)]
    git_repo: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Fail on any drift
    #[arg(long)]
    strict: bool,

    /// Print diffs
    #[arg(long)]
    verbose: bool,
}

/// JSON output envelope
#[derive(Serialize)]
struct JsonReport<'a> {
    checked_at: String,
    baseline: String,
    strict: bool,
    #[serde(flatten)]
    report: &'a DriftReport,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(2);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = SemconvConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    if !cli.source.is_empty() {
        config.registry.sources = cli.source.clone();
    }
    if !cli.target.is_empty() {
        config.generate.targets = cli
            .target
            .iter()
            .map(|t| t.parse::<Target>())
            .collect::<Result<_, _>>()?;
    }
    if let Some(dir) = &cli.baseline {
        config.check.baseline_dir = Some(dir.clone());
    }
    if let Some(revision) = &cli.git_revision {
        config.check.git_revision = Some(revision.clone());
    }
    if let Some(repo) = &cli.git_repo {
        config.check.git_repo = Some(repo.clone());
    }
    let strict = cli.strict || config.check.strict;

    let run = match pipeline::generate(&config.request()?) {
        Ok(run) => run,
        Err(RegistryError::Invalid(diagnostics)) => {
            eprint!("{}", diagnostics.format_all());
            eprintln!("\n❌ Registry is invalid - cannot check drift");
            std::process::exit(2);
        }
        Err(e) => return Err(e).context("generating artifacts"),
    };

    let baseline = config.baseline();
    let persisted = baseline
        .read(&run.artifacts)
        .with_context(|| format!("reading baseline {}", baseline.describe()))?;

    let checker = ConsistencyChecker::new().strict(strict);
    let report = checker.compare(&persisted, &run.artifacts);

    match cli.format {
        OutputFormat::Json => {
            let json = JsonReport {
                checked_at: Utc::now().to_rfc3339(),
                baseline: baseline.describe(),
                strict,
                report: &report,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => print_text_report(&report, &baseline, cli.verbose),
    }

    if !report.drift_detected {
        eprintln!("\n✅ No drift detected - generated code is in sync");
        return Ok(());
    }

    if report.ensure_clean().is_err() && checker.is_strict() {
        eprintln!("\n❌ Drift detected (strict mode) - regenerate and commit");
        std::process::exit(1);
    }

    eprintln!("\n⚠️  Drift detected - regenerate to update persisted code");
    Ok(())
}

fn print_text_report(report: &DriftReport, baseline: &Baseline, verbose: bool) {
    println!("🔍 Drift check against {}\n", baseline.describe());

    if report.version_changed {
        if let Some(persisted) = &report.persisted_version {
            println!("🔖 Registry version {} -> {}\n", persisted, report.registry_version);
        }
    }

    for artifact in &report.artifacts {
        match &artifact.status {
            DriftStatus::Unchanged => println!("   ✅ {} ({})", artifact.file_name, artifact.target),
            DriftStatus::Missing => println!("   📕 {} ({}) - never generated", artifact.file_name, artifact.target),
            DriftStatus::Changed { diff } => {
                println!("   📝 {} ({}) - changed", artifact.file_name, artifact.target);
                if verbose {
                    for line in diff.lines() {
                        println!("      {}", line);
                    }
                }
            }
        }
    }

    println!("\n📊 SUMMARY:");
    println!("   Artifacts: {}", report.artifacts.len());
    println!("   Drifted:   {}", report.drift_count());
}
