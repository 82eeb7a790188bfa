//! Registry Generation CLI
//!
//! Loads, resolves and validates the registry documents, then writes one
//! constants module per target plus `registry-manifest.json`.
//!
//! Usage:
//!   semconv-generate --source registry --output generated
//!   semconv-generate --target rust,java --dry-run
//!   semconv-generate --help

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use semconv_registry::{pipeline, Diagnostics, RegistryError, RegistryVersion, SemconvConfig, Target};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "semconv-generate")]
#[command(about = "Validate registry documents and generate attribute constants")]
struct Cli {
    /// Config file (defaults: semconv.toml, .semconv.toml, config/semconv.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Registry document files or directories (overrides config)
    #[arg(short, long)]
    source: Vec<PathBuf>,

    /// Targets to generate, comma separated (rust, python, java)
    #[arg(short, long, value_delimiter = ',')]
    target: Vec<String>,

    /// Output directory (overrides config)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Registry version (overrides documents and config)
    #[arg(long = "registry-version")]
    registry_version: Option<String>,

    /// Diagnostics format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Validate and render without writing files
    #[arg(long)]
    dry_run: bool,

    /// Fail on warnings
    #[arg(long)]
    warnings_as_errors: bool,
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
        std::process::exit(1);
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
    if let Some(output) = &cli.output {
        config.generate.output_dir = output.clone();
    }
    if cli.warnings_as_errors {
        config.validation.warnings_as_errors = true;
    }

    let problems = config.problems();
    if !problems.is_empty() {
        bail!("invalid configuration: {}", problems.join("; "));
    }

    let mut request = config.request()?;
    if let Some(version) = &cli.registry_version {
        request = request.version(RegistryVersion::parse(version).context("parsing --registry-version")?);
    }

    let run = match pipeline::generate(&request) {
        Ok(run) => run,
        Err(RegistryError::Invalid(diagnostics)) => {
            print_diagnostics(&diagnostics, cli.format)?;
            eprintln!("\n❌ Registry is invalid - nothing generated");
            std::process::exit(1);
        }
        Err(e) => return Err(e).context("generating artifacts"),
    };

    if !run.warnings().is_empty() {
        print_diagnostics(run.warnings(), cli.format)?;
    }

    println!(
        "📦 Registry {} - {} attributes, checksum {}",
        run.registry.version(),
        run.registry.len(),
        run.registry.checksum().short()
    );

    if cli.dry_run {
        for artifact in run.artifacts.iter() {
            println!("   {} -> {} ({})", artifact.target, artifact.file_name, artifact.checksum.short());
        }
        println!("\n✅ Dry run - no files written");
        return Ok(());
    }

    let written = run
        .artifacts
        .write_to(&config.generate.output_dir)
        .with_context(|| format!("writing to {}", config.generate.output_dir.display()))?;
    for path in &written {
        println!("   wrote {}", path.display());
    }
    println!("\n✅ Generated {} artifact(s)", run.artifacts.len());
    Ok(())
}

fn print_diagnostics(diagnostics: &Diagnostics, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(diagnostics)?),
        OutputFormat::Text => eprint!("{}", diagnostics.format_all()),
    }
    Ok(())
}
