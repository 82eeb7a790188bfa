//! Configuration CLI
//!
//! Shows the effective configuration after all sources are layered, writes
//! a starter `semconv.toml`, and checks a configuration for problems.

use std::path::Path;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use semconv_registry::config::CONFIG_FILE;
use semconv_registry::SemconvConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "semconv-config")]
#[command(about = "Inspect and initialize registry configuration")]
struct Cli {
    /// Config file layered on top of the default locations
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML
    Show,

    /// Write a default configuration file
    Init {
        /// Destination
        #[arg(default_value = CONFIG_FILE)]
        path: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the effective configuration
    Validate,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Show => {
            let config = SemconvConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }

        Commands::Init { path, force } => {
            if Path::new(&path).exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path);
            }
            SemconvConfig::default()
                .save(&path)
                .with_context(|| format!("writing {}", path))?;
            println!("✅ Wrote {}", path);
            Ok(())
        }

        Commands::Validate => {
            let config = SemconvConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
            let mut problems = config.problems();
            for source in &config.registry.sources {
                if !source.exists() {
                    problems.push(format!("registry source {} does not exist", source.display()));
                }
            }

            if problems.is_empty() {
                println!("✅ Configuration is valid");
                return Ok(());
            }

            for problem in &problems {
                println!("  ❌ {}", problem);
            }
            std::process::exit(1);
        }
    }
}
