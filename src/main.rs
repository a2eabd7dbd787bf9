use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod error;
mod html;
mod ingest;
mod models;
mod normalize;
mod report;
mod resolve;
mod trend;

use config::Config;
use models::Dashboard;

#[derive(Parser)]
#[command(name = "enrolment-studio")]
#[command(about = "Standardize region names in enrolment CSVs and chart monthly trends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the HTML dashboard for one or more CSV uploads
    Render {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "dashboard.html")]
        out: PathBuf,
        /// Region whose trend is shown first
        #[arg(long)]
        region: Option<String>,
    },
    /// Print a text summary of the uploads
    Summary {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        region: Option<String>,
        /// Emit the dashboard model as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Show how individual values normalize against the reference list
    Normalize {
        #[arg(required = true)]
        values: Vec<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Write the default configuration file
    InitConfig {
        #[arg(long, default_value = "enrolment-studio.toml")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            files,
            config,
            out,
            region,
        } => {
            let config = load_config(config.as_deref())?;
            let dashboard = build(&files, &config, region.as_deref())?;
            let page = html::render_dashboard(&dashboard)?;
            std::fs::write(&out, page)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Dashboard written to {}.", out.display());
        }
        Commands::Summary {
            files,
            config,
            region,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let dashboard = build(&files, &config, region.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print!("{}", report::build_summary(&dashboard));
            }
        }
        Commands::Normalize { values, config } => {
            let config = load_config(config.as_deref())?;
            let normalizer = normalize::RegionNormalizer::new(
                &config.reference_regions,
                config.similarity_cutoff,
            );
            info!(
                "matching against {} reference regions (cutoff {})",
                normalizer.references().len(),
                config.similarity_cutoff
            );
            for value in values {
                let result = normalizer.normalize_detailed(&value);
                match result.ratio {
                    Some(ratio) => println!("{value} -> {} ({ratio:.3})", result.canonical),
                    None => println!("{value} -> {} (no match)", result.canonical),
                }
            }
        }
        Commands::InitConfig { out } => {
            Config::default().save_to_file(&out)?;
            println!("Default configuration written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            info!("loading config from {}", path.display());
            Config::load_from_file(path)
        }
        None => Ok(Config::default()),
    }
}

fn build(files: &[PathBuf], config: &Config, region: Option<&str>) -> anyhow::Result<Dashboard> {
    let (table, sources) = ingest::load_uploads(files)?;
    let dashboard = report::build_dashboard(&table, sources, config, region)?;
    Ok(dashboard)
}
