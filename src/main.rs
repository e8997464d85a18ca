//! One-shot CLI driving the tag management engine over a request snapshot.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tag_manager::engine::{Engine, Request};
use tag_manager::filter::EligibilityTable;

#[derive(Parser)]
#[command(
    name = "tag-manager",
    about = "Resolve, merge and remove tags on desired composed resources"
)]
struct Cli {
    /// Request snapshot (YAML or JSON); reads stdin when omitted.
    #[arg(long)]
    request: Option<PathBuf>,

    /// Generated eligibility table artifact (YAML mapping of group/kind to
    /// bool). Without it every resource fails the capability gate.
    #[arg(long)]
    eligibility_table: Option<PathBuf>,

    /// Log filter directive, e.g. "debug" or "tag_manager=trace".
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).context("invalid log filter")?)
        .with_writer(std::io::stderr)
        .init();

    let content = match &cli.request {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read request from {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read request from stdin")?;
            buffer
        }
    };
    let request = Request::from_yaml(&content).context("failed to parse request snapshot")?;

    let table = match &cli.eligibility_table {
        Some(path) => EligibilityTable::from_path(path)
            .with_context(|| format!("failed to load eligibility table from {}", path.display()))?,
        None => EligibilityTable::new(),
    };

    let response = Engine::new(table).run(request);
    print!(
        "{}",
        serde_yaml_ng::to_string(&response).context("failed to serialize response")?
    );
    Ok(())
}
