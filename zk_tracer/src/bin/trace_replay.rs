//! Replays a recorded callback stream through the hub and writes the
//! resulting trace columns as JSON.
//!
//! Example usage:
//! ```
//! RUST_LOG=info cargo run --bin trace_replay -- --input ./events.json --output ./hub.json
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueHint};
use tracing::info;
use tracing_subscriber::{prelude::*, util::SubscriberInitExt, EnvFilter};
use zk_tracer::replay::{self, ReplayEvent};
use zk_tracer::{Hub, HubConfig};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// JSON array of recorded events. Read from stdin if absent.
    #[arg(long, short, value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// JSON hub configuration. Defaults apply to missing fields.
    #[arg(long, short, value_hint = ValueHint::FilePath, env = "ZK_TRACER_CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the trace columns. Written to stdout if absent.
    #[arg(long, short, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

fn init_tracing() {
    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading configuration {}", path.display()))?;
            HubConfig::from_json(&json)?
        }
        None => HubConfig::default(),
    };

    let raw = match &args.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading events {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let events: Vec<ReplayEvent> =
        serde_json::from_str(&raw).context("parsing recorded events")?;
    info!("replaying {} event(s)", events.len());

    let mut hub = Hub::new(config)?;
    replay::run(&mut hub, &events).context("replaying events")?;
    let columns = hub.commit().context("committing the hub trace")?;
    info!("{} row(s) committed", columns.rows());

    let json = serde_json::to_string(&columns)?;
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("writing trace to {}", path.display()))?,
        None => io::stdout().write_all(json.as_bytes())?,
    }
    Ok(())
}
