//! `terrain` - developer tooling for the Terrain bus and recording panels.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use terrain_audio::{column_peaks, decode_wav, AudioAnalysis, WaveformAnalyzer};
use terrain_panel::{ApiNamespace, PanelConfig};
use terrain_protocol::{matches, normalize, NormalizeContext};

#[derive(Parser)]
#[command(name = "terrain", version, about = "Terrain bus and waveform tooling")]
struct Cli {
    /// Config file (default: <config dir>/tetra/terrain.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a WAV recording and print envelope, segments and onsets as JSON
    Analyze {
        path: PathBuf,
        /// Override the RMS window length
        #[arg(long)]
        hop_ms: Option<u32>,
        /// Override the voice activity threshold
        #[arg(long)]
        threshold: Option<f32>,
        /// Also emit min/max peaks for this many columns
        #[arg(long)]
        columns: Option<usize>,
    },
    /// Check a topic against a subscription pattern
    Match { topic: String, pattern: String },
    /// Normalize a raw message (JSON) into a canonical packet
    Normalize {
        json: String,
        /// Identity of the receiving frame
        #[arg(long, default_value = "terrain")]
        identity: String,
    },
    /// Print the backend URL for a panel endpoint
    Url { namespace: String, path: String },
}

#[derive(Serialize)]
struct AnalyzeOutput {
    #[serde(flatten)]
    analysis: AudioAnalysis,
    chunks: Vec<terrain_audio::Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    peaks: Option<Vec<(f32, f32)>>,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "terrain=debug" } else { "terrain=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => PanelConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PanelConfig::load_default()?,
    };

    match cli.command {
        Command::Analyze {
            path,
            hop_ms,
            threshold,
            columns,
        } => {
            let mut analyzer_config = config.analyzer_config();
            if let Some(hop_ms) = hop_ms {
                analyzer_config.hop_ms = hop_ms;
            }
            if let Some(threshold) = threshold {
                analyzer_config.vad.threshold = threshold;
            }

            let state = WaveformAnalyzer::new(analyzer_config).load(&path);
            let Some(analysis) = state.analysis().cloned() else {
                bail!("cannot analyze {}", path.display());
            };
            let peaks = match columns {
                Some(columns) => Some(column_peaks(&decode_wav(&path)?.samples, columns)),
                None => None,
            };
            let output = AnalyzeOutput {
                chunks: analysis.chunks(),
                analysis,
                peaks,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Match { topic, pattern } => {
            println!("{}", matches(&topic, &pattern));
        }
        Command::Normalize { json, identity } => {
            let raw: serde_json::Value =
                serde_json::from_str(&json).context("message is not valid JSON")?;
            match normalize(&raw, &NormalizeContext::new(identity)) {
                Some(packet) => println!("{}", serde_json::to_string_pretty(&packet)?),
                None => bail!("message shape not recognized"),
            }
        }
        Command::Url { namespace, path } => {
            let namespace = ApiNamespace::parse(&namespace)?;
            println!("{}", config.api.endpoint(namespace, &path)?);
        }
    }

    Ok(())
}
