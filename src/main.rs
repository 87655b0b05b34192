use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cogex_experiment::{
    Responder, ScriptedResponder, SimulatedResponder, Timeline, TimelineRecord, plugins,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs stimulus plugin timelines on a virtual clock
#[derive(Parser, Debug)]
#[command(name = "cogex", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Write trial records here instead of stdout
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a timeline with scripted key presses
    Run {
        timeline: PathBuf,
        /// Presses as MS:KEY, offset from the start of every trial
        #[arg(long, value_delimiter = ',', value_parser = parse_press)]
        keys: Vec<Press>,
        /// Skip decoding stimulus images
        #[arg(long)]
        no_preload: bool,
    },
    /// Run a timeline against a simulated participant
    Simulate {
        timeline: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Probability of pressing the correct key
        #[arg(long, default_value_t = 0.8)]
        accuracy: f64,
        /// Mean response time in milliseconds
        #[arg(long, default_value_t = 600)]
        mean_rt: u64,
        #[arg(long)]
        no_preload: bool,
    },
    /// Print the parameters every plugin accepts
    Describe,
}

#[derive(Debug, Clone, PartialEq)]
struct Press {
    at: Duration,
    key: String,
}

fn parse_press(s: &str) -> Result<Press, String> {
    let (ms, key) = s
        .split_once(':')
        .ok_or_else(|| format!("expected MS:KEY, got {s:?}"))?;
    let ms: u64 = ms
        .trim()
        .parse()
        .map_err(|e| format!("bad time in {s:?}: {e}"))?;
    if key.is_empty() {
        return Err(format!("missing key in {s:?}"));
    }
    Ok(Press {
        at: Duration::from_millis(ms),
        key: key.to_string(),
    })
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            timeline,
            keys,
            no_preload,
        } => {
            let mut responder =
                ScriptedResponder::new(keys.into_iter().map(|p| (p.at, p.key)).collect());
            let records = run(&timeline, &mut responder, no_preload)?;
            write_records(&records, cli.out.as_deref())
        }
        Command::Simulate {
            timeline,
            seed,
            accuracy,
            mean_rt,
            no_preload,
        } => {
            info!(seed, accuracy, mean_rt_ms = mean_rt, "simulating participant");
            let mut responder = SimulatedResponder::new(
                StdRng::seed_from_u64(seed),
                accuracy,
                Duration::from_millis(mean_rt),
            );
            let records = run(&timeline, &mut responder, no_preload)?;
            write_records(&records, cli.out.as_deref())
        }
        Command::Describe => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &plugins())?;
            writeln!(out)?;
            Ok(())
        }
    }
}

fn run(
    path: &Path,
    responder: &mut dyn Responder,
    no_preload: bool,
) -> Result<Vec<TimelineRecord>> {
    let timeline = Timeline::load(path).with_context(|| format!("loading {}", path.display()))?;
    let mut host = timeline.host();
    if !no_preload {
        let loaded = timeline.preload(&mut host)?;
        info!(images = loaded, "stimuli preloaded");
    }
    Ok(timeline.run(&mut host, Some(responder))?)
}

fn write_records(records: &[TimelineRecord], out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
            info!(records = records.len(), path = %path.display(), "results saved");
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, records)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
