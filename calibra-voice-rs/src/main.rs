//! calibra-voice-rs: spoken calibration alerts service and CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use calibra_voice::api::{self, ApiState};
use calibra_voice::clock::{Clock, SystemClock};
use calibra_voice::config::Config;
use calibra_voice::models::{first_name, AnnouncePayload};
use calibra_voice::narration::{compose, date_to_words, to_words};
use calibra_voice::narrator::{AnnounceOutcome, Narrator};
use calibra_voice::speech::{HttpSpeechSink, LogSink, SpeechSink};
use calibra_voice::status::Period;
use calibra_voice::throttle::{AnnouncementStore, JsonFileStore, MemoryStore, Throttle};

use chrono::Timelike;

#[derive(Parser, Debug)]
#[command(name = "calibra-voice-rs", about = "Spoken calibration due-date alerts")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API for the dashboard (default)
    Serve,
    /// Announce once from a JSON payload file
    Announce {
        #[arg(long)]
        input: PathBuf,
        /// Ignore the once-per-period throttle
        #[arg(long)]
        force: bool,
        /// Log utterances instead of speaking; leaves the throttle record untouched
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the utterances a payload would produce
    Preview {
        #[arg(long)]
        input: PathBuf,
        /// morning, afternoon or night (defaults to the current period)
        #[arg(long)]
        period: Option<String>,
    },
    /// Spell out a number or a YYYY-MM-DD date
    Spell { value: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug,hyper=info,reqwest=info")
    } else {
        EnvFilter::new("info,hyper=warn,reqwest=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load(args.config.as_deref());

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await?,
        Command::Announce {
            input,
            force,
            dry_run,
        } => announce_once(&config, &input, force, dry_run).await?,
        Command::Preview { input, period } => preview(&input, period.as_deref())?,
        Command::Spell { value } => {
            let words = match value.trim().parse::<i64>() {
                Ok(n) => to_words(n),
                Err(_) => date_to_words(value.trim()),
            };
            println!("{words}");
        }
    }

    Ok(())
}

fn read_payload(path: &Path) -> Result<AnnouncePayload, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let payload = serde_json::from_str(&contents)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
    Ok(payload)
}

fn file_store(config: &Config) -> Arc<dyn AnnouncementStore> {
    let path = config.throttle.resolved_path();
    info!("Announcement record: {}", path.display());
    Arc::new(JsonFileStore::open(path))
}

async fn serve(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    info!("calibra-voice-rs starting");

    let engine = config
        .speech
        .enabled
        .then(|| Arc::new(HttpSpeechSink::spawn(&config.speech)));

    let sink: Arc<dyn SpeechSink> = match &engine {
        Some(engine) => {
            if !engine.probe().await {
                info!("Speech engine not reachable yet, will retry on each announcement");
            }
            engine.clone()
        }
        None => {
            info!("Speech disabled, utterances will only be logged");
            Arc::new(LogSink)
        }
    };

    let narrator = Narrator::new(
        sink,
        Throttle::new(file_store(config)),
        Arc::new(SystemClock),
    );
    let state = ApiState {
        narrator: Arc::new(narrator),
        engine,
    };

    api::start_api(state, config.api.port).await?;
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}

async fn announce_once(
    config: &Config,
    input: &Path,
    force: bool,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = read_payload(input)?;
    let force = force || payload.force;

    let outcome = if dry_run || !config.speech.enabled {
        let narrator = Narrator::new(
            Arc::new(LogSink),
            Throttle::new(Arc::new(MemoryStore::default())),
            Arc::new(SystemClock),
        );
        narrator.announce(&payload.name, &payload.stats, &payload.items, force)
    } else {
        let engine = Arc::new(HttpSpeechSink::spawn(&config.speech));
        engine.probe().await;
        let narrator = Narrator::new(
            engine.clone(),
            Throttle::new(file_store(config)),
            Arc::new(SystemClock),
        );
        let outcome = narrator.announce(&payload.name, &payload.stats, &payload.items, force);
        engine.flush().await;
        outcome
    };

    match outcome {
        AnnounceOutcome::Throttled { period } => {
            println!("Already announced this {period}; use --force to repeat.")
        }
        AnnounceOutcome::Unavailable { .. } => println!("Speech engine unavailable, nothing spoken."),
        AnnounceOutcome::Announced {
            utterances, failed, ..
        } => println!("Spoke {} utterances ({failed} failed).", utterances.len()),
    }
    Ok(())
}

fn preview(input: &Path, period: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let payload = read_payload(input)?;
    let period = match period {
        Some(name) => Period::from_str(name).ok_or_else(|| format!("unknown period: {name}"))?,
        None => Period::from_hour(SystemClock.now().hour()),
    };

    for text in compose(first_name(&payload.name), period, &payload.stats, &payload.items) {
        println!("{text}");
    }
    Ok(())
}
