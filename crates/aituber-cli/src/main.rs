use std::path::PathBuf;

use clap::{Parser, Subcommand};

use aituber_agent::{Orchestrator, RunOptions};
use aituber_core::config::{Config, LoggingConfig};
use aituber_core::extract::{self, DEFAULT_OUTPUT_PATH, DEFAULT_UTT_LOG_PATH, ExtractRequest};
use aituber_core::records::DEFAULT_STEP_MS;

#[derive(Parser)]
#[command(
    name = "aituber",
    about = "AITuber turn pipeline: generate utterances, synthesize audio, keep the utterance log",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (must exist when given) [default: configs/default.yaml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one session and append its utterances to the log
    Run {
        /// Number of turns (default: llm.max_turns)
        #[arg(long)]
        turns: Option<u32>,

        /// Session id suffix (default: start time plus seed)
        #[arg(long)]
        session_suffix: Option<String>,
    },

    /// Convert one utt_log entry into M3' input JSON
    Extract {
        /// Path to utt_log.jsonl
        #[arg(long, default_value = DEFAULT_UTT_LOG_PATH)]
        utt_log: PathBuf,

        /// Target session_id to extract
        #[arg(long)]
        session_id: String,

        /// Target utt_id to extract
        #[arg(long)]
        utt_id: String,

        /// Output JSON path for M3' input
        #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
        output: PathBuf,

        /// step_ms for M3' (default: 40 = 25fps)
        #[arg(long, default_value_t = DEFAULT_STEP_MS)]
        step_ms: u32,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the resolved configuration
    Show,
}

fn init_logging(verbose: bool, logging: Option<&LoggingConfig>) {
    let level = if verbose {
        "debug"
    } else {
        logging.and_then(|l| l.level.as_deref()).unwrap_or("info")
    };
    let mut directives = level.to_string();
    for filter in logging.map(|l| l.filters.as_slice()).unwrap_or_default() {
        directives.push(',');
        directives.push_str(filter);
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives));
    let json = logging.is_some_and(|l| l.format == "json");
    let stdout = logging.is_some_and(|l| l.output == "stdout");

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (json, stdout) {
        (true, true) => builder.json().with_writer(std::io::stdout).init(),
        (true, false) => builder.json().with_writer(std::io::stderr).init(),
        (false, true) => builder.with_writer(std::io::stdout).init(),
        (false, false) => builder.with_writer(std::io::stderr).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config errors only matter to the commands that need a config.
    let loaded = Config::open(cli.config.as_deref());
    init_logging(
        cli.verbose,
        loaded.as_ref().ok().and_then(|c| c.logging.as_ref()),
    );

    match cli.command {
        Commands::Run {
            turns,
            session_suffix,
        } => {
            let config = loaded?.validated()?;
            if let Some(path) = config.path() {
                tracing::info!(config = %path.display(), "Loaded config");
            }

            let orchestrator = Orchestrator::from_config(config)?;
            let summary = orchestrator
                .run_session(&RunOptions {
                    turns,
                    session_suffix,
                })
                .await?;

            println!(
                "[OK] Session {}: {} turns, timeline {} ms, log {}",
                summary.session_id,
                summary.turns,
                summary.timeline_ms,
                summary.utt_log.display()
            );
        }
        Commands::Extract {
            utt_log,
            session_id,
            utt_id,
            output,
            step_ms,
        } => {
            let request = ExtractRequest {
                utt_log,
                session_id,
                utt_id,
                output,
                step_ms,
            };
            extract::extract(&request)?;
            println!("[OK] Wrote M3' input JSON to: {}", request.output.display());
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = loaded?;
                let yaml = serde_yaml::to_string(&config)?;
                print!("{yaml}");
            }
        },
    }

    Ok(())
}
