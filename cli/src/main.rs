use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use witness_core::{Engine, EngineConfig};

mod commands;
mod util;

use util::exit_error;

#[derive(Parser)]
#[command(
    name = "witness",
    version,
    about = "Interview the compliance witness from the terminal"
)]
struct Cli {
    /// API base URL (used by `health` and `--remote`)
    #[arg(long, env = "WITNESS_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Interactive interview; the transcript is kept in memory
    Chat {
        #[command(flatten)]
        target: Target,
    },
    /// Send a single turn and print the JSON response
    Say {
        /// Trainee message
        #[arg(long)]
        message: String,
        /// Transcript so far, one turn per line
        #[arg(long, conflicts_with = "history_file")]
        history: Option<String>,
        /// Read the transcript from a file
        #[arg(long)]
        history_file: Option<PathBuf>,
        /// Include the tone, stance, policy and risk read-out
        #[arg(long)]
        structured: bool,
        #[command(flatten)]
        target: Target,
    },
}

/// Where turns are answered: the in-process engine or a running API.
#[derive(Args)]
struct Target {
    /// Witness persona (Betty or Freda)
    #[arg(long)]
    persona: Option<String>,
    /// Fixed selection seed for reproducible replies (local engine only)
    #[arg(long, env = "WITNESS_SEED")]
    seed: Option<u64>,
    /// Send turns to the API instead of the in-process engine
    #[arg(long)]
    remote: bool,
}

impl Target {
    fn responder(&self, api_url: &str) -> commands::Responder {
        if self.remote {
            if self.seed.is_some() {
                tracing::warn!("--seed is ignored with --remote; set WITNESS_SEED on the server");
            }
            return commands::Responder::Remote {
                api_url: api_url.trim_end_matches('/').to_string(),
            };
        }
        let config = match self.seed {
            Some(seed) => EngineConfig::seeded(seed),
            None => EngineConfig::from_env(),
        };
        commands::Responder::Local(Box::new(Engine::new(config)))
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .compact()
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::Chat { target } => {
            let responder = target.responder(&cli.api_url);
            commands::chat::run(&responder, target.persona.as_deref()).await
        }
        Commands::Say {
            message,
            history,
            history_file,
            structured,
            target,
        } => {
            let history = match (history, history_file) {
                (Some(h), _) => h,
                (None, Some(path)) => match std::fs::read_to_string(&path) {
                    Ok(h) => h,
                    Err(e) => exit_error(
                        &format!("Failed to read {}: {e}", path.display()),
                        Some("Pass --history-file with a readable transcript file"),
                    ),
                },
                (None, None) => String::new(),
            };
            let responder = target.responder(&cli.api_url);
            let persona = target.persona.as_deref();
            commands::say::run(&responder, &message, &history, persona, structured).await
        }
    };

    std::process::exit(code);
}
