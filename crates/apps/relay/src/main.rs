//! relay - command-line host for the pushmail reader
//!
//! Reads a Pub/Sub push body, runs it through the reader and prints the
//! JSON response. Also registers the Gmail watch and shows the cursor.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use pushmail::{CursorStore, JsonCursorStore, MailReader, Settings};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "relay", version, about = "Gmail push-notification reader")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to ~/.config/pushmail/settings.json, then env vars)
    #[arg(long, global = true, env = "PUSHMAIL_SETTINGS")]
    settings: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Handle one push payload and print the response
    Handle {
        /// File holding the push body; reads stdin when omitted or "-"
        payload: Option<PathBuf>,
    },
    /// Register the Gmail watch and seed the cursor
    Watch {
        /// Pub/Sub topic (defaults to the configured topic_name)
        #[arg(long)]
        topic: Option<String>,
    },
    /// Print the stored cursor
    Cursor,
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = match &cli.settings {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Commands::Handle { payload } => {
            let raw = read_payload(payload.as_deref())?;
            let reader = MailReader::from_settings(&settings)?;
            let response = reader.handle_payload(&raw);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(if response.status {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Watch { topic } => {
            let reader = MailReader::from_settings(&settings)?;
            let watch = reader.register_watch(topic.as_deref())?;
            info!("Watch registered; cursor seeded at {}", watch.history_id);
            println!("{}", watch.history_id);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Cursor => {
            let store = JsonCursorStore::new(settings.cursor_path()?);
            match store.read()? {
                Some(history_id) => println!("{}", history_id),
                None => println!("(none) {}", store.path().display()),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_payload(path: Option<&std::path::Path>) -> Result<Vec<u8>> {
    match path {
        Some(p) if p.as_os_str() != "-" => {
            std::fs::read(p).with_context(|| format!("Failed to read payload: {}", p.display()))
        }
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("Failed to read payload from stdin")?;
            Ok(buf)
        }
    }
}
