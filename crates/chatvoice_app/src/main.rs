mod commands;
mod console;
mod logging;
mod preview;
mod profile;
mod replay;
mod transcript;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chat_logging::chat_info;
use chatvoice_engine::{PersistentStore, SettingsStore, CHAT_TEST_URL, DEFAULT_WRITE_WINDOW};
use clap::{Parser, Subcommand};

use crate::commands::{run_filter_command, run_settings_command, FilterCommand, SettingsCommand};
use crate::logging::LogDestination;
use crate::preview::{preview_page, PreviewLine};

#[derive(Parser, Debug)]
#[command(name = "chatvoice")]
#[command(about = "Read live chat messages aloud", long_about = None)]
struct Cli {
    /// Settings file shared by all commands.
    #[arg(long, global = true, default_value = "./chatvoice_settings.json")]
    settings: PathBuf,

    #[arg(long, global = true, value_enum, default_value = "terminal")]
    log: LogDestination,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Post a `name: body` transcript into the chat test page and speak it.
    Replay {
        transcript: PathBuf,
        /// RON replay profile; missing fields take defaults.
        #[arg(long, default_value = "./chatvoice_replay.ron")]
        profile: PathBuf,
        /// Log speech instead of printing it.
        #[arg(long)]
        silent: bool,
    },
    /// Write the default replay profile.
    InitProfile {
        #[arg(default_value = "./chatvoice_replay.ron")]
        path: PathBuf,
    },
    /// Show how the messages in a saved chat page would be spoken.
    Preview {
        page: PathBuf,
        #[arg(long, default_value = CHAT_TEST_URL)]
        url: String,
    },
    #[command(subcommand)]
    Filters(FilterCommand),
    #[command(flatten)]
    Settings(SettingsCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(cli.log, cli.verbose);
    chat_info!("Settings file: {:?}", cli.settings);

    let store = PersistentStore::open(&cli.settings, DEFAULT_WRITE_WINDOW)
        .with_context(|| format!("opening settings {:?}", cli.settings))?;
    let shared: Arc<dyn SettingsStore> = store.clone();

    match cli.command {
        Commands::Replay {
            transcript,
            profile,
            silent,
        } => {
            let profile = profile::load_profile(&profile);
            replay::run_replay(&transcript, &profile, shared, silent).await?;
        }
        Commands::InitProfile { path } => {
            profile::save_profile(&path, &profile::ReplayProfile::default());
            println!("Wrote {:?}", path);
        }
        Commands::Preview { page, url } => {
            let bytes = fs::read(&page).with_context(|| format!("reading {:?}", page))?;
            for line in preview_page(&bytes, &url, shared.as_ref())? {
                match line {
                    PreviewLine::Spoken(text) => println!("say  {text}"),
                    PreviewLine::Dropped { name, reason } => println!("drop {name}: {reason}"),
                }
            }
        }
        Commands::Filters(command) => run_filter_command(shared, command)?,
        Commands::Settings(command) => run_settings_command(shared.as_ref(), command)?,
    }

    store.flush().await?;
    Ok(())
}
