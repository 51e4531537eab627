use anyhow::Result;
use clap::{Parser, Subcommand};
use ragchat::endpoint::{self, LaunchContext, SaveOutcome};
use ragchat::events::{Author, EntryKind};
use ragchat::{Config, ConversationManager, StorageManager};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(version)]
#[command(about = "Chat with a retrieval-augmented generation backend", long_about = None)]
struct Cli {
    /// Backend base URL for this run (also saved for later runs)
    #[arg(long, global = true)]
    api: Option<String>,

    /// URL the client was launched from; its `api` query parameter and,
    /// under the mount prefix, its origin select the backend
    #[arg(long, global = true)]
    launch_url: Option<String>,

    /// Config file to use instead of ~/.ragchat/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question and print the answer
    Ask { query: String },
    /// Print the resolved endpoint and where it came from
    Endpoint,
    /// Save a new endpoint for later runs
    SetEndpoint { url: String },
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let _guard = ragchat::logging::init(&config.log_dir())?;
    let launch = LaunchContext::new(cli.api.clone(), cli.launch_url.as_deref())?;

    match cli.command {
        None => {
            ragchat::app::run(config, launch).await?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Ask { query }) => ask_once(&config, &launch, query).await,
        Some(Commands::Endpoint) => {
            let storage = StorageManager::new(config.storage_path());
            println!("{}", endpoint::resolve_endpoint(&config, &launch, &storage));
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::SetEndpoint { url }) => {
            let storage = StorageManager::new(config.storage_path());
            match endpoint::save_endpoint(&storage, &url) {
                SaveOutcome::Reload(value) => println!("Saved endpoint: {}", value),
                SaveOutcome::Ignored => println!("Empty endpoint, nothing saved."),
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::ShowConfig) => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the submit flow once without the terminal UI
async fn ask_once(config: &Config, launch: &LaunchContext, query: String) -> Result<ExitCode> {
    let mut manager = ConversationManager::new(config, launch);
    manager.set_query_text(query);

    if !manager.submit().await {
        eprintln!("Nothing to ask.");
        return Ok(ExitCode::FAILURE);
    }

    let failed = manager.last_request_failed();
    for entry in manager.entries().iter().filter(|e| e.author == Author::Assistant) {
        match entry.kind {
            EntryKind::Message if failed => eprintln!("{}", entry.text),
            EntryKind::Message => println!("{}", entry.text),
            EntryKind::Sources => println!("\n{}", entry.text),
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
