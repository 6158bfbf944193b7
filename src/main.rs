#![allow(clippy::multiple_crate_versions)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use modelshelf::catalog::SearchRequest;
use modelshelf::config::Config;
use modelshelf::models::download::format_bytes;
use modelshelf::models::{InstallRequest, Library, Outcome};
use modelshelf::server::{shutdown_signal, Server};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "modelshelf")]
#[command(about = "Browse, install and track catalog models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Override `server.bind_address`
        #[arg(long)]
        bind: Option<String>,
    },
    /// Download and register a model version
    Install {
        version_id: u64,
        /// Extra folder level under the base model
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete an installed version and forget it
    Uninstall { version_id: u64 },
    /// Search the catalog
    Search {
        query: Option<String>,
        #[arg(long = "type", default_value = "Any")]
        model_type: String,
        #[arg(long, default_value = "Relevance")]
        sort: String,
        #[arg(long, default_value = "Any")]
        category: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show the filter facets
    Filters {
        /// Ignore the cache and derive again
        #[arg(long)]
        force: bool,
    },
    /// Manage the catalog API token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Show whether a token is stored
    Status,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Store a token
    Set { token: String },
    /// Remove the stored token
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    init_tracing(&config.log.level);

    match cli.command.unwrap_or(Commands::Serve { bind: None }) {
        Commands::Serve { bind } => serve(config, bind).await,
        command => tokio::task::spawn_blocking(move || run_command(&config, command)).await?,
    }
}

/// `RUST_LOG` wins, then the configured level, then `info`
fn init_tracing(level: &str) {
    let env_filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => level
            .parse::<tracing_subscriber::EnvFilter>()
            .unwrap_or_else(|e| {
                eprintln!("WARN: log.level '{level}' is not a valid filter ({e}); falling back to 'info'");
                tracing_subscriber::EnvFilter::new("info")
            }),
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}

async fn serve(config: Config, bind: Option<String>) -> anyhow::Result<()> {
    tracing::info!("Starting modelshelf {}", env!("CARGO_PKG_VERSION"));

    // the HTTP client is blocking and must be built off the runtime threads
    let open_config = config.clone();
    let library = tokio::task::spawn_blocking(move || Library::open(&open_config))
        .await?
        .context("Failed to open model library")?;

    let mut server = Server::new(Arc::new(library), &config.server);
    if let Some(bind) = bind {
        server = server.with_bind_address(bind);
    }

    server.start(shutdown_signal()).await?;
    Ok(())
}

fn run_command(config: &Config, command: Commands) -> anyhow::Result<()> {
    let library = Library::open(config).context("Failed to open model library")?;

    match command {
        Commands::Serve { .. } => anyhow::bail!("serve runs on the async runtime"),
        Commands::Install {
            version_id,
            category,
        } => {
            let mut request = InstallRequest::new(version_id);
            request.category = category;
            report(install_with_bar(&library, &request)?)
        }
        Commands::Uninstall { version_id } => report(library.uninstall(version_id)),
        Commands::Search {
            query,
            model_type,
            sort,
            category,
            limit,
        } => {
            let request = SearchRequest {
                q: query.unwrap_or_default(),
                model_type,
                sort,
                category,
                limit: limit.unwrap_or(config.catalog.search_limit),
                ..SearchRequest::default()
            };
            for hit in library.search(&request)? {
                let marker = if hit.installed { "*" } else { " " };
                let version = hit
                    .default_version_id
                    .map_or_else(|| "-".to_string(), |v| v.to_string());
                println!(
                    "{marker} {version:>9}  {:<14} {:<12} {} by {}",
                    hit.kind, hit.base_model, hit.name, hit.creator
                );
            }
            Ok(())
        }
        Commands::Filters { force } => {
            let payload = library.filters(force);
            println!("{}", serde_json::to_string_pretty(&payload)?);
            match payload.error {
                Some(error) => anyhow::bail!(error),
                None => Ok(()),
            }
        }
        Commands::Token { action } => {
            match action {
                TokenAction::Set { token } => {
                    library.save_token(&token)?;
                    println!("✓ Token saved");
                }
                TokenAction::Clear => {
                    library.clear_token()?;
                    println!("✓ Token cleared");
                }
            }
            Ok(())
        }
        Commands::Status => {
            let status = library.status();
            println!("Token stored: {}", if status.has_token { "yes" } else { "no" });
            println!("Models dir:   {}", library.layout().models_dir.display());
            println!("Data dir:     {}", library.layout().data_dir.display());
            Ok(())
        }
    }
}

/// Install while a second thread mirrors the progress table into a bar
fn install_with_bar(library: &Library, request: &InstallRequest) -> anyhow::Result<Outcome> {
    let tracker = library.progress_tracker();
    let key = request.version_id.to_string();

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("=>-"),
    );

    let done = AtomicBool::new(false);
    let outcome = std::thread::scope(|s| {
        s.spawn(|| {
            while !done.load(Ordering::Relaxed) {
                if let Some(transfer) = tracker.snapshot(&key) {
                    bar.set_length(transfer.total);
                    bar.set_position(transfer.downloaded);
                }
                std::thread::sleep(Duration::from_millis(100));
            }
        });

        let outcome = library.install(request);
        done.store(true, Ordering::Relaxed);
        outcome
    });

    match tracker.snapshot(&key) {
        Some(transfer) if outcome.ok => {
            bar.finish_and_clear();
            println!("Downloaded {}", format_bytes(transfer.downloaded));
        }
        _ => bar.abandon(),
    }
    Ok(outcome)
}

fn report(outcome: Outcome) -> anyhow::Result<()> {
    match (outcome.ok, outcome.path, outcome.error) {
        (true, Some(path), _) => {
            println!("✓ Installed at {path}");
            Ok(())
        }
        (true, None, _) => {
            println!("✓ Done");
            Ok(())
        }
        (false, _, error) => anyhow::bail!(error.unwrap_or_else(|| "Unknown error".to_string())),
    }
}
