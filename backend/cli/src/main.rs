mod api;
mod chat;
mod config;
mod terminal_output;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use codecontext_config::{check, write_config, CodeContextConfig};
use codecontext_logging::{init_logger, redact_error};
use codecontext_markdown::Renderer;

use api::AppState;
use config::Runtime;
use terminal_output::{note_error, note_info, note_success, note_warn, spawn_phase_reporter, stdout_color};

#[derive(Parser)]
#[command(name = "codecontext")]
#[command(about = "Ask an AI model questions about a file on GitHub")]
#[command(version)]
struct Cli {
    /// Directory holding config.yaml (defaults to $CODECONTEXT_CONFIG_DIR or ~/.codecontext)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question about a GitHub file and print the reply
    Ask {
        /// GitHub file URL (blob or raw)
        url: String,
        /// The question
        prompt: String,
        /// API key to use instead of the environment default
        #[arg(long)]
        key: Option<String>,
        /// Also save the conversation as a PDF
        #[arg(long)]
        export: bool,
    },
    /// Start an interactive conversation
    Chat {
        /// GitHub file URL to start with
        #[arg(long)]
        url: Option<String>,
    },
    /// Start the local web front-end
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(long)]
        bind: Option<String>,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with the credential masked
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file (the old one is kept as a backup)
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let runtime = Runtime::load(cli.config_dir).await?;

    let log_dir = runtime.config.logging.dir.as_deref().map(Path::new);
    init_logger(&runtime.config.logging.level, log_dir)?;
    check(&runtime.config)
        .with_context(|| format!("Invalid config at {}", runtime.config_path.display()))?;

    match cli.command {
        Commands::Ask { url, prompt, key, export } => run_ask(&runtime, url, prompt, key, export).await,
        Commands::Chat { url } => {
            chat::run_chat(&runtime, url).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { port, bind } => {
            run_server(&runtime, bind, port).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { action } => {
            run_config(&runtime, action).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_ask(
    runtime: &Runtime,
    url: String,
    prompt: String,
    key: Option<String>,
    export: bool,
) -> Result<ExitCode> {
    let mut session = runtime.build_session();
    session.set_github_url(url);
    session.set_user_prompt(prompt);
    if let Some(key) = key {
        session.api_key_mut().set_input(&key);
    }

    let reporter = spawn_phase_reporter(session.subscribe_phase());
    let result = session.generate().await;
    reporter.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(category = e.category(), error = %redact_error(&e), "Turn failed");
            note_error(e.user_message());
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("{}", Renderer::markdown_to_terminal(&outcome.reply, stdout_color()));

    if export {
        let path = runtime
            .exporter()
            .export(&outcome.transcript, &outcome.reply, &runtime.export_options())
            .await?;
        note_success(&format!("Saved {}", path.display()));
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_server(runtime: &Runtime, bind: Option<String>, port: Option<u16>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| runtime.config.server.bind.clone());
    let port = port.unwrap_or(runtime.config.server.port);
    let addr = format!("{bind}:{port}");

    info!(
        addr = %addr,
        model = %runtime.config.generation.model,
        relay = %runtime.config.relay.base_url,
        "Starting CodeContext server"
    );
    if runtime.api_key.is_none() {
        note_warn("No API key in the environment; set one in the page before generating.");
    }

    let state = Arc::new(AppState::new(runtime.build_session(), runtime.export_options()));
    let app = api::build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    note_info(&format!("Open http://{addr}/ in a browser"));

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_config(runtime: &Runtime, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            note_info(&format!("Config file: {}", runtime.config_path.display()));
            print!("{}", serde_yaml::to_string(&runtime.redacted_view()?)?);
        }
        ConfigAction::Init { force } => {
            if runtime.config_path.exists() && !force {
                note_warn(&format!(
                    "{} already exists; pass --force to overwrite it",
                    runtime.config_path.display()
                ));
                return Ok(());
            }
            write_config(&CodeContextConfig::default(), &runtime.config_path).await?;
            note_success(&format!("Wrote {}", runtime.config_path.display()));
        }
    }
    Ok(())
}
