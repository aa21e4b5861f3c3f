//! AgenticLocator Picker — entry point.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use agentic_locator::{synthesize, DocumentQuery, HtmlDocument};
use agentic_locator_picker::config::{resolve_document_path, resolve_options};
use agentic_locator_picker::protocol::CommandHandler;
use agentic_locator_picker::session::PickerSession;
use agentic_locator_picker::transport::StdioTransport;
use agentic_locator_picker::types::{Command, Event};

#[derive(Parser)]
#[command(
    name = "agentic-locator-picker",
    about = "Headless element picker for AgenticLocator — robust locators for picked elements",
    version
)]
struct Cli {
    /// Search budget in milliseconds (overrides the estimate).
    #[arg(long, global = true)]
    budget_ms: Option<u64>,

    /// Dequeues between deadline checks.
    #[arg(long, global = true)]
    yield_every: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the picker over stdio (default).
    Serve {
        /// HTML document to load before reading commands.
        #[arg(short, long)]
        document: Option<String>,

        /// Page-visit URL of the document.
        #[arg(long)]
        url: Option<String>,
    },

    /// Synthesize a locator for one element and exit.
    Locate {
        /// HTML document to search.
        document: String,

        /// CSS selector of the target (first match).
        target: String,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the supported commands and events as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   agentic-locator-picker completions bash > ~/.local/share/bash-completion/completions/agentic-locator-picker
    ///   agentic-locator-picker completions zsh > ~/.zfunc/_agentic-locator-picker
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },

    /// Launch interactive REPL mode.
    Repl,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = resolve_options(cli.budget_ms, cli.yield_every);

    match cli.command.unwrap_or(Commands::Serve {
        document: None,
        url: None,
    }) {
        Commands::Serve { document, url } => {
            let mut session = PickerSession::new(options);
            let (events_tx, events_rx) = mpsc::unbounded_channel();

            if let Some(path) = resolve_document_path(document.as_deref()) {
                let document = session.load(None, Some(path.clone()), url)?;
                tracing::info!("Document: {path}");
                let _ = events_tx.send(Event::DocumentLoaded {
                    elements: document.element_count(),
                    url: document.url().map(str::to_string),
                    loaded_at: session.loaded_at().unwrap_or_else(chrono::Utc::now),
                });
            }

            let handler = CommandHandler::new(Arc::new(Mutex::new(session)), events_tx);
            let transport = StdioTransport::new(handler, events_rx);
            transport.run().await?;
        }

        Commands::Locate {
            document,
            target,
            json,
        } => {
            let doc = HtmlDocument::from_path(&document)?;
            let node = doc.select_first(&target)?;
            let synthesis = synthesize(&doc, node, &options);

            if json {
                println!("{}", serde_json::to_string_pretty(&synthesis)?);
            } else {
                let stats = &synthesis.outcome.stats;
                println!("Full:      {}", synthesis.selection.full_expression);
                match &synthesis.outcome.locator {
                    Some(locator) => {
                        println!("Minimized: {} (cost {})", locator.expression, locator.cost)
                    }
                    None => println!("Minimized: none found"),
                }
                println!(
                    "Search:    {} explored, {} candidates, {} pruned, {}ms of {}ms ({:?})",
                    stats.explored,
                    stats.finished,
                    stats.pruned,
                    stats.elapsed_ms,
                    synthesis.selection.budget_ms(),
                    stats.stop_reason
                );
            }
        }

        Commands::Info => {
            let info = serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "commands": Command::NAMES,
                "events": Event::NAMES,
                "budget_override_ms": options.budget_override.map(|b| b.as_millis() as u64),
                "yield_every": options.yield_every,
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "agentic-locator-picker",
                &mut std::io::stdout(),
            );
        }

        Commands::Repl => {
            agentic_locator_picker::repl::run(options)?;
        }
    }

    Ok(())
}
