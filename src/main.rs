use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modelarena::Category;
use modelarena::cli::commands;

#[derive(Parser)]
#[command(name = "modelarena")]
#[command(version, about = "Side-by-side AI model benchmarks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, short, global = true, help = "Config file (skips global/project lookup)")]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        #[arg(long, short, help = "Listen address (default: server.bind)")]
        bind: Option<String>,
    },

    /// Benchmark one category
    Run {
        #[arg(help = "Category: code, ascii, image")]
        category: Category,
        #[arg(
            long = "model",
            short = 'm',
            help = "Model id (repeatable; default: every model in the category)"
        )]
        models: Vec<String>,
        #[arg(long, short, conflicts_with = "prompt_file", help = "Prompt text")]
        prompt: Option<String>,
        #[arg(long, help = "Read the prompt from a file")]
        prompt_file: Option<PathBuf>,
        #[arg(long, env = "IMAGE_PASSWORD", hide_env_values = true, help = "Image category password")]
        password: Option<String>,
        #[arg(long, help = "Print this run's entries as JSON")]
        json: bool,
    },

    /// Re-run every category with its configured task prompt
    Refresh,

    /// Inspect or clear the cached snapshot
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// List the model catalog
    Models {
        #[arg(long, help = "Only this category")]
        category: Option<Category>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the cached snapshot
    Show {
        #[arg(long, help = "Print raw JSON")]
        json: bool,
    },
    /// Delete the cached snapshot
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources, secrets omitted)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a starter configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mmodelarena encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Serve { bind } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::serve::run(config_path, bind))?;
        }
        Commands::Run {
            category,
            models,
            prompt,
            prompt_file,
            password,
            json,
        } => {
            let rt = Runtime::new()?;
            rt.block_on(commands::run::run(
                config_path,
                commands::run::RunOptions {
                    category,
                    models,
                    prompt,
                    prompt_file,
                    password,
                    json,
                },
            ))?;
        }
        Commands::Refresh => {
            let rt = Runtime::new()?;
            rt.block_on(commands::refresh::run(config_path))?;
        }
        Commands::Cache { action } => {
            let rt = Runtime::new()?;
            match action {
                CacheAction::Show { json } => rt.block_on(commands::cache::show(config_path, json))?,
                CacheAction::Clear => rt.block_on(commands::cache::clear(config_path))?,
            }
        }
        Commands::Models { category } => {
            commands::models::run(config_path, category)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => {
                commands::config::show(config_path, &format)?;
            }
            ConfigAction::Path => {
                commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                commands::config::init(global, force)?;
            }
        },
    }

    Ok(())
}
