use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stepwise_core::config::Config;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

mod watch;

use watch::OutputMode;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "Turn a multi-agent event stream into a live step timeline",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow an NDJSON event stream and print steps as they change
    Watch {
        /// Read events from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Print each step view as a JSON line
        #[arg(long)]
        json: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a specific config value by dotted path
    Get { key: String },
    /// Check the configuration for problems
    Validate,
}

/// Pretty JSON for the value at a dotted config path.
fn config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    let value = config
        .get_path(key)
        .ok_or_else(|| anyhow::anyhow!("No config value at '{key}'"))?;
    Ok(serde_json::to_string_pretty(&value)?)
}

fn init_logging(config: &Config, verbose: bool) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let level = config
                .log_level()
                .unwrap_or(if verbose { "debug" } else { "info" });
            let mut filter = EnvFilter::new(level);
            for directive in config.logging.iter().flat_map(|l| &l.filters) {
                filter = filter.add_directive(directive.parse()?);
            }
            filter
        }
    };

    let to_stdout = config.logging.as_ref().is_some_and(|l| l.output == "stdout");
    let writer = if to_stdout {
        BoxMakeWriter::new(std::io::stdout)
    } else {
        BoxMakeWriter::new(std::io::stderr)
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer);
    if config.log_format() == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    let config = Config::load(&config_path)?;
    init_logging(&config, cli.verbose)?;
    tracing::debug!(path = %config_path.display(), "Loaded config");

    match cli.command {
        Commands::Watch { input, json } => {
            let mode = if json { OutputMode::Json } else { OutputMode::Text };
            let engine_config = config.engine();
            let mut stdout = std::io::stdout();

            let summary = match input {
                Some(path) => {
                    tracing::info!("Watching events from {}", path.display());
                    let file = tokio::fs::File::open(&path).await?;
                    watch::run(BufReader::new(file), &mut stdout, &engine_config, mode).await?
                }
                None => {
                    tracing::info!("Watching events from stdin");
                    let stdin = tokio::io::stdin();
                    watch::run(BufReader::new(stdin), &mut stdout, &engine_config, mode).await?
                }
            };

            if summary.failures > 0 {
                tracing::warn!(failures = summary.failures, "Some subscribers failed");
            }
            if mode == OutputMode::Text {
                println!();
                println!("{}", summary.headline);
                println!("{}", summary.describe());
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let json = serde_json::to_string_pretty(&config)?;
                println!("{json}");
            }
            ConfigAction::Get { key } => {
                println!("{}", config_value(&config, &key)?);
            }
            ConfigAction::Validate => {
                let (warnings, errors) = config.validate();
                for warning in &warnings {
                    println!("warning: {warning}");
                }
                for error in &errors {
                    println!("error: {error}");
                }
                if !errors.is_empty() {
                    anyhow::bail!("{} config error(s) in {}", errors.len(), config_path.display());
                }
                println!("Config OK: {}", config_path.display());
            }
        },
    }

    Ok(())
}
