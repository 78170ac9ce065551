use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use llm_router::{
    ChatMessage, ChatOptions, LlmAdapter, RouterConfig, observability::init_tracing,
};

/// Environment variable naming the config file when `--config` is absent.
const CONFIG_ENV_VAR: &str = "LLM_CONNECTOR_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "llm-router.toml";

/// CLI arguments for the LLM router
#[derive(Parser, Debug)]
#[command(version, about = "Resilient multi-provider LLM chat router", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (defaults to $LLM_CONNECTOR_CONFIG, then
    /// ./llm-router.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Send one user message through the router and print the response JSON
    Chat {
        /// User message
        message: String,
        /// Optional system prompt sent before the user message
        #[arg(long)]
        system: Option<String>,
        /// Model override
        #[arg(short, long)]
        model: Option<String>,
        /// Sampling temperature (0.0 to 2.0)
        #[arg(short, long)]
        temperature: Option<f64>,
        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,
    },
    /// Validate the configuration and print the provider order
    Check,
    /// Print the rate limiter state for every provider
    Limits,
}

/// Resolve the config path: explicit flag, then environment, then the
/// working directory default.
fn resolve_config_path(explicit_path: Option<PathBuf>) -> PathBuf {
    explicit_path
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

fn load_config(path: &PathBuf) -> Result<RouterConfig, String> {
    RouterConfig::from_file(path)
        .map_err(|e| format!("Failed to load config from {}: {}", path.display(), e))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let config_path = resolve_config_path(args.config);

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config.observability.logging) {
        eprintln!("Warning: {e}");
    }
    tracing::debug!(config_file = %config_path.display(), "Configuration loaded");

    match run(args.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: RouterConfig) -> Result<(), String> {
    match command {
        Command::Check => {
            let adapter = LlmAdapter::new(config).map_err(|e| e.to_string())?;
            println!("Configuration OK");
            for (position, name) in adapter.provider_order().iter().enumerate() {
                let provider_type = adapter
                    .config()
                    .providers
                    .get(name)
                    .map(|p| p.provider_type().as_str())
                    .unwrap_or("unknown");
                println!("{:>3}. {} ({})", position + 1, name, provider_type);
            }
            Ok(())
        }
        Command::Limits => {
            let adapter = LlmAdapter::new(config).map_err(|e| e.to_string())?;
            let status = adapter.rate_limit_status();
            let json = serde_json::to_string_pretty(&status).map_err(|e| e.to_string())?;
            println!("{json}");
            Ok(())
        }
        Command::Chat {
            message,
            system,
            model,
            temperature,
            max_tokens,
        } => {
            let adapter = LlmAdapter::new(config).map_err(|e| e.to_string())?;

            let mut messages = Vec::with_capacity(2);
            if let Some(system) = system {
                messages.push(ChatMessage::system(system));
            }
            messages.push(ChatMessage::user(message));

            let options = ChatOptions {
                model,
                temperature,
                max_tokens,
                ..Default::default()
            };

            let response = adapter
                .chat(messages, options)
                .await
                .map_err(|e| format!("{e} (kind: {})", e.kind()))?;
            let json = serde_json::to_string_pretty(&response).map_err(|e| e.to_string())?;
            println!("{json}");
            Ok(())
        }
    }
}
