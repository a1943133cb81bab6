use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parley_core::providers::{CallContext, classify};
use parley_core::{ClassifiedError, InvocationOptions, PromptInput, ProviderId, UnifiedInvoker};
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "Parley: send a prompt to whichever LLM provider is configured")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show resolved configuration and the provider that would be used
    Config,

    /// Send a one-shot prompt and print the reply
    Ask {
        /// The prompt; `-` or omitted reads stdin
        message: Option<String>,

        /// Provider override ("anthropic" or "generic_chat")
        #[arg(short, long)]
        provider: Option<String>,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Sampling temperature
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Parse the prompt as JSON (string, message list, string list, or
        /// {system, messages} object)
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG wins when set
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Ask {
            message,
            provider,
            model,
            max_tokens,
            temperature,
            json,
        } => {
            let options = InvocationOptions {
                provider: None,
                model,
                max_tokens,
                temperature,
            };
            cmd_ask(&cli.config, message, provider, options, json).await
        }
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config::default_config_path();
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("Parley initialized at {}", config_dir.display());
    println!("Edit {} to configure your provider.", config_path.display());
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = config::resolve(config_path)?;
    let invoker = UnifiedInvoker::new(cfg);
    let provider = invoker.provider_for(&InvocationOptions::default());

    println!("{:#?}", invoker.config());
    println!();
    println!("Selected provider: {}", provider);
    println!("Model:             {}", invoker.config().model_for(provider));
    println!("Max tokens:        {}", invoker.config().max_tokens());
    println!("Temperature:       {}", invoker.config().temperature());
    Ok(())
}

async fn cmd_ask(
    config_path: &Option<PathBuf>,
    message: Option<String>,
    provider: Option<String>,
    mut options: InvocationOptions,
    json: bool,
) -> Result<()> {
    let cfg = match config::resolve(config_path) {
        Ok(cfg) => cfg,
        Err(e) => match e.downcast::<ClassifiedError>() {
            Ok(classified) => fail(classified),
            Err(e) => return Err(e),
        },
    };

    if let Some(name) = provider {
        match name.parse::<ProviderId>() {
            Ok(id) => options.provider = Some(id),
            Err(e) => fail(classify(e, CallContext::default())),
        }
    }

    let text = read_prompt(message)?;
    let input = if json {
        let value: serde_json::Value =
            serde_json::from_str(&text).context("Prompt is not valid JSON")?;
        PromptInput::detect(value)
    } else {
        PromptInput::Text(text)
    };

    let invoker = UnifiedInvoker::new(cfg);
    match invoker.invoke(input, &options).await {
        Ok(reply) => {
            println!("{}", reply);
            Ok(())
        }
        Err(e) => fail(e),
    }
}

fn read_prompt(message: Option<String>) -> Result<String> {
    match message.as_deref() {
        Some(m) if m != "-" => Ok(m.to_string()),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read prompt from stdin")?;
            Ok(buf.trim_end().to_string())
        }
    }
}

/// Report a classified failure and exit non-zero
fn fail(err: ClassifiedError) -> ! {
    debug!("Underlying error: {:?}", err.cause());
    eprintln!("error[{}]: {}", err.kind(), err);
    std::process::exit(1);
}
