use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use agentforge::agent::AgentProfile;
use agentforge::config::Config;
use agentforge::llm::{ChatMessage, Provider, ProviderGateway};
use agentforge::server::{AppState, build_app};

#[derive(Parser)]
#[command(name = "agentforge", version, about = "Assemble and test AI agent configurations")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "agentforge.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API for browser UIs
    Serve {
        /// Override the configured host
        #[arg(long)]
        host: Option<String>,
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send one chat turn and print the reply
    Chat {
        /// Provider id: openrouter, huggingface or ollama
        #[arg(short, long)]
        provider: String,
        /// Model id (defaults to the provider's configured default)
        #[arg(short, long)]
        model: Option<String>,
        /// API key (defaults to OPENROUTER_API_KEY or HF_API_TOKEN)
        #[arg(long)]
        api_key: Option<String>,
        /// Local server endpoint (ollama only)
        #[arg(long)]
        endpoint: Option<String>,
        /// System prompt for the agent
        #[arg(long)]
        system: Option<String>,
        /// Personality tag; repeat for several
        #[arg(long = "personality")]
        personality: Vec<String>,
        /// The user message
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .await
        .with_context(|| format!("loading {}", cli.config.display()))?;

    match cli.command {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Chat {
            provider,
            model,
            api_key,
            endpoint,
            system,
            personality,
            message,
        } => {
            let agent = AgentProfile {
                name: None,
                system_prompt: system.unwrap_or_default(),
                personality,
            };
            let model = model.unwrap_or_else(|| match provider.parse::<Provider>() {
                Ok(p) => config.providers.default_model(p).to_string(),
                Err(_) => String::new(),
            });
            let api_key = api_key.or_else(|| api_key_from_env(&provider));
            let messages =
                agent.conversation(&[ChatMessage::user(message)], config.chat.history_window);

            let gateway = ProviderGateway::from_config(&config.providers);
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let reply = gateway
                .send_chat(
                    &provider,
                    &model,
                    &messages,
                    api_key.as_deref(),
                    endpoint.as_deref(),
                    Some(&cancel),
                )
                .await?;
            println!("{reply}");
            Ok(())
        }
    }
}

async fn serve(config: Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let timeout = config.server.request_timeout_seconds;
    let origins = config.server.allowed_origins.clone();

    let app = build_app(AppState::from_config(config), timeout, &origins);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "agentforge listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

fn api_key_from_env(provider: &str) -> Option<String> {
    let var = match provider.parse::<Provider>().ok()? {
        Provider::OpenRouter => "OPENROUTER_API_KEY",
        Provider::HuggingFace => "HF_API_TOKEN",
        Provider::Ollama => return None,
    };
    std::env::var(var).ok()
}
