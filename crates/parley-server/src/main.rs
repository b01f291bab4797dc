//! Parley Server
//!
//! Serves the tool-calling conversation loop over HTTP, with tools
//! discovered from MCP servers at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures::stream::StreamExt;
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use tracing::{error, info, warn};

use parley::{Core, LLMClient, OpenAIClient, ToolRegistry};
use parley_server::{AppState, ParleyConfig, Result, ServerError, router};
use parley_tools::mcp::McpManager;

#[derive(Debug, Parser)]
#[command(
    name = "parley-server",
    version,
    about = "HTTP front-end for the parley conversation loop"
)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to listen on, overriding the configuration
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<SocketAddr>,
}

/// Initializes structured logging with tracing.
///
/// Supports two output formats via `PARLEY_LOG_FORMAT` environment variable:
/// - `json`: Machine-readable JSON logs
/// - `pretty`: Human-readable formatted logs (default)
///
/// Log level is controlled via `RUST_LOG` environment variable. Records
/// from the `log` facade used by the library crates are forwarded.
fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let format = std::env::var("PARLEY_LOG_FORMAT")
        .unwrap_or_else(|_| "pretty".to_string())
        .to_lowercase();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "parley_server=info,parley=info,parley_client=info,parley_tools=info,tower_http=info",
        )
    });

    match format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .init();
        }
    }
}

/// Connects to the configured MCP servers and registers their tools.
///
/// Startup continues without remote tools if no server can be reached.
async fn connect_mcp(config: &ParleyConfig, registry: &ToolRegistry) -> Option<McpManager> {
    if config.tools.servers.is_empty() {
        info!("No MCP servers configured, starting without remote tools");
        return None;
    }

    match McpManager::new(&config.tools).await {
        Ok(manager) => {
            let count = manager.register_all(registry);
            info!(
                servers = ?manager.connected_servers(),
                "Registered {count} MCP tool(s)"
            );
            Some(manager)
        }
        Err(e) => {
            warn!("Failed to initialize MCP manager: {e:#}");
            None
        }
    }
}

/// Resolves once SIGINT or SIGTERM arrives.
async fn shutdown_signal(mut signals: Signals) {
    while let Some(signal) = signals.next().await {
        match signal {
            SIGTERM => {
                info!("Received SIGTERM, initiating graceful shutdown");
                return;
            }
            SIGINT => {
                info!("Received SIGINT, initiating graceful shutdown");
                return;
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    info!("Starting parley server");

    let mut config = match ParleyConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return Err(e);
        }
    };
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }

    let client_config = config.model.client_config()?;
    let client =
        OpenAIClient::new(client_config).map_err(|e| ServerError::Config(format!("{e:#}")))?;
    info!(
        model = %config.model.model,
        base_url = %config.model.base_url,
        "Completion gateway configured"
    );

    let registry = Arc::new(ToolRegistry::new());
    let mcp = connect_mcp(&config, &registry).await;

    let client: Arc<dyn LLMClient> = Arc::new(client);
    let core = Core::builder()
        .client(client)
        .tools(Arc::clone(&registry))
        .system_prompt_opt(config.chat.system_prompt.clone())
        .build();
    drop(registry);

    let listen = config.server.listen;
    let app = router(AppState::new(core, config.chat));

    let signals = Signals::new([SIGTERM, SIGINT])?;
    let signals_handle = signals.handle();

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(signals))
        .await?;
    signals_handle.close();

    if let Some(manager) = mcp {
        manager.shutdown().await.map_err(ServerError::Mcp)?;
    }

    info!("Server stopped");
    Ok(())
}
