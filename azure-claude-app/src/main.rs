//! `azure-claude` binary: sample flows and a smoke check for the adapter.

mod agent;
mod config;
mod samples;

use anyhow::Context;
use azure_claude::{CancellationToken, Capability, ChatClient};
use clap::{Parser, Subcommand};
use config::ConnectionConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(
    name = "azure-claude",
    version,
    about = "Run Claude on Azure AI Foundry through the azure-claude adapter"
)]
struct Cli {
    #[command(flatten)]
    conn: ConnectionConfig,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run every sample flow in turn (default).
    Samples,
    /// One buffered completion.
    Complete {
        prompt: String,
        #[arg(long)]
        system: Option<String>,
    },
    /// One streamed completion, printed as it arrives.
    Stream { prompt: String },
    /// Three-turn conversation carrying history.
    Chat,
    /// Run a single instruction-following agent.
    Agent {
        #[arg(long, default_value = "You are a writer. Write short, vivid stories.")]
        instructions: String,
        task: String,
    },
    /// Build the client and print its metadata without contacting the service.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;
    install_panic_hook();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Samples);

    let client = cli
        .conn
        .build_client()
        .context("failed to configure the Azure Claude client")?;

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let result = match command {
        Command::Samples => samples::run_all(&client, &cancel).await,
        Command::Complete { prompt, system } => {
            samples::complete(&client, &prompt, system.as_deref(), &cancel).await
        }
        Command::Stream { prompt } => samples::stream(&client, &prompt, &cancel).await.map(|_| ()),
        Command::Chat => samples::multi_turn(&client, &cancel).await,
        Command::Agent { instructions, task } => {
            samples::agent(&client, &instructions, &task, &cancel).await
        }
        Command::Check => check(&client),
    };

    if client.close().is_some() {
        tracing::debug!("caller-supplied transport released");
    }
    result
}

fn check(client: &azure_claude::AzureClaudeClient) -> anyhow::Result<()> {
    let chat = client
        .get_service(Capability::ChatClient)
        .context("client does not expose a chat capability")?;
    let metadata = chat.metadata();
    println!("provider: {}", metadata.provider_name);
    println!("model:    {}", metadata.model_id);
    println!("endpoint: {}", client.endpoint());
    println!("owns transport: {}", client.owns_transport());
    println!(
        "embedding capability: {}",
        client.get_service(Capability::EmbeddingGenerator).is_some()
    );
    Ok(())
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("ctrl-c received; cancelling in-flight request");
                cancel.cancel();
            }
            Err(err) => tracing::warn!(error = %err, "failed to listen for ctrl-c"),
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
    Compact,
}

fn parse_log_format(raw: Option<&str>) -> anyhow::Result<LogFormat> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("compact") => Ok(LogFormat::Compact),
        Some("json") => Ok(LogFormat::Json),
        Some("pretty") => Ok(LogFormat::Pretty),
        Some(other) => Err(anyhow::anyhow!(
            "unsupported AZURE_CLAUDE_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
        )),
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new("info,azure_claude=debug,azure_claude_app=debug"),
    };
    let log_format = parse_log_format(std::env::var("AZURE_CLAUDE_LOG_FORMAT").ok().as_deref())?;

    // stdout carries sample output; logs go to stderr.
    let base = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match log_format {
        LogFormat::Json => base
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .init(),
        LogFormat::Pretty => base
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .init(),
        LogFormat::Compact => base.with_span_events(FmtSpan::CLOSE).compact().init(),
    }

    tracing::debug!(
        log_format = ?log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = panic_payload_to_string(panic_info.payload());
        tracing::error!(
            panic_location = %location,
            panic_payload = %payload,
            "panic captured"
        );
        default_hook(panic_info);
    }));
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return msg.to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
