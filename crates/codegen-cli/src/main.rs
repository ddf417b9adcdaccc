//! codegen - turn prompts into code from the terminal

mod config;
mod form;
mod ui;

use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use codegen_ai::{
    BoxedClient, UsageClient,
    providers::{DEFAULT_TIMEOUT, EndpointClient, OpenAIClient},
};
use codegen_session::{RequestCoordinator, SubmitOutcome};
use config::{Backend, Config, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use ui::UiMessage;

/// codegen - describe the code you want, get it back as markdown
#[derive(Parser, Debug)]
#[command(name = "codegen")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Completion endpoint URL (endpoint backend)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Which client to use
    #[arg(short, long, value_enum)]
    backend: Option<Backend>,

    /// Model id (openai backend, default: gpt-3.5-turbo)
    #[arg(short, long)]
    model: Option<String>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Write verbose logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(&args)?;

    if args.init_config {
        match Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let config = Config::load();
    let client = build_client(&args, &config)?;
    let usage = config
        .usage_url
        .as_deref()
        .map(UsageClient::new)
        .transpose()?;

    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    if let Some(ref usage) = usage {
        spawn_quota_fetch(usage.clone(), ui_tx.clone());
    }
    let coordinator = RequestCoordinator::new(client).with_refresh(refresh_hook(usage, ui_tx));
    tracing::info!(client = coordinator.client_name(), "codegen starting");

    let use_tui = !args.no_tui && config.tui.unwrap_or(true) && std::io::stdout().is_terminal();
    if use_tui && args.command.is_none() {
        // raw mode delivers Ctrl+C as a key event
        let title = coordinator.client_name().to_string();
        let theme = config.theme.unwrap_or_default().theme();
        return ui::run_tui(&coordinator, ui_rx, &title, theme).await;
    }

    let mut interrupts = spawn_interrupts();
    if let Some(ref prompt) = args.command {
        if !run_command(&coordinator, prompt, &mut interrupts).await {
            std::process::exit(1);
        }
        return Ok(());
    }

    if std::io::stderr().is_terminal() {
        eprintln!("codegen ({})", coordinator.client_name());
        eprintln!();
    }
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run_interactive(&coordinator, stdin, ui_rx, &mut interrupts).await
}

fn init_tracing(args: &Args) -> anyhow::Result<()> {
    if !args.verbose {
        return Ok(());
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("codegen=debug"));

    match args.log_file {
        Some(ref path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Build the completion client from flags, then config, then defaults
fn build_client(args: &Args, config: &Config) -> anyhow::Result<BoxedClient> {
    let backend = args.backend.or(config.backend).unwrap_or_default();
    let timeout = config.timeout().unwrap_or(DEFAULT_TIMEOUT);

    tracing::debug!(backend = backend.as_str(), "building client");
    match backend {
        Backend::Endpoint => {
            let url = args
                .endpoint
                .clone()
                .or_else(|| config.endpoint.clone())
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
            tracing::debug!(%url, "using completion endpoint");
            Ok(Arc::new(EndpointClient::with_timeout(url, timeout)?))
        }
        Backend::Openai => {
            let api_key = config.openai_api_key().ok_or_else(|| {
                anyhow!("no OpenAI API key: set OPENAI_API_KEY or [api_keys] openai in the config")
            })?;
            let model = args
                .model
                .clone()
                .or_else(|| config.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string());

            let mut client = OpenAIClient::new(api_key, model)?.with_timeout(timeout)?;
            if let Some(ref base_url) = config.base_url {
                client = client.with_base_url(base_url.as_str())?;
            }
            if let Some(ref system_prompt) = config.system_prompt {
                client = client.with_system_prompt(system_prompt.as_str());
            }
            Ok(Arc::new(client))
        }
    }
}

/// Called by the coordinator after every settled request
fn refresh_hook(
    usage: Option<UsageClient>,
    ui_tx: mpsc::UnboundedSender<UiMessage>,
) -> impl Fn() + Send + Sync + 'static {
    move || {
        tracing::debug!("request settled");
        if let Some(ref usage) = usage {
            spawn_quota_fetch(usage.clone(), ui_tx.clone());
        }
    }
}

fn spawn_quota_fetch(usage: UsageClient, ui_tx: mpsc::UnboundedSender<UiMessage>) {
    tokio::spawn(async move {
        match usage.fetch().await {
            Ok(quota) => {
                let _ = ui_tx.send(UiMessage::Quota(quota));
            }
            Err(e) => tracing::warn!(kind = %e.kind(), "usage refresh failed: {}", e),
        }
    });
}

/// Forward every Ctrl+C to one channel.
///
/// Listening replaces the default SIGINT handler for the rest of the process,
/// so this is installed once and every consumer reads from the channel.
fn spawn_interrupts() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Submit, aborting on interrupt
async fn submit_interruptible(
    coordinator: &RequestCoordinator,
    prompt: &str,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> SubmitOutcome {
    let handle = coordinator.handle();
    let submit = coordinator.submit(prompt);
    tokio::pin!(submit);

    tokio::select! {
        biased;
        outcome = &mut submit => outcome,
        Some(()) = interrupts.recv() => {
            handle.abort();
            submit.await
        }
    }
}

/// Print the outcome; returns false if no reply was produced
fn report(outcome: SubmitOutcome) -> bool {
    match outcome {
        SubmitOutcome::Completed(reply) => {
            println!("{}", reply.content());
            true
        }
        SubmitOutcome::Rejected(e) => {
            eprintln!("{}", e);
            false
        }
        SubmitOutcome::Failed { kind, message } => {
            eprintln!("Request failed ({}): {}", kind, message);
            false
        }
        SubmitOutcome::Cancelled => {
            eprintln!("Cancelled.");
            false
        }
        SubmitOutcome::Busy => false,
    }
}

async fn run_command(
    coordinator: &RequestCoordinator,
    prompt: &str,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> bool {
    report(submit_interruptible(coordinator, prompt, interrupts).await)
}

/// Line mode: one prompt per line until EOF or an interrupt while idle
async fn run_interactive<R: AsyncBufRead + Unpin>(
    coordinator: &RequestCoordinator,
    input: R,
    mut ui_rx: mpsc::UnboundedReceiver<UiMessage>,
    interrupts: &mut mpsc::UnboundedReceiver<()>,
) -> anyhow::Result<()> {
    let mut lines = input.lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            biased;
            Some(()) = interrupts.recv() => {
                println!();
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            break;
        };

        if report(submit_interruptible(coordinator, &line, interrupts).await) {
            println!();
        }

        while let Ok(UiMessage::Quota(quota)) = ui_rx.try_recv() {
            eprintln!("[{}]", quota);
        }
    }

    Ok(())
}
