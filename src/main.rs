//! Valet CLI
//!
//! One-shot usage: `valet "tell me a dad joke"`. An interactive session
//! is available with `--chat`. The loop's status transitions are
//! rendered here and nowhere else; the core never depends on a display.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dialoguer::Input;
use tracing_subscriber::EnvFilter;

use valet::agent::Agent;
use valet::config::{load_config, resolve_path};
use valet::llm::OpenAiClient;
use valet::memory::MessageStore;
use valet::state::FileStore;
use valet::tools::ToolRegistry;
use valet::types::{AgentStatus, ChatRole, ToolContext, TurnOutcome};

/// Valet -- conversational assistant with tools
#[derive(Parser, Debug)]
#[command(name = "valet", version, about = "Valet -- conversational assistant with tools")]
struct Cli {
    /// Message to send to the assistant
    message: Option<String>,

    /// Start an interactive chat session
    #[arg(long)]
    chat: bool,

    /// Show configuration and conversation status
    #[arg(long)]
    status: bool,

    /// Delete the stored conversation
    #[arg(long)]
    reset: bool,
}

fn build_agent() -> Result<Agent> {
    let config = load_config();
    if config.api_key.is_empty() {
        anyhow::bail!("no API key configured; set OPENAI_API_KEY or edit ~/.valet/valet.json");
    }

    let model = Arc::new(OpenAiClient::new(
        config.api_url.clone(),
        config.api_key.clone(),
        config.model.clone(),
        config.temperature,
    ));

    let store_path = resolve_path(&config.store_path);
    let store = MessageStore::new(
        FileStore::open(&store_path).context("opening conversation store")?,
        model.clone(),
    );

    let ctx = ToolContext {
        http: reqwest::Client::new(),
        config,
    };

    let agent = Agent::new(store, model, ToolRegistry::builtin(), ctx)
        .with_status_callback(Box::new(render_status));
    Ok(agent)
}

fn render_status(status: AgentStatus) {
    match status {
        AgentStatus::AwaitingModel => eprintln!("{}", "thinking...".dimmed()),
        AgentStatus::ToolPending { tool } => {
            eprintln!("{}", format!("running tool: {tool}").dimmed())
        }
        AgentStatus::AwaitingApproval { tool } => {
            eprintln!("{}", format!("{tool} needs your approval").yellow())
        }
        AgentStatus::Idle | AgentStatus::Done => {}
    }
}

fn render_outcome(outcome: &TurnOutcome) {
    match outcome {
        TurnOutcome::Done(window) => {
            if let Some(reply) = window
                .iter()
                .rev()
                .find(|m| m.role == ChatRole::Assistant && m.content.is_some())
            {
                println!(
                    "{} {}",
                    "valet:".green().bold(),
                    reply.content.as_deref().unwrap_or_default()
                );
            }
        }
        TurnOutcome::AwaitingApproval { tool } => {
            println!(
                "{}",
                format!("I'd like to run {tool}. Reply to approve or decline.").yellow()
            );
        }
        TurnOutcome::HopLimitReached => {
            println!(
                "{}",
                "I stopped after too many chained tool calls. Try rephrasing your request.".red()
            );
        }
    }
}

fn show_status() {
    let config = load_config();
    let store_path = resolve_path(&config.store_path);

    let (messages, summary) = match FileStore::open(&store_path).and_then(|s| s.load()) {
        Ok(state) => (state.messages.len(), state.summary),
        Err(_) => (0, String::new()),
    };

    println!("model:    {}", config.model);
    println!("api:      {}", config.api_url);
    println!("store:    {}", store_path);
    println!("messages: {}", messages);
    if !summary.is_empty() {
        println!("summary:  {}", summary);
    }
}

async fn run_once(agent: &Agent, message: &str) -> Result<()> {
    let outcome = agent.run_turn(message).await?;
    render_outcome(&outcome);
    Ok(())
}

async fn run_chat(agent: &Agent) -> Result<()> {
    println!("{}", "valet interactive chat. Ctrl+C to quit.".dimmed());
    loop {
        let input: String = Input::new().with_prompt("you").interact_text()?;
        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        run_once(agent, trimmed).await?;
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.status {
        show_status();
        return;
    }

    if cli.reset {
        let config = load_config();
        let store_path = resolve_path(&config.store_path);
        match FileStore::open(&store_path).and_then(|s| {
            s.reset()?;
            Ok(())
        }) {
            Ok(()) => println!("conversation reset"),
            Err(e) => {
                eprintln!("reset failed: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let result = match (cli.message, cli.chat) {
        (Some(message), false) => match build_agent() {
            Ok(agent) => run_once(&agent, &message).await,
            Err(e) => Err(e),
        },
        (None, true) | (Some(_), true) => match build_agent() {
            Ok(agent) => run_chat(&agent).await,
            Err(e) => Err(e),
        },
        (None, false) => {
            println!("usage: valet \"<message>\"  (or valet --chat)");
            return;
        }
    };

    if let Err(e) = result {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
