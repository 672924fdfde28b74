//! Command-line entry point for the `schedbridge` binary.

pub mod args;
pub mod repl;

use crate::agent::{Agent, AgentHooks, AgentLoopConfig};
use crate::bridge::SchedulerBridge;
use crate::config::Config;
use crate::llm::{ChatModel, OpenAiClient};
use crate::mcp::client::HttpMcpClient;
use crate::mcp::{LocalSurface, ToolCallResult, ToolOutput, ToolSurface};
use crate::session::Session;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "schedbridge",
    version,
    about = "Chat with the meeting scheduler through a language model, or call its tools directly",
    after_help = "Examples:\n  schedbridge list-tools\n  schedbridge call list_meetings --args '{\"client_id\": 7}'\n  schedbridge ask \"Book a kickoff with Acme tomorrow at 10:00 UTC\"\n  schedbridge chat --init \"Who are my clients?\""
)]
pub struct Cli {
    #[arg(long, global = true, help = "Tool server URL (JSON-RPC endpoint)")]
    server_url: Option<String>,

    #[arg(long, global = true, help = "Scheduling store API base URL (used with --direct)")]
    store_url: Option<String>,

    #[arg(long, global = true, help = "Chat model id")]
    model: Option<String>,

    #[arg(long, global = true, env = "SCHEDBRIDGE_CONFIG", help = "Extra config file, applied last")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Call the store in-process instead of going through the tool server")]
    direct: bool,

    #[arg(short, long, global = true, help = "Debug logging to stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List tools and their descriptions")]
    ListTools,
    #[command(about = "Call one tool directly, without a model")]
    Call {
        tool: String,
        #[arg(long, help = "JSON arguments, @file.json, or file path")]
        args: Option<String>,
    },
    #[command(about = "Ask a single prompt and print the answer")]
    Ask {
        prompt: String,
        #[arg(long, help = "System prompt")]
        system: Option<String>,
    },
    #[command(about = "Interactive chat session with context")]
    Chat {
        #[arg(long, help = "System prompt")]
        system: Option<String>,
        #[arg(long, help = "First user message, run before the prompt loop")]
        init: Option<String>,
    },
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.server_url {
            config.server.url = url.clone();
        }
        if let Some(url) = &self.store_url {
            config.store.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.model.name = model.clone();
        }
    }
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    crate::logging::init(if cli.verbose { "debug" } else { "warn" });

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    debug!(?config, "effective configuration");

    match &cli.command {
        Command::ListTools => {
            let surface = tool_surface(&config, cli.direct).await?;
            for tool in surface.list_tools().await? {
                println!("- {}: {}", tool.name, tool.description.unwrap_or_default());
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Call { tool, args } => {
            let arguments = args::parse_args_payload(args.as_deref())?;
            let surface = tool_surface(&config, cli.direct).await?;
            let result = surface.call_tool(tool, arguments).await?;
            print_call_result(&result)?;
            Ok(if result.is_error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }

        Command::Ask { prompt, system } => {
            let agent = start_agent(&config, cli.direct).await?;
            let mut session = Session::new(system.clone().or(config.agent.system_prompt.clone()));
            let result = agent.run_turn(&mut session, prompt, &ConsoleHooks).await?;
            debug!(stats = ?result.stats, "turn stats");
            print_response(&result.response);
            Ok(ExitCode::SUCCESS)
        }

        Command::Chat { system, init } => {
            let agent = start_agent(&config, cli.direct).await?;
            let mut session = Session::new(system.clone().or(config.agent.system_prompt.clone()));
            repl::run(&agent, &mut session, &ConsoleHooks, init.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn tool_surface(config: &Config, direct: bool) -> Result<Arc<dyn ToolSurface>> {
    if direct {
        let bridge = SchedulerBridge::new(&config.store.base_url, config.store.timeout())?;
        return Ok(Arc::new(LocalSurface::new(bridge)));
    }
    let (client, _) = HttpMcpClient::connect(&config.server.url, config.server.timeout())
        .await
        .with_context(|| format!("failed to connect to tool server at {}", config.server.url))?;
    Ok(Arc::new(client))
}

async fn start_agent(config: &Config, direct: bool) -> Result<Agent> {
    let api_key = config.model.resolve_api_key()?;
    let model: Arc<dyn ChatModel> = Arc::new(OpenAiClient::new(
        &config.model.base_url,
        api_key,
        config.model.timeout(),
    )?);
    let tools = tool_surface(config, direct).await?;
    let loop_config = AgentLoopConfig::default()
        .with_model(config.model.name.clone())
        .with_max_iterations(config.agent.max_rounds);
    Ok(Agent::start(model, tools, loop_config).await?)
}

/// Structured content pretty-printed, else the content parts one per line.
fn print_call_result(result: &ToolCallResult) -> Result<()> {
    if let Some(structured) = result.structured().filter(|v| !v.is_null()) {
        println!("{}", serde_json::to_string_pretty(structured)?);
        return Ok(());
    }
    let parts: Vec<String> = result
        .outputs
        .iter()
        .map(|o| match o {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Opaque(v) | ToolOutput::Structured(v) => v.to_string(),
        })
        .collect();
    println!("{}", parts.join("\n"));
    Ok(())
}

pub(crate) fn print_response(content: &str) {
    if content.trim().is_empty() {
        println!("(no assistant content)");
    } else {
        println!("{}", content);
    }
}

const PREVIEW_CHARS: usize = 200;

/// Tool activity on stderr, so stdout carries only answers.
struct ConsoleHooks;

impl AgentHooks for ConsoleHooks {
    fn on_tool_call(&self, name: &str, args: &Value) {
        eprintln!("⏺ {}({})", name, args);
    }

    fn on_tool_result(&self, _name: &str, body: &str) {
        let preview: String = body.chars().take(PREVIEW_CHARS).collect();
        let ellipsis = if body.chars().count() > PREVIEW_CHARS { "…" } else { "" };
        eprintln!("  ⎿ {}{}", preview, ellipsis);
    }
}
