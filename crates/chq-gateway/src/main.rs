//! chq-gateway: CareerHQ Workflow Runner
//!
//! Runs one career request through the agent workflow and prints every
//! event as it happens.
//!
//! Usage:
//!   chq-gateway [OPTIONS] <REQUEST>...
//!   chq-gateway --help    - Show help

use anyhow::Context;
use chq_core::{ClientEvent, ClientEventKind, Config, ModelProfile, WorkflowService};
use futures::StreamExt;
use nu_ansi_term::Color;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Options for a single run
#[derive(Debug, Default, PartialEq)]
struct RunArgs {
    config: Option<PathBuf>,
    deep_thinking: bool,
    no_search: bool,
    json: bool,
    request: String,
}

/// Run mode
#[derive(Debug, PartialEq)]
enum RunMode {
    /// Process one request
    Run(RunArgs),
    /// Show help
    Help,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match parse_args(std::env::args().skip(1))? {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("chq-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Run(args) => args,
    };

    // Logs go to stderr so stdout carries only events
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let config = Config::load_from(args.config.as_deref()).context("Config error")?;
    tracing::info!("Starting chq-gateway...");
    tracing::info!(
        "Basic model: {}, reasoning model: {}",
        config.llm.model_for(ModelProfile::Basic),
        config.llm.model_for(ModelProfile::Reasoning)
    );

    let service = WorkflowService::from_config(&config).context("Failed to build workflow")?;

    let mut options = service.default_options();
    if args.deep_thinking {
        options.deep_thinking_mode = true;
    }
    if args.no_search {
        options.search_before_planning = false;
    }

    let mut events = service.process_request(args.request, options);
    let mut failed = false;
    while let Some(event) = events.next().await {
        failed |= event.is_error();
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            print_event(&event);
        }
    }

    if failed {
        anyhow::bail!("Run ended with an error");
    }
    Ok(())
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> anyhow::Result<RunMode>
where
    I: IntoIterator<Item = String>,
{
    let mut run = RunArgs::default();
    let mut words = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => return Ok(RunMode::Help),
            "--version" | "-v" => return Ok(RunMode::Version),
            "--config" | "-c" => {
                let path = args.next().context("--config requires a path")?;
                run.config = Some(PathBuf::from(path));
            }
            "--deep-thinking" => run.deep_thinking = true,
            "--no-search" => run.no_search = true,
            "--json" => run.json = true,
            flag if flag.starts_with("--") => anyhow::bail!("Unknown option: {}", flag),
            other => words.push(other.to_string()),
        }
    }

    if words.is_empty() {
        anyhow::bail!("No request given (see --help)");
    }
    run.request = words.join(" ");
    Ok(RunMode::Run(run))
}

/// Print help message
fn print_help() {
    println!("chq-gateway - CareerHQ multi-agent career assistant");
    println!();
    println!("Usage:");
    println!("  chq-gateway [OPTIONS] <REQUEST>...");
    println!();
    println!("Options:");
    println!("  -c, --config PATH    Configuration file (default: careerhq.toml if present)");
    println!("      --deep-thinking  Use the reasoning model for planning and agents");
    println!("      --no-search      Do not search before planning");
    println!("      --json           Print events as JSON lines");
    println!("  -h, --help           Show this help message");
    println!("  -v, --version        Show version");
    println!();
    println!("Environment Variables:");
    println!("  LLM_API_KEY          API key (required)");
    println!("  LLM_PROVIDER         Provider: claude or openai (default: claude)");
    println!("  LLM_BASE_URL         Custom API endpoint");
    println!("  BASIC_MODEL          Model for routine calls (default: claude-sonnet-4-20250514)");
    println!("  REASONING_MODEL      Model for deep thinking (default: BASIC_MODEL)");
    println!("  RECURSION_LIMIT      Maximum node invocations per run (default: 30)");
    println!("  LLM_RATE_LIMIT       Requests per window per model (default: 60)");
    println!("  LLM_RATE_WINDOW_SECS Rate limit window in seconds (default: 60)");
}

fn print_event(event: &ClientEvent) {
    let speaker = event.speaker.as_deref().unwrap_or("error");
    match event.kind {
        ClientEventKind::Intermediate => {
            println!("{} {}", Color::Cyan.bold().paint(format!("[{}]", speaker)), event.content);
        }
        ClientEventKind::Final => {
            println!();
            println!("{}", Color::Green.bold().paint(format!("=== {} ===", speaker)));
            println!("{}", event.content);
        }
        ClientEventKind::Error => {
            eprintln!("{} {}", Color::Red.bold().paint("Error:"), event.content);
        }
    }
}
