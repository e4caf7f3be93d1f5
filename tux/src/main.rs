use std::fs;
use std::path::PathBuf;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use tuxcopilot::cli::{Cli, Command, SandboxCommand, generate_after_help, get_log_path};
use tuxcopilot::config::Config;
use tuxcopilot::repl::run_interactive;
use tuxcopilot::sandbox::{Sandbox, create_sandbox, with_sandbox};
use tuxcopilot::tools::ToolRegistry;

/// Pick the log level: CLI --log-level > config log-level > config debug > INFO
fn resolve_level(cli_log_level: Option<&str>, config_log_level: Option<&str>, debug: bool) -> tracing::Level {
    match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None if debug => tracing::Level::DEBUG,
        None => tracing::Level::INFO,
    }
}

/// Log to a file so tracing never interleaves with the chat on the terminal
fn setup_logging(level: tracing::Level) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.apply_env(std::env::vars()).context("Invalid TUX_COPILOT_* override")?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    setup_logging(resolve_level(
        cli.log_level.as_deref(),
        config.log_level.as_deref(),
        config.debug,
    ))
    .context("Failed to setup logging")?;

    info!(
        "Tux Copilot: model={} url={} runtime={}",
        config.llm.model, config.llm.url, config.sandbox.runtime
    );

    let command = cli.command.clone().unwrap_or(Command::Chat);
    debug!(?command, "main: dispatching command");
    match command {
        Command::Chat => cmd_chat(&config).await,
        Command::Tools => cmd_tools(),
        Command::Sandbox { command } => cmd_sandbox(&config, command).await,
    }
}

async fn cmd_chat(config: &Config) -> Result<()> {
    debug!("cmd_chat: called");
    let sandbox = create_sandbox(&config.sandbox);
    let api_key = config
        .llm
        .api_key_env
        .as_deref()
        .and_then(|var| std::env::var(var).ok());

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "cmd_chat: could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    with_sandbox(
        sandbox.as_ref(),
        interrupt,
        run_interactive(config, sandbox.clone(), api_key),
    )
    .await
}

fn cmd_tools() -> Result<()> {
    debug!("cmd_tools: called");
    let catalog: Vec<_> = ToolRegistry::standard()
        .catalog()
        .iter()
        .map(|spec| spec.to_openai_schema())
        .collect();
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}

async fn cmd_sandbox(config: &Config, command: SandboxCommand) -> Result<()> {
    debug!(?command, "cmd_sandbox: called");
    let sandbox = create_sandbox(&config.sandbox);
    match command {
        SandboxCommand::Build => {
            sandbox.build_image().await?;
            println!("{} {}", "Built".green(), config.sandbox.image);
        }
        SandboxCommand::Start => {
            if !sandbox.image_exists().await {
                sandbox.build_image().await?;
            }
            sandbox.start_container().await?;
            println!("{} {}", "Started".green(), config.sandbox.container);
        }
        SandboxCommand::Stop => {
            sandbox.stop_container().await;
            println!("{} {}", "Stopped".green(), config.sandbox.container);
        }
        SandboxCommand::Status => print_status(config, sandbox.as_ref()).await,
    }
    Ok(())
}

async fn print_status(config: &Config, sandbox: &dyn Sandbox) {
    println!("{}", "Sandbox:".bright_cyan());
    println!("  {:10} {}", "runtime", config.sandbox.runtime);
    println!("  {:10} {}", "image", config.sandbox.image);
    println!("  {:10} {}", "container", config.sandbox.container);
    println!("  {:10} {}", "workdir", config.sandbox.workdir.display());
    println!("  {:10} {}", "state", sandbox.state().await);
}
