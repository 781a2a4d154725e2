//! Trusted-node DAO daemon: replays or serves a command log against one
//! governance domain.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use trustdao_node::{
    init_logging, spawn_actor, CommandLog, DaoNode, LogEntry, LogFormat, NodeConfig, Reply,
};
use trustdao_types::SystemClock;

#[derive(Parser)]
#[command(name = "trustdao-daemon", about = "Trusted-node DAO daemon")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "TRUSTDAO_CONFIG")]
    config: Option<PathBuf>,

    /// Guardian address for bootstrap mode.
    #[arg(long, env = "TRUSTDAO_GUARDIAN")]
    guardian: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "TRUSTDAO_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "TRUSTDAO_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Apply a command log in order and print one JSON reply per entry.
    Replay {
        /// Command log to replay (defaults to `command_log` from the config).
        #[arg(long)]
        log: Option<PathBuf>,

        /// Stop at the first rejected command.
        #[arg(long)]
        stop_on_error: bool,
    },
    /// Read log entries from stdin and apply them through the actor.
    Serve,
    /// Print the effective configuration as TOML.
    Config,
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(guardian) = &cli.guardian {
        config.guardian = guardian.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    Ok(config)
}

fn print_reply(reply: &Reply) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(reply).context("encoding reply")?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Command::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    init_logging(config.log_format, &config.log_level);
    let node = DaoNode::new(&config, SystemClock).context("initialising DAO node")?;

    match cli.command {
        Command::Replay { log, stop_on_error } => {
            let path = log
                .or_else(|| config.command_log.clone())
                .context("no command log given (use --log or set command_log)")?;
            let log = CommandLog::from_file(&path)
                .with_context(|| format!("reading command log {}", path.display()))?;
            tracing::info!(entries = log.len(), path = %path.display(), "replaying command log");

            let mut node = node;
            for reply in node.replay(&log, stop_on_error || config.stop_on_error) {
                print_reply(&reply)?;
            }
            if node.rejected() > 0 {
                tracing::warn!(rejected = node.rejected(), "some commands were rejected");
            }
        }
        Command::Serve => {
            let (handle, task) = spawn_actor(node, config.queue_depth);
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut line_no = 0usize;
            while let Some(line) = lines.next_line().await? {
                line_no += 1;
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let entry: LogEntry = match serde_json::from_str(line) {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(line = line_no, error = %e, "skipping malformed entry");
                        continue;
                    }
                };
                print_reply(&handle.submit(entry).await?)?;
            }
            drop(handle);
            let node = task.await.context("DAO actor panicked")?;
            tracing::info!(
                applied = node.applied(),
                members = node.dao().member_count(),
                "input closed, daemon exiting"
            );
        }
        Command::Config => {}
    }

    Ok(())
}
