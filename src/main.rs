use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use toolgate::config::{self, GatewayConfig};
use toolgate::error::GatewayError;
use toolgate::gateway::Gateway;
use toolgate::logging::{init_logging, LogLevel, LoggingGuard};
use toolgate::tools::{ToolError, ToolInvocationRequest, ToolInvocationResult};
use toolgate::types::InvocationId;

#[derive(Parser)]
#[command(name = "toolgate")]
#[command(about = "Capability-scoped tool gateway for LLM agents", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: ./toolgate.toml, then the XDG config dir)
    #[arg(long, global = true, env = "TOOLGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "TOOLGATE_LOG_LEVEL")]
    log_level: Option<LogLevel>,

    /// Also write logs to stderr
    #[arg(long, global = true)]
    log_stderr: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the registered tool definitions as JSON
    Tools,
    /// Run a single tool invocation and print the result
    Invoke {
        /// Tool name, e.g. calculate
        tool: String,
        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
    /// Read JSON-lines requests from stdin, write results to stdout
    Serve,
    /// Print the effective configuration (secrets redacted)
    Config,
    /// Print the agent manifest for the planning runtime
    Manifest,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_configuration() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run() -> Result<ExitCode, GatewayError> {
    let cli = Cli::parse();

    let (mut config, dotenv) = config::load_effective(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.log_stderr {
        config.logging.stderr = true;
    }

    if let Commands::Config = cli.command {
        print_json(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let _guard = start_logging(&config)?;
    dotenv.log();
    let gateway = Gateway::from_config(config)?;

    match cli.command {
        Commands::Tools => {
            print_json(&gateway.definitions())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Manifest => {
            print_json(&gateway.manifest())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Invoke { tool, args } => cmd_invoke(&gateway, tool, &args).await,
        Commands::Serve => {
            cmd_serve(gateway).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => Ok(ExitCode::SUCCESS),
    }
}

fn start_logging(config: &GatewayConfig) -> Result<Option<LoggingGuard>, GatewayError> {
    match init_logging(&config.logging) {
        Ok(guard) => Ok(guard),
        Err(e) if e.is_no_data_dir() => {
            eprintln!("warning: {e}; continuing without a log file");
            Ok(None)
        }
        Err(e) => Err(GatewayError::logging(e.to_string())),
    }
}

async fn cmd_invoke(gateway: &Gateway, tool: String, args: &str) -> Result<ExitCode, GatewayError> {
    let result = match serde_json::from_str::<Value>(args) {
        Ok(arguments) => {
            gateway
                .invoke(ToolInvocationRequest::new(tool, arguments))
                .await
        }
        Err(e) => ToolInvocationResult::error(
            InvocationId::new(),
            tool,
            0,
            ToolError::invalid_request(format!("--args is not valid JSON: {e}")),
        ),
    };
    print_json(&result)?;
    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// JSON-lines loop. Requests run concurrently; results are written as they
/// complete, so callers correlate by `invocation_id`.
async fn cmd_serve(gateway: Gateway) -> Result<(), GatewayError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            stdout.write_all(line.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    tracing::info!(tools = gateway.registry().len(), "serving on stdio");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ToolInvocationRequest>(line) {
            Ok(request) => {
                let gateway = gateway.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = gateway.invoke(request).await;
                    // Receiver only closes once stdout is gone
                    let _ = tx.send(encode(&result));
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "malformed request line");
                let _ = tx.send(encode(&malformed(line, &e)));
            }
        }
    }

    drop(tx);
    writer
        .await
        .map_err(|e| GatewayError::io(format!("stdout writer failed: {e}")))??;

    let metrics = gateway.metrics();
    tracing::info!(
        requested = metrics.requested,
        succeeded = metrics.succeeded,
        failed = metrics.failed,
        rejected = metrics.rejected,
        "stdin closed"
    );
    Ok(())
}

/// Result for a line that is not a valid request. Echoes the id and tool
/// name when the line is at least a JSON object.
fn malformed(line: &str, err: &serde_json::Error) -> ToolInvocationResult {
    let value = serde_json::from_str::<Value>(line).unwrap_or(Value::Null);
    let invocation_id = value
        .get("invocation_id")
        .and_then(Value::as_str)
        .and_then(|s| InvocationId::parse(s).ok())
        .unwrap_or_default();
    let tool = value
        .get("tool")
        .or_else(|| value.get("name"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    ToolInvocationResult::error(
        invocation_id,
        tool,
        0,
        ToolError::invalid_request(format!("malformed request: {err}")),
    )
}

fn encode(result: &ToolInvocationResult) -> String {
    serde_json::to_string(result).unwrap_or_else(|e| {
        json!({
            "invocation_id": result.invocation_id,
            "tool_name": result.tool_name,
            "status": "error",
            "error": {"kind": "execution_failed", "message": e.to_string()},
        })
        .to_string()
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), GatewayError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| GatewayError::io(format!("failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}
