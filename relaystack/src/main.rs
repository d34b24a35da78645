//! RelayStack - serverless event dispatcher
//!
//! Runs the host loop for a function, dispatches single events locally, runs
//! shell commands inside a deployed function and waits for stack updates.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use relaystack::logging::{self, LogFormat};
use relaystack::{host, DispatchConfig, Dispatcher};
use relaystack_client::{replay, wait_for_update, CloudFormationStatus, LambdaInvoker, RemoteShell};
use relaystack_core::{Event, InvocationContext};
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Function name used for local invocations when none is configured
const LOCAL_FUNCTION_NAME: &str = "relaystack-local";
/// Deadline given to local invocations
const LOCAL_TIMEOUT: Duration = Duration::from_secs(900);

#[derive(Parser, Debug)]
#[command(name = "relaystack")]
#[command(about = "Serverless event dispatcher", long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RELAYSTACK_LOG_LEVEL")]
    log_level: String,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "RELAYSTACK_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve invocations from the host runtime (default)
    Serve,

    /// Dispatch one event locally and print the result
    Invoke {
        /// Event file, or `-` for stdin
        #[arg(long)]
        event: String,
    },

    /// Run a shell command inside a deployed function
    Run {
        /// Function that runs the command
        #[arg(long, env = "RELAYSTACK_TASKS_FUNCTION")]
        function_name: String,

        /// Also log the result in the function's log stream
        #[arg(long)]
        log_result: bool,

        /// Command and arguments
        #[arg(last = true, required = true)]
        args: Vec<String>,
    },

    /// Wait for a pending stack update and fail unless it was applied
    Wait {
        /// Stack to watch
        #[arg(long, env = "RELAYSTACK_STACK_NAME")]
        stack_name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level, args.log_format);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Invoke { event } => invoke(&event).await,
        Command::Run {
            function_name,
            log_result,
            args,
        } => run(&function_name, log_result, &args).await,
        Command::Wait { stack_name } => wait(&stack_name).await,
    }
}

fn dispatcher(config: DispatchConfig) -> anyhow::Result<Dispatcher> {
    Ok(Dispatcher::builder(config).build()?)
}

async fn serve() -> anyhow::Result<()> {
    let dispatcher = dispatcher(DispatchConfig::load()?)?;
    host::serve(Arc::new(dispatcher))
        .await
        .map_err(|e| anyhow::anyhow!(e))
}

async fn invoke(source: &str) -> anyhow::Result<()> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("reading event from {}", source))?
    };
    let event: Event = serde_json::from_str(&raw).context("event is not valid JSON")?;

    let config = DispatchConfig::load()?;
    let function_name = config
        .function_name
        .clone()
        .unwrap_or_else(|| LOCAL_FUNCTION_NAME.to_string());
    let context = InvocationContext::local(&function_name, LOCAL_TIMEOUT);
    let dispatcher = dispatcher(config)?;

    match dispatcher.dispatch(&event, &context).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", e.to_payload().to_json());
            std::process::exit(1);
        }
    }
}

async fn run(function_name: &str, log_result: bool, args: &[String]) -> anyhow::Result<()> {
    let shell = RemoteShell::new(LambdaInvoker::from_env().await, function_name);
    info!(function = %shell.function_name(), command = ?args, "Running remote command");

    let result = shell.run(args, log_result).await?;
    let code = replay(&result, &mut std::io::stdout(), &mut std::io::stderr())?;
    std::process::exit(code);
}

async fn wait(stack_name: &str) -> anyhow::Result<()> {
    let source = CloudFormationStatus::from_env(stack_name).await;
    info!(stack = %source.stack_name(), "Watching stack update");

    let status = wait_for_update(&source)
        .await
        .with_context(|| format!("waiting for stack {}", stack_name))?;
    println!("{}", status);
    Ok(())
}
