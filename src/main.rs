use clap::Parser;
use drain_controller::config::load_config;
use drain_controller::drain::{
    ControllerConfig, DrainController, DrainError, DrainReport, DrainRequest, DrainTiming,
    InvocationEvent,
};
use drain_controller::{action_executor, status_store};
use serde_json::json;
use std::convert::TryFrom;
use std::io::Read;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::subscriber::set_global_default;
use tracing::{error, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

#[derive(Parser, Debug)]
#[command(name = "drain-controller")]
#[command(about = "Waits for a node's connections to drain, then stops its workload")]
struct Args {
    /// Invocation event JSON file, `-` reads stdin
    #[arg(long, default_value = "-")]
    event: String,

    /// Overrides drain.max_drain_duration, e.g. `90m`
    #[arg(long, value_parser = humantime::parse_duration)]
    max_drain_duration: Option<Duration>,

    /// Overrides drain.poll_interval, e.g. `30s`
    #[arg(long, value_parser = humantime::parse_duration)]
    poll_interval: Option<Duration>,
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the invocation result
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(ErrorLayer::default());

    set_global_default(subscriber)?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging()?;

    let config = load_config()?;

    let status_store = status_store::build_from_config(Arc::clone(&config))?;
    let action_executor = action_executor::build_from_config(Arc::clone(&config))?;

    let controller = DrainController::new(
        status_store,
        action_executor,
        ControllerConfig::from(&config.drain),
    );

    let mut timing = DrainTiming::from(&config.drain);
    if let Some(max_drain_duration) = args.max_drain_duration {
        timing.max_drain_duration = max_drain_duration;
    }
    if let Some(poll_interval) = args.poll_interval {
        timing.poll_interval = poll_interval;
    }

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(
        cancel.clone(),
        config.drain.invocation_timeout,
    ));

    let result = match read_request(&args.event) {
        Ok(request) => {
            controller
                .drain_until_cancelled(request, timing, cancel)
                .await
        }
        Err(e) => Err(e),
    };

    if let Err(code) = print_result(result) {
        process::exit(code);
    }

    Ok(())
}

fn read_request(source: &str) -> Result<DrainRequest, DrainError> {
    let mut raw = String::new();

    let read = if source == "-" {
        std::io::stdin().read_to_string(&mut raw).map(|_| ())
    } else {
        std::fs::read_to_string(source).map(|content| raw = content)
    };

    read.map_err(|e| {
        DrainError::InvalidRequest(format!("failed to read event from {}: {}", source, e))
    })?;

    let event: InvocationEvent = serde_json::from_str(&raw)
        .map_err(|e| DrainError::InvalidRequest(format!("malformed event: {}", e)))?;

    DrainRequest::try_from(event)
}

fn print_result(result: Result<DrainReport, DrainError>) -> Result<(), i32> {
    match result {
        Ok(report) => {
            info!(
                "Drain of node {} finished with {} after {} polls",
                report.node_id, report.result, report.polls
            );

            let report = serde_json::to_string(&report).map_err(|e| {
                error!("Failed to serialize report {:?}", e);
                1
            })?;
            println!("{}", report);

            Ok(())
        }
        Err(e) => {
            error!("Drain failed: {}", e);
            println!("{}", json!({ "error": e.to_string(), "kind": e.kind() }));

            Err(1)
        }
    }
}

/// Cancels the drain on SIGINT or SIGTERM, or once the invocation timeout elapses.
async fn cancel_on_shutdown(cancel: CancellationToken, invocation_timeout: Option<Duration>) {
    let timeout = async {
        match invocation_timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = timeout => warn!("Reached invocation timeout"),
    }

    cancel.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(e) => {
            warn!("Failed to register SIGTERM handler {:?}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
        _ = terminate.recv() => info!("Received SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received Ctrl-C");
}
