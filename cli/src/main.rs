//! CLI entrypoint for conduit
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod commands;
mod logging;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use commands::{Cli, Command, ServeArgs};
use conduit_application::{AuditSink, NoAuditSink, OutcomeObserver, RequestDispatcher};
use conduit_infrastructure::{
    ConfigLoader, FileConfig, HeuristicScorer, JsonlAuditSink, SessionManager, bind_and_serve,
    builtin_registry, provider_from_config, serve_stdio,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Extra time allowed for the last audit records after the observer timeout.
const AUDIT_DRAIN_SLACK: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config_sources {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let _log_guard = logging::init(cli.verbose, cli.log_file.as_deref())?;

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };

    match cli.command {
        Some(Command::Tools) => {
            list_tools();
            Ok(())
        }
        Some(Command::Serve(args)) => serve(file_config, args).await,
        None => serve(file_config, ServeArgs::default()).await,
    }
}

fn list_tools() {
    for tool in builtin_registry().summaries() {
        println!("{:<10} {:<9} {}", tool.name, tool.kind, tool.description);
    }
}

fn audit_sink(config: &FileConfig) -> Arc<dyn AuditSink> {
    if !config.audit.enabled {
        info!("Audit trail disabled");
        return Arc::new(NoAuditSink);
    }
    let path = config.audit.path.clone().or_else(ConfigLoader::default_audit_path);
    match path.and_then(|p| JsonlAuditSink::new(p)) {
        Some(sink) => {
            info!(path = %sink.path().display(), "Writing audit trail");
            Arc::new(sink)
        }
        None => {
            warn!("Audit trail disabled: no writable audit path");
            Arc::new(NoAuditSink)
        }
    }
}

async fn serve(file_config: FileConfig, args: ServeArgs) -> Result<()> {
    let config = Arc::new(file_config.to_core_config().context("Invalid configuration")?);
    let budget = config.budget();
    info!(
        session_ms = budget.session().as_millis() as u64,
        dispatch_ms = budget.dispatch().as_millis() as u64,
        step_ms = budget.workflow_step().as_millis() as u64,
        provider_ms = budget.provider_call().as_millis() as u64,
        "Timeout budget"
    );

    // === Dependency Injection ===
    let sink = audit_sink(&file_config);
    let observer = if file_config.audit.scoring {
        OutcomeObserver::new(
            Arc::new(HeuristicScorer::new(budget.dispatch())),
            sink,
            config.observer_timeout(),
        )
    } else {
        OutcomeObserver::audit_only(sink)
    };
    let dispatcher = Arc::new(RequestDispatcher::new(
        Arc::new(builtin_registry()),
        Arc::clone(&config),
        provider_from_config(&file_config.provider),
        observer,
    ));
    let manager = Arc::new(SessionManager::new(Arc::clone(&dispatcher)));

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            on_signal.cancel();
        }
    });

    if args.stdio {
        serve_stdio(manager, shutdown).await.context("Session failed")?;
    } else {
        let listen = args.listen.unwrap_or(file_config.server.listen);
        let addr: SocketAddr = listen
            .parse()
            .with_context(|| format!("Invalid listen address: {}", listen))?;
        bind_and_serve(addr, manager, shutdown)
            .await
            .with_context(|| format!("Failed to serve on {}", addr))?;
    }

    if !dispatcher
        .drain_observations(config.observer_timeout() + AUDIT_DRAIN_SLACK)
        .await
    {
        warn!("Some audit records were not written before exit");
    }
    info!("Stopped");
    Ok(())
}
