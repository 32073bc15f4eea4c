//! Transports that feed channels into the session manager.

use super::session::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Accept TCP connections until `shutdown` fires, one session each.
///
/// Waits for every open session to finish its teardown before returning.
pub async fn serve_tcp(
    listener: TcpListener,
    manager: Arc<SessionManager>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let local = listener.local_addr()?;
    info!(addr = %local, "Listening for connections");

    let mut sessions = JoinSet::new();
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                let _ = stream.set_nodelay(true);
                let manager = Arc::clone(&manager);
                let token = shutdown.clone();
                sessions.spawn(async move {
                    let (read_half, write_half) = stream.into_split();
                    if let Err(e) = manager.serve(read_half, write_half, token).await {
                        warn!(peer = %peer, error = %e, "Session ended with error");
                    }
                });
                info!(peer = %peer, "Accepted connection");
            }
            Err(e) => warn!(error = %e, "Failed to accept connection"),
        }

        while sessions.try_join_next().is_some() {}
    }

    info!(open = sessions.len(), "Listener stopped, waiting for sessions");
    while sessions.join_next().await.is_some() {}
    Ok(())
}

/// Bind `addr` and serve it.
pub async fn bind_and_serve(
    addr: SocketAddr,
    manager: Arc<SessionManager>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_tcp(listener, manager, shutdown).await
}

/// Serve a single channel over the process's stdin and stdout.
pub async fn serve_stdio(
    manager: Arc<SessionManager>,
    shutdown: CancellationToken,
) -> super::error::Result<()> {
    info!("Serving on stdio");
    manager
        .serve(tokio::io::stdin(), tokio::io::stdout(), shutdown)
        .await
}
