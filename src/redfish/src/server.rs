// SPDX-License-Identifier: Apache-2.0

//! The per-VM Redfish TCP accept loop: TLS termination via `tokio_rustls`, one `hyper`
//! connection per accepted socket, serving the router built in this crate's resource modules.
//!
//! A request that arrives as plaintext on the TLS port (handshake parse error) is dropped
//! without logging the raw bytes, per §4.4 and the anti-leak logging policy in §9.

use std::net::SocketAddr;

use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tower::Service;
use tracing::{debug, info, warn};

use crate::context::VmContext;
use crate::tls;

/// Errors standing up a Redfish listener.
#[derive(Debug, thiserror::Error, displaydoc::Display)]
pub enum ServerError {
    /// TLS configuration error: {0}
    Tls(#[from] tls::TlsError),
    /// failed to bind Redfish TCP listener on port {0}: {1}
    Bind(u16, String),
}

/// Binds the Redfish TCP listening socket for one VM. Split from [`run`] so the caller can
/// observe a bind failure (e.g. port already in use) before committing to the long-running
/// accept loop.
pub async fn bind(bind_port: u16) -> Result<TcpListener, ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], bind_port));
    TcpListener::bind(addr)
        .await
        .map_err(|err| ServerError::Bind(bind_port, err.to_string()))
}

/// Runs the Redfish TLS accept loop for one VM, on an already-bound `listener`, until `shutdown`
/// is cancelled.
///
/// Builds the router over `context` and spawns one connection task per accepted socket.
/// In-flight connections are given up to 5s to drain once shutdown is signalled (§5); the
/// listener itself stops accepting immediately.
pub async fn run(
    listener: TcpListener,
    context: VmContext,
    cert_path: Option<String>,
    key_path: Option<String>,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let tls_config = tls::build_server_config(cert_path.as_deref(), key_path.as_deref())?;
    let acceptor = TlsAcceptor::from(tls_config);

    info!(vm = %context.vm_name, "redfish listener bound");
    let router = crate::router::build(context.clone());

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!(vm = %context.vm_name, "redfish listener stopping");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(vm = %context.vm_name, error = %err, "accept failed");
                        continue;
                    }
                };
                spawn_connection(stream, peer, acceptor.clone(), router.clone(), shutdown.clone());
            }
        }
    }

    Ok(())
}

fn spawn_connection(
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    router: Router,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let tls_stream = match acceptor.accept(stream).await {
            Ok(stream) => stream,
            Err(_) => {
                debug!(%peer, "dropped non-TLS or malformed handshake on redfish port");
                return;
            }
        };
        let io = TokioIo::new(tls_stream);
        let hyper_service = hyper::service::service_fn(move |request: Request<Incoming>| {
            let mut router = router.clone();
            async move { router.call(request.map(axum::body::Body::new)).await }
        });

        let conn = ConnBuilder::new(TokioExecutor::new()).serve_connection_with_upgrades(io, hyper_service);
        tokio::pin!(conn);
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(err) = result {
                    debug!(%peer, error = %err, "redfish connection ended with error");
                }
            }
            () = shutdown.cancelled() => {
                conn.as_mut().graceful_shutdown();
                let _ = tokio::time::timeout(std::time::Duration::from_secs(5), conn).await;
            }
        }
    });
}
