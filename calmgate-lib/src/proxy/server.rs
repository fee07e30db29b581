use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use http::StatusCode;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dos::{DosGate, MonotonicClock, RequestMeta};
use crate::error::Result;
use crate::proxy::forwarding::{forward, new_client};
use crate::proxy::synthetic_response::synthetic_error_response;

/// Bind the configured listen address and serve until interrupted.
pub async fn run(config: Arc<Config>) -> Result<()> {
    let listener = TcpListener::bind(config.listen).await?;
    run_with_listener(config, listener).await
}

/// Serve on an already-bound listener. Split out so tests can bind port 0
/// and learn the address before the loop starts.
pub async fn run_with_listener(config: Arc<Config>, listener: TcpListener) -> Result<()> {
    let clock = MonotonicClock::new();
    let gate = if config.dos.enabled {
        Some(Arc::new(DosGate::new(&config.dos, clock)?))
    } else {
        None
    };
    let client = new_client();
    let builder = ConnBuilder::new(TokioExecutor::new());
    let conn_seq = Arc::new(AtomicU64::new(0));

    info!(listen = %config.listen, backend = %config.backend, gate = config.dos.enabled, "starting gate");
    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupt received, shutting down");
                break;
            }
        };
        let (stream, peer) = match accepted {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        let connection_id = conn_seq.fetch_add(1, Ordering::Relaxed);

        let gate = gate.clone();
        let client = client.clone();
        let builder = builder.clone();
        let backend = config.backend.clone();
        tokio::spawn(async move {
            let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                let gate = gate.clone();
                let client = client.clone();
                let backend = backend.clone();
                async move {
                    let meta = RequestMeta {
                        begin_nanos: clock.now_nanos(),
                        peer: Some(peer),
                        connection_id,
                    };
                    if let Some(gate) = &gate {
                        if let Some(resp) = gate.check(&meta).await {
                            return Ok::<_, hyper::Error>(resp);
                        }
                    }
                    match forward(req, client, &backend).await {
                        Ok(resp) => Ok(resp),
                        Err(err) => {
                            debug!(%err, "upstream forward failed");
                            Ok(synthetic_error_response(StatusCode::BAD_GATEWAY))
                        }
                    }
                }
            });
            if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                debug!(?peer, error = %e, "serve_connection error");
            }
        });
    }

    if let Some(gate) = &gate {
        gate.shutdown();
    }
    Ok(())
}
