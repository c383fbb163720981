//! Server module
//!
//! Builds the Tokio runtime, binds the listener and runs the accept loop
//! until a shutdown signal arrives. Both binaries go through [`run`].

pub mod connection;
pub mod listener;
pub mod shutdown;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::{AppState, Config};
use crate::handler::{router::VALIDATE_PATH, Router};
use crate::logger;

pub use listener::create_listener;

/// How long open connections may keep running after shutdown starts
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Build the runtime and serve `router` until SIGINT/SIGTERM
///
/// Returns an error (and so a non-zero exit from `main`) if the address is
/// invalid or the listener cannot bind.
pub fn run(config: Config, router: Router) -> Result<(), Box<dyn std::error::Error>> {
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = config.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async move {
        let addr = config.get_socket_addr()?;
        let listener = create_listener(addr)?;
        let state = Arc::new(AppState::new(config, router));

        logger::log_server_start(&addr, &state.config, state.router.has_route(VALIDATE_PATH));

        // LocalSet for spawn_local support
        let local = tokio::task::LocalSet::new();
        local
            .run_until(serve(listener, state, shutdown::wait_for_shutdown()))
            .await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Accept connections on `listener` until `shutdown` resolves
///
/// Must run inside a `LocalSet`. After shutdown, open connections get up to
/// [`SHUTDOWN_GRACE`] to finish before this returns.
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) {
    let active_connections = Arc::new(AtomicUsize::new(0));
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        connection::accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = &mut shutdown => {
                logger::log_shutdown(active_connections.load(Ordering::SeqCst));
                break;
            }
        }
    }

    drop(listener);
    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
    while active_connections.load(Ordering::SeqCst) > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn raw_request(addr: std::net::SocketAddr, request_line: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("{request_line}\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_validate_and_static_over_tcp() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<form id=\"f\"></form>").unwrap();

        let mut config = Config::defaults().unwrap();
        config.static_files.root = dir.path().to_string_lossy().into_owned();
        let router = Router::full(&config);
        let state = Arc::new(AppState::new(config, router));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let server = tokio::task::spawn_local(serve(listener, state, async move {
                    let _ = stop_rx.await;
                }));

                let ok = raw_request(addr, "GET /validate?field=last-name&value=Bloggs HTTP/1.1").await;
                assert!(ok.starts_with("HTTP/1.1 200 OK"), "{ok}");
                assert!(ok.ends_with(r#"{"valid":true,"message":"OK"}"#), "{ok}");

                let missing = raw_request(addr, "GET /validate?field=last-name HTTP/1.1").await;
                assert!(missing.starts_with("HTTP/1.1 404 Not Found"), "{missing}");
                assert!(missing.ends_with("404 Not Found"), "{missing}");

                let post = raw_request(addr, "POST /validate HTTP/1.1").await;
                assert!(post.starts_with("HTTP/1.1 405 Method Not Allowed"), "{post}");

                let index = raw_request(addr, "GET / HTTP/1.1").await;
                assert!(index.ends_with("<form id=\"f\"></form>"), "{index}");

                stop_tx.send(()).unwrap();
                server.await.unwrap();
            })
            .await;
    }

    #[tokio::test]
    async fn test_zero_keep_alive_closes_after_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::defaults().unwrap();
        config.static_files.root = dir.path().to_string_lossy().into_owned();
        config.performance.keep_alive_timeout = 0;
        let router = Router::full(&config);
        let state = Arc::new(AppState::new(config, router));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let local = tokio::task::LocalSet::new();
        local
            .run_until(async move {
                let server = tokio::task::spawn_local(serve(listener, state, async move {
                    let _ = stop_rx.await;
                }));

                // No `Connection: close`: the server must end the connection itself
                let mut stream = TcpStream::connect(addr).await.unwrap();
                stream
                    .write_all(b"GET /validate?field=a&value=b HTTP/1.1\r\nHost: localhost\r\n\r\n")
                    .await
                    .unwrap();
                let mut response = String::new();
                tokio::time::timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
                    .await
                    .expect("connection left open")
                    .unwrap();
                assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
                assert!(response.ends_with(r#"{"valid":true,"message":"OK"}"#), "{response}");

                stop_tx.send(()).unwrap();
                server.await.unwrap();
            })
            .await;
    }
}
