//! Shared utilities for integration and load testing.

use std::net::SocketAddr;

use summer::dispatch::Dispatcher;
use summer::http::HttpServer;
use summer::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A server running on an ephemeral local port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), summer::http::ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Serve `dispatcher` on 127.0.0.1:0.
///
/// The listener is bound before this returns, so requests can be sent
/// immediately.
pub async fn spawn_server(dispatcher: Dispatcher) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(HttpServer::new(dispatcher).run(listener, server_shutdown));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Non-pooled client that does not follow redirects.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}
