//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use graceful_server::config::ServerConfig;
use graceful_server::http::HttpServer;
use graceful_server::lifecycle::{self, Coordinator};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A demo server running under a coordinator on an ephemeral port.
pub struct RunningServer {
    pub server: Arc<HttpServer>,
    pub addr: SocketAddr,
    pub token: CancellationToken,
    pub run: JoinHandle<Result<(), lifecycle::Error>>,
    /// Built before the server starts so timings exclude client setup.
    pub client: reqwest::Client,
}

pub fn test_config(timeout_ms: u64, delay_ms: u64) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.shutdown.timeout_ms = timeout_ms;
    config.handler.response_delay_ms = delay_ms;
    config
}

/// Start a coordinated server and wait until it listens.
pub async fn start_server(timeout_ms: u64, delay_ms: u64) -> RunningServer {
    let client = client();
    let config = test_config(timeout_ms, delay_ms);
    let timeout = config.shutdown.timeout();
    let server = Arc::new(HttpServer::new(config));
    let token = CancellationToken::new();

    let run = {
        let server = server.clone();
        let coordinator = Coordinator::new(timeout).with_cancellation(token.clone());
        tokio::spawn(async move { coordinator.run(&*server).await })
    };

    let addr = server
        .handle()
        .listening()
        .await
        .expect("server failed to listen");

    RunningServer {
        server,
        addr,
        token,
        run,
        client,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

async fn get_root(client: reqwest::Client, addr: SocketAddr) -> reqwest::Result<String> {
    client
        .get(format!("http://{addr}/"))
        .send()
        .await?
        .text()
        .await
}

/// Issue `GET /` in the background.
pub fn spawn_request(
    client: &reqwest::Client,
    addr: SocketAddr,
) -> JoinHandle<reqwest::Result<String>> {
    tokio::spawn(get_root(client.clone(), addr))
}

/// Wait until the server reports `count` requests in flight.
pub async fn wait_in_flight(server: &HttpServer, count: u64) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while server.in_flight() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("requests never reached the server");
}
