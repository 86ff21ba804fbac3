//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use route_dispatch::config::{HeaderRuleConfig, ProxyConfig, RouteConfig};
use route_dispatch::lifecycle::Shutdown;
use route_dispatch::routing::{HeaderMatchMode, SharedRouteTable};
use route_dispatch::HttpServer;

pub fn route(name: &str, path_prefix: &str, headers: Vec<HeaderRuleConfig>) -> RouteConfig {
    RouteConfig {
        name: name.into(),
        host: None,
        path_prefix: Some(path_prefix.into()),
        cluster: format!("{name}-cluster"),
        priority: 0,
        headers,
    }
}

pub fn rule(name: &str, values: &[&str], mode: HeaderMatchMode, case_sensitive: bool) -> HeaderRuleConfig {
    HeaderRuleConfig {
        name: name.into(),
        values: values.iter().map(|v| v.to_string()).collect(),
        mode,
        case_sensitive,
    }
}

/// A running dispatch server and the handles to drive it.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub updates: mpsc::UnboundedSender<ProxyConfig>,
    pub shutdown: Shutdown,
    pub routes: Arc<SharedRouteTable>,
}

impl TestServer {
    #[allow(dead_code)]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start a server for `routes` on an ephemeral port.
#[allow(dead_code)]
pub async fn start_server(routes: Vec<RouteConfig>) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = ProxyConfig::default();
    config.listener.bind_address = addr.to_string();
    config.routes = routes;

    let shutdown = Shutdown::new();
    let (updates, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    assert_eq!(server.config().listener.bind_address, addr.to_string());
    let routes = server.routes();
    let signal = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, signal).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer {
        addr,
        updates,
        shutdown,
        routes,
    }
}
