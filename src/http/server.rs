//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Dispatch every request against the current route table snapshot
//! - Apply configuration updates by publishing new snapshots

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::request::{MakeRequestUuid, RequestIdExt, X_REQUEST_ID};
use crate::http::response::DispatchDecision;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::routing::{RouteTable, SharedRouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<SharedRouteTable>,
}

/// HTTP front end of the dispatcher.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    routes: Arc<SharedRouteTable>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let report = RouteTable::from_config(&config.routes);
        metrics::record_reload(report.table.len(), report.rejected.len());
        tracing::info!(
            routes = report.table.len(),
            rejected = report.rejected.len(),
            "Route table built"
        );

        let routes = Arc::new(SharedRouteTable::new(report.table));
        let state = AppState {
            routes: routes.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            routes,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    ///
    /// Every config received on `config_updates` is rebuilt against the live
    /// table and published; in-flight requests finish on their snapshot.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        tokio::spawn(apply_updates(
            self.routes.clone(),
            self.config.clone(),
            config_updates,
            shutdown.clone(),
        ));

        let mut shutdown = shutdown;
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.recv().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config the server was started with.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Shared handle to the live route table.
    pub fn routes(&self) -> Arc<SharedRouteTable> {
        self.routes.clone()
    }
}

async fn apply_updates(
    routes: Arc<SharedRouteTable>,
    mut current: ProxyConfig,
    mut updates: mpsc::UnboundedReceiver<ProxyConfig>,
    mut shutdown: ShutdownSignal,
) {
    loop {
        let config = tokio::select! {
            update = updates.recv() => match update {
                Some(config) => config,
                None => break,
            },
            _ = shutdown.recv() => break,
        };

        if config.listener != current.listener {
            tracing::warn!("Listener settings changed; restart required to apply them");
        }

        let outcome = routes.reload(&config.routes);
        metrics::record_reload(outcome.routes, outcome.rejected.len());
        current = config;
    }
    tracing::debug!("Config update task stopped");
}

/// Dispatch handler: picks a route and reports the decision.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let snapshot = state.routes.load();
    let request_id = request.request_id();

    let decision = match snapshot.table.match_request(&request) {
        Some(route) => {
            tracing::debug!(
                request_id = %request_id,
                path = %request.uri().path(),
                route = %route.name(),
                cluster = %route.cluster(),
                "Route selected"
            );
            metrics::record_dispatch(Some(route.name()), start);
            DispatchDecision::matched(request_id, snapshot.version, route)
        }
        None => {
            tracing::warn!(request_id = %request_id, path = %request.uri().path(), "No route matched");
            metrics::record_dispatch(None, start);
            DispatchDecision::no_match(request_id, snapshot.version)
        }
    };

    decision.into_response()
}
