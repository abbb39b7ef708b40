use std::{net::SocketAddr, sync::Arc};

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use hookql::{SchemaHost, SchemaState};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::AppConfig;

pub struct HookqlServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(cfg: &AppConfig, host: Arc<SchemaHost>) -> Router {
    let health = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(Arc::clone(&host));

    hookql::router(host)
        .merge(health)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(cfg.request_timeout()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(cfg.server.body_limit_bytes))
}

async fn healthz() -> &'static str {
    "ok"
}

/// Ready once the schema compiles.
async fn readyz(State(host): State<Arc<SchemaHost>>) -> (StatusCode, Json<serde_json::Value>) {
    match host.schema().await {
        Ok(schema) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "generation": schema.generation(),
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": state_label(host.schema_state()),
                "error": e.to_string(),
            })),
        ),
    }
}

fn state_label(state: SchemaState) -> &'static str {
    match state {
        SchemaState::Uninitialized => "uninitialized",
        SchemaState::Building => "building",
        SchemaState::Ready => "ready",
        SchemaState::Failed => "failed",
    }
}

pub struct ServerBuilder {
    config: AppConfig,
    host: Option<Arc<SchemaHost>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            host: None,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    /// Serves an existing host instead of creating an empty one.
    pub fn with_host(mut self, host: Arc<SchemaHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn build(self) -> anyhow::Result<HookqlServer> {
        let host = match self.host {
            Some(host) => host,
            None => Arc::new(SchemaHost::new(self.config.graphql.clone())?),
        };
        Ok(HookqlServer {
            addr: self.config.addr(),
            app: build_app(&self.config, host),
        })
    }
}

impl HookqlServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
