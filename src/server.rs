use axum::body::Body;
use axum::http::{HeaderValue, Request};
use axum::middleware::{from_fn, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, Instrument};

use crate::commands::{health, score, wallet, AppState};
use crate::config::ServerConfig;
use crate::error::AppResult;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/score",
            post(score::score_github_user).options(score::score_preflight),
        )
        .route(
            "/api/github-score",
            post(score::score_github_user).options(score::score_preflight),
        )
        .route(
            "/wallets/:address/score",
            get(wallet::wallet_score_fetch).delete(wallet::wallet_score_clear),
        )
        .route("/healthz", get(health::healthz))
        .with_state(state)
        .layer(from_fn(cors_middleware))
        .layer(from_fn(request_tracing_middleware))
}

async fn cors_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("Content-Type"),
    );
    response
}

async fn request_tracing_middleware(request: Request<Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.len() <= 128)
        .map(ToString::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %request.method(),
        route = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Serve until ctrl-c.
pub async fn serve(config: ServerConfig) -> AppResult<()> {
    let state = AppState::new(&config)?;
    if !state.scores().has_github_token() {
        tracing::warn!(target: "app::config", "GitHub token missing; score requests will fail");
    }

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(target: "app::server", addr = %listener.local_addr()?, "listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(target: "app::server", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(target: "app::server", error = %error, "failed to listen for shutdown signal");
    }
}
