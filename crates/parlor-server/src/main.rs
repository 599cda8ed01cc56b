mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use parlor_api::analytics::Analytics;
use parlor_api::auth::verify_token;
use parlor_api::moderation::ModerationGate;
use parlor_api::{ApiResult, AppState, AppStateInner};
use parlor_gateway::{Dispatcher, connection};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parlor=debug,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let db = parlor_db::Database::open(&config.db_path)?;
    let moderation = moderation_gate(&config)?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher: Dispatcher::new(),
        moderation,
        analytics: Analytics::spawn(),
        jwt_secret: config.jwt_secret.clone(),
    });

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state.clone());

    let app = parlor_api::handlers::router(state)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Parlor server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn moderation_gate(config: &ServerConfig) -> anyhow::Result<ModerationGate> {
    if let Some(url) = &config.moderation_url {
        info!("Moderating through {}", url);
        return ModerationGate::remote(url.clone());
    }
    if config.blocked_words.is_empty() && config.flagged_words.is_empty() {
        info!("No moderation classifier configured; moderated conversations accept everything");
        return Ok(ModerationGate::Disabled);
    }
    info!(
        "Keyword moderation: {} blocked, {} flagged",
        config.blocked_words.len(),
        config.flagged_words.len()
    );
    Ok(ModerationGate::keywords(
        &config.blocked_words,
        &config.flagged_words,
    ))
}

#[derive(Deserialize)]
struct GatewayQuery {
    token: String,
}

/// Browsers cannot set headers on a WebSocket handshake, so the token
/// travels in the query string and is checked before the upgrade.
async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<GatewayQuery>,
    ws: WebSocketUpgrade,
) -> ApiResult<impl IntoResponse> {
    let claims = verify_token(&state.jwt_secret, &query.token)?;
    let dispatcher = state.dispatcher.clone();

    Ok(ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, dispatcher, claims.sub, claims.username)
    }))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
