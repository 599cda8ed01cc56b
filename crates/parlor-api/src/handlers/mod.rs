//! Thin axum adapters over the services: extract, call, wrap in JSON.

pub mod conversations;
pub mod invites;
pub mod messages;
pub mod polls;

use axum::{
    Router, middleware,
    routing::{delete, get, patch, post},
};

use crate::auth;
use crate::middleware::require_auth;
use crate::state::AppState;

/// Every REST route: auth is public, everything else needs a bearer token.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route(
            "/conversations",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/conversations/{id}",
            get(conversations::get_one)
                .patch(conversations::update)
                .delete(conversations::remove),
        )
        .route("/conversations/{id}/join", post(conversations::join))
        .route("/conversations/{id}/leave", post(conversations::leave))
        .route(
            "/conversations/{id}/participants",
            post(conversations::add_participants),
        )
        .route(
            "/conversations/{id}/participants/{user_id}",
            delete(conversations::remove_participant),
        )
        .route("/conversations/{id}/roles", patch(conversations::update_role))
        .route("/conversations/{id}/messages", get(messages::list))
        .route("/conversations/{id}/pins", get(messages::list_pins))
        .route("/messages", post(messages::create))
        .route(
            "/messages/{id}",
            get(messages::get_one)
                .patch(messages::update)
                .delete(messages::remove),
        )
        .route("/messages/{id}/thread", get(messages::thread))
        .route("/messages/{id}/receipts", get(messages::list_receipts))
        .route("/messages/{id}/receipt", patch(messages::mark_receipt))
        .route("/receipts/{id}", patch(messages::update_receipt))
        .route("/messages/{id}/reactions", post(messages::add_reaction))
        .route(
            "/messages/{id}/reactions/{reaction}",
            delete(messages::remove_reaction),
        )
        .route(
            "/messages/{id}/pin",
            post(messages::pin).delete(messages::unpin),
        )
        .route("/polls/{id}/votes", post(polls::vote))
        .route("/polls/{id}/results", get(polls::results))
        .route("/polls/{id}/close", post(polls::close))
        .route("/game-invites/{id}/respond", post(invites::respond))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
