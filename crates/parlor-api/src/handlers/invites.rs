use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use parlor_types::api::{Claims, RespondGameInviteRequest};

use crate::error::ApiResult;
use crate::invites as service;
use crate::state::AppState;

pub async fn respond(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RespondGameInviteRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        service::respond_to_game_invite(&state, id, req.status, claims.sub).await?,
    ))
}
