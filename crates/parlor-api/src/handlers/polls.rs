use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use parlor_types::api::{Claims, VoteRequest};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::polls;

pub async fn vote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(polls::vote_poll(&state, id, req.option_id, claims.sub).await?))
}

pub async fn results(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(polls::get_poll_results(&state, id, claims.sub)?))
}

pub async fn close(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(polls::close_poll(&state, id, claims.sub).await?))
}
