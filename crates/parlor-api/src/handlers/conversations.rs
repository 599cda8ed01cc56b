use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use parlor_types::api::{
    AddParticipantsRequest, Claims, CreateConversationRequest, UpdateConversationRequest,
    UpdateRoleRequest,
};

use crate::conversations as service;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service::list_conversations(&state, claims.sub)?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    let conversation = service::create_conversation(&state, claims.sub, req).await?;
    let detail = service::detail(&state, conversation)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service::get_conversation(&state, id, claims.sub)?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        service::update_conversation(&state, id, claims.sub, req).await?,
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    service::remove_conversation(&state, id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let conversation = service::join_conversation(&state, id, claims.sub).await?;
    Ok(Json(service::detail(&state, conversation)?))
}

pub async fn leave(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    service::leave_conversation(&state, id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_participants(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddParticipantsRequest>,
) -> ApiResult<impl IntoResponse> {
    service::add_participants(&state, id, claims.sub, req).await?;
    Ok(Json(service::get_conversation(&state, id, claims.sub)?))
}

pub async fn remove_participant(
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    service::remove_participant(&state, id, claims.sub, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    service::update_conversation_role(&state, id, claims.sub, req).await?;
    Ok(Json(service::get_conversation(&state, id, claims.sub)?))
}
