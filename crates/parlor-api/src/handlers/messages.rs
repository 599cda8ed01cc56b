use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use parlor_types::api::{
    AddReactionRequest, Claims, CreateMessageRequest, UpdateMessageRequest, UpdateReceiptRequest,
};

use crate::error::ApiResult;
use crate::state::AppState;
use crate::{messages as service, pins, reactions, receipts};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let messages =
        service::find_all_messages(&state, conversation_id, claims.sub, query.page, query.limit)
            .await?;
    Ok(Json(messages))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = service::create_message(&state, claims.sub, req).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service::get_message(&state, id, claims.sub)?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service::update_message(&state, id, claims.sub, req).await?))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    service::remove_message(&state, id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn thread(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(service::get_reply_chain(&state, id, claims.sub)?))
}

// -- Receipts --

pub async fn list_receipts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(receipts::list_receipts(&state, id, claims.sub)?))
}

pub async fn mark_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateReceiptRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        receipts::mark_receipt(&state, id, claims.sub, req.status).await?,
    ))
}

pub async fn update_receipt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateReceiptRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(
        receipts::update_receipt(&state, id, claims.sub, req.status).await?,
    ))
}

// -- Reactions --

pub async fn add_reaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddReactionRequest>,
) -> ApiResult<impl IntoResponse> {
    let reaction = reactions::add_reaction(&state, id, &req.reaction, claims.sub).await?;
    Ok((StatusCode::CREATED, Json(reaction)))
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    Path((id, reaction)): Path<(Uuid, String)>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    reactions::remove_reaction(&state, id, &reaction, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

// -- Pins --

pub async fn pin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let pin = pins::pin_message(&state, id, claims.sub).await?;
    Ok((StatusCode::CREATED, Json(pin)))
}

pub async fn unpin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    pins::unpin_message(&state, id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_pins(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(pins::list_pinned(&state, conversation_id, claims.sub)?))
}
