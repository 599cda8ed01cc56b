use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use parlor_types::events::GatewayEvent;
use parlor_types::models::{MessageReceipt, ReceiptStatus};

use crate::access::{live_message, message_context, visible_message};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Advance the caller's own receipt for a message.
pub async fn mark_receipt(
    state: &AppState,
    message_id: Uuid,
    user_id: Uuid,
    status: ReceiptStatus,
) -> ApiResult<MessageReceipt> {
    let message = visible_message(state, message_id, Utc::now())?;
    let receipt = state
        .db
        .get_receipt_for(message_id, user_id)?
        .ok_or_else(|| ApiError::not_found("Receipt"))?;
    let (message, _, _) = message_context(state, message, user_id)?;
    advance(state, receipt, message.sender_id, status).await
}

/// Advance a receipt by id. Only the receipt's own user may touch it, and
/// only while still a participant.
pub async fn update_receipt(
    state: &AppState,
    receipt_id: Uuid,
    user_id: Uuid,
    status: ReceiptStatus,
) -> ApiResult<MessageReceipt> {
    let receipt = state
        .db
        .get_receipt(receipt_id)?
        .ok_or_else(|| ApiError::not_found("Receipt"))?;
    if receipt.user_id != user_id {
        return Err(ApiError::Forbidden("You can only update your own receipts".into()));
    }
    let message = visible_message(state, receipt.message_id, Utc::now())?;
    let (message, _, _) = message_context(state, message, user_id)?;
    advance(state, receipt, message.sender_id, status).await
}

/// Every receipt of a message, for participants of its conversation.
pub fn list_receipts(state: &AppState, message_id: Uuid, user_id: Uuid) -> ApiResult<Vec<MessageReceipt>> {
    let message = live_message(state, message_id)?;
    message_context(state, message, user_id)?;
    Ok(state.db.list_receipts(message_id)?)
}

/// Apply `status` if it moves the receipt forward; otherwise hand the
/// receipt back untouched. An applied change notifies the message sender.
async fn advance(
    state: &AppState,
    mut receipt: MessageReceipt,
    sender_id: Uuid,
    status: ReceiptStatus,
) -> ApiResult<MessageReceipt> {
    let now = Utc::now();
    if !apply_transition(&mut receipt, status, now) {
        debug!(
            "Ignoring {} for receipt {} already at {}",
            status, receipt.id, receipt.status
        );
        return Ok(receipt);
    }

    state.db.update_receipt(&receipt)?;

    if sender_id != receipt.user_id {
        state
            .dispatcher
            .send_to_user(
                sender_id,
                GatewayEvent::ReceiptUpdated {
                    message_id: receipt.message_id,
                    user_id: receipt.user_id,
                    status: receipt.status,
                },
            )
            .await;
    }

    Ok(receipt)
}

/// Move `receipt` forward to `status`. Returns false, leaving the receipt
/// unchanged, when that would not be a step forward.
pub fn apply_transition(receipt: &mut MessageReceipt, status: ReceiptStatus, now: DateTime<Utc>) -> bool {
    if status <= receipt.status {
        return false;
    }
    receipt.status = status;
    receipt.delivered_at.get_or_insert(now);
    if status == ReceiptStatus::Read {
        receipt.read_at = Some(now);
    }
    receipt.updated_at = now;
    true
}
