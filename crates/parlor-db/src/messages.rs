use anyhow::Result;
use chrono::{DateTime, Utc};
use parlor_types::models::{
    GameInvite, Message, MessageReceipt, Poll, PollOption, SharedGameItem,
};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::row::{self, opt_ts, ts};
use crate::{Database, OptionalExt};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, content, type, priority,
    reply_to_id, media_url, metadata, is_edited, edited_at, is_deleted, deleted_at,
    is_moderated, moderation_reason, is_scheduled, scheduled_for, mentioned_user_ids,
    mentions_everyone, created_at, updated_at";

/// Rows created together with a message of the matching type.
#[derive(Debug, Clone)]
pub enum MessageAttachment {
    Poll(Poll, Vec<PollOption>),
    GameInvite(GameInvite),
    GameItem(SharedGameItem),
}

impl Database {
    /// Persist a message, one receipt per recipient, and its attachment in a
    /// single transaction. Nothing is written if any statement fails.
    pub fn insert_message(
        &self,
        message: &Message,
        receipts: &[MessageReceipt],
        attachment: Option<&MessageAttachment>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_message_row(&tx, message)?;
            for receipt in receipts {
                crate::receipts::insert_receipt(&tx, receipt)?;
            }
            match attachment {
                Some(MessageAttachment::Poll(poll, options)) => {
                    crate::polls::insert_poll(&tx, poll, options)?
                }
                Some(MessageAttachment::GameInvite(invite)) => {
                    crate::invites::insert_invite(&tx, invite)?
                }
                Some(MessageAttachment::GameItem(item)) => {
                    crate::invites::insert_game_item(&tx, item)?
                }
                None => {}
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
            conn.query_row(&sql, [id.to_string()], map_message).optional()
        })
    }

    /// One page of messages visible at `now`, newest first. Deleted messages
    /// and scheduled messages that are not yet due are excluded.
    pub fn list_visible_messages(
        &self,
        conversation_id: Uuid,
        now: DateTime<Utc>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages
                 WHERE conversation_id = ?1
                   AND is_deleted = 0
                   AND (is_scheduled = 0 OR scheduled_for IS NULL OR scheduled_for <= ?2)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3 OFFSET ?4",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![conversation_id.to_string(), ts(now), limit, offset],
                    map_message,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Creation time of the sender's most recent non-system message in the
    /// conversation. Used by slow mode.
    pub fn last_message_at(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT created_at FROM messages
                 WHERE conversation_id = ?1 AND sender_id = ?2 AND type != 'system'
                 ORDER BY created_at DESC
                 LIMIT 1",
                [conversation_id.to_string(), sender_id.to_string()],
                |row| row::time(row, 0),
            )
            .optional()
        })
    }

    /// Write the editable fields and moderation state of a message.
    pub fn update_message(&self, message: &Message) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET content = ?2, type = ?3, priority = ?4, media_url = ?5,
                    metadata = ?6, is_edited = ?7, edited_at = ?8, is_moderated = ?9,
                    moderation_reason = ?10, updated_at = ?11
                 WHERE id = ?1",
                params![
                    message.id.to_string(),
                    message.content,
                    message.message_type.as_str(),
                    message.priority.as_str(),
                    message.media_url,
                    message.metadata.as_ref().map(|m| m.to_string()),
                    message.is_edited,
                    opt_ts(message.edited_at),
                    message.is_moderated,
                    message.moderation_reason,
                    ts(message.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Replace content with the tombstone and drop media/metadata. The row
    /// and everything hanging off it stays in place.
    pub fn soft_delete_message(&self, id: Uuid, tombstone: &str, at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET content = ?2, media_url = NULL, metadata = NULL,
                    is_deleted = 1, deleted_at = ?3, updated_at = ?3
                 WHERE id = ?1",
                params![id.to_string(), tombstone, ts(at)],
            )?;
            Ok(())
        })
    }
}

fn insert_message_row(conn: &Connection, m: &Message) -> Result<()> {
    let mentions = serde_json::to_string(&m.mentioned_user_ids)?;
    conn.execute(
        "INSERT INTO messages (id, conversation_id, sender_id, content, type, priority,
            reply_to_id, media_url, metadata, is_edited, edited_at, is_deleted, deleted_at,
            is_moderated, moderation_reason, is_scheduled, scheduled_for, mentioned_user_ids,
            mentions_everyone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                 ?18, ?19, ?20, ?21)",
        params![
            m.id.to_string(),
            m.conversation_id.to_string(),
            m.sender_id.to_string(),
            m.content,
            m.message_type.as_str(),
            m.priority.as_str(),
            m.reply_to_id.map(|id| id.to_string()),
            m.media_url,
            m.metadata.as_ref().map(|v| v.to_string()),
            m.is_edited,
            opt_ts(m.edited_at),
            m.is_deleted,
            opt_ts(m.deleted_at),
            m.is_moderated,
            m.moderation_reason,
            m.is_scheduled,
            opt_ts(m.scheduled_for),
            mentions,
            m.mentions_everyone,
            ts(m.created_at),
            ts(m.updated_at),
        ],
    )?;
    Ok(())
}

fn map_message(row: &Row) -> rusqlite::Result<Message> {
    let mentions: String = row.get(17)?;
    let mentioned_user_ids: Vec<Uuid> = serde_json::from_str(&mentions).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(17, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Message {
        id: row::uuid(row, 0)?,
        conversation_id: row::uuid(row, 1)?,
        sender_id: row::uuid(row, 2)?,
        content: row.get(3)?,
        message_type: row::enumeration(row, 4)?,
        priority: row::enumeration(row, 5)?,
        reply_to_id: row::opt_uuid(row, 6)?,
        media_url: row.get(7)?,
        metadata: row::opt_json(row, 8)?,
        is_edited: row.get(9)?,
        edited_at: row::opt_time(row, 10)?,
        is_deleted: row.get(11)?,
        deleted_at: row::opt_time(row, 12)?,
        is_moderated: row.get(13)?,
        moderation_reason: row.get(14)?,
        is_scheduled: row.get(15)?,
        scheduled_for: row::opt_time(row, 16)?,
        mentioned_user_ids,
        mentions_everyone: row.get(18)?,
        created_at: row::time(row, 19)?,
        updated_at: row::time(row, 20)?,
    })
}
