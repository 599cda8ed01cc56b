use anyhow::Result;
use parlor_types::models::PinnedMessage;
use rusqlite::{Row, params};
use uuid::Uuid;

use crate::row::{self, ts};
use crate::{Database, OptionalExt};

impl Database {
    pub fn count_pins(&self, conversation_id: Uuid) -> Result<u32> {
        self.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM pinned_messages WHERE conversation_id = ?1",
                [conversation_id.to_string()],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    pub fn get_pin(&self, conversation_id: Uuid, message_id: Uuid) -> Result<Option<PinnedMessage>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, conversation_id, message_id, pinned_by, pinned_at FROM pinned_messages
                 WHERE conversation_id = ?1 AND message_id = ?2",
                [conversation_id.to_string(), message_id.to_string()],
                map_pin,
            )
            .optional()
        })
    }

    pub fn insert_pin(&self, pin: &PinnedMessage) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO pinned_messages (id, conversation_id, message_id, pinned_by, pinned_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    pin.id.to_string(),
                    pin.conversation_id.to_string(),
                    pin.message_id.to_string(),
                    pin.pinned_by.to_string(),
                    ts(pin.pinned_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn delete_pin(&self, conversation_id: Uuid, message_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM pinned_messages WHERE conversation_id = ?1 AND message_id = ?2",
                [conversation_id.to_string(), message_id.to_string()],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn list_pins(&self, conversation_id: Uuid) -> Result<Vec<PinnedMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, message_id, pinned_by, pinned_at FROM pinned_messages
                 WHERE conversation_id = ?1 ORDER BY pinned_at DESC",
            )?;
            let rows = stmt
                .query_map([conversation_id.to_string()], map_pin)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_pin(row: &Row) -> rusqlite::Result<PinnedMessage> {
    Ok(PinnedMessage {
        id: row::uuid(row, 0)?,
        conversation_id: row::uuid(row, 1)?,
        message_id: row::uuid(row, 2)?,
        pinned_by: row::uuid(row, 3)?,
        pinned_at: row::time(row, 4)?,
    })
}
