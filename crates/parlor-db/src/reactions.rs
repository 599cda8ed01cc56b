use anyhow::Result;
use parlor_types::models::MessageReaction;
use rusqlite::{Row, params};
use uuid::Uuid;

use crate::row::{self, placeholders, ts};
use crate::{Database, OptionalExt};

impl Database {
    pub fn find_reaction(
        &self,
        message_id: Uuid,
        user_id: Uuid,
        reaction: &str,
    ) -> Result<Option<MessageReaction>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, message_id, user_id, reaction, created_at FROM message_reactions
                 WHERE message_id = ?1 AND user_id = ?2 AND reaction = ?3",
                params![message_id.to_string(), user_id.to_string(), reaction],
                map_reaction,
            )
            .optional()
        })
    }

    pub fn insert_reaction(&self, reaction: &MessageReaction) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message_reactions (id, message_id, user_id, reaction, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    reaction.id.to_string(),
                    reaction.message_id.to_string(),
                    reaction.user_id.to_string(),
                    reaction.reaction,
                    ts(reaction.created_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Returns false if there was nothing to remove.
    pub fn delete_reaction(&self, message_id: Uuid, user_id: Uuid, reaction: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM message_reactions
                 WHERE message_id = ?1 AND user_id = ?2 AND reaction = ?3",
                params![message_id.to_string(), user_id.to_string(), reaction],
            )?;
            Ok(removed > 0)
        })
    }

    /// Batch-fetch reactions for a set of message IDs.
    pub fn reactions_for_messages(&self, message_ids: &[Uuid]) -> Result<Vec<MessageReaction>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, message_id, user_id, reaction, created_at FROM message_reactions
                 WHERE message_id IN ({}) ORDER BY created_at ASC",
                placeholders(message_ids.len(), 1)
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<String> = message_ids.iter().map(Uuid::to_string).collect();
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_reaction)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_reaction(row: &Row) -> rusqlite::Result<MessageReaction> {
    Ok(MessageReaction {
        id: row::uuid(row, 0)?,
        message_id: row::uuid(row, 1)?,
        user_id: row::uuid(row, 2)?,
        reaction: row.get(3)?,
        created_at: row::time(row, 4)?,
    })
}
