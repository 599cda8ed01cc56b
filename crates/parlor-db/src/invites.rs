use anyhow::Result;
use parlor_types::models::{GameInvite, SharedGameItem};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::row::{self, opt_ts, ts};
use crate::{Database, OptionalExt};

const INVITE_COLUMNS: &str = "id, message_id, sender_id, game_type, game_room_id,
    invited_user_id, status, expires_at, responded_by, responded_at, created_at";

impl Database {
    // -- Game invites --

    pub fn get_game_invite(&self, id: Uuid) -> Result<Option<GameInvite>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM game_invites WHERE id = ?1", INVITE_COLUMNS);
            conn.query_row(&sql, [id.to_string()], map_invite).optional()
        })
    }

    pub fn get_game_invite_by_message(&self, message_id: Uuid) -> Result<Option<GameInvite>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM game_invites WHERE message_id = ?1", INVITE_COLUMNS);
            conn.query_row(&sql, [message_id.to_string()], map_invite).optional()
        })
    }

    pub fn update_game_invite(&self, invite: &GameInvite) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE game_invites SET status = ?2, responded_by = ?3, responded_at = ?4
                 WHERE id = ?1",
                params![
                    invite.id.to_string(),
                    invite.status.as_str(),
                    invite.responded_by.map(|id| id.to_string()),
                    opt_ts(invite.responded_at),
                ],
            )?;
            Ok(())
        })
    }

    // -- Shared game items --

    pub fn get_game_item_by_message(&self, message_id: Uuid) -> Result<Option<SharedGameItem>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, message_id, item_type, item_id, name, metadata, created_at
                 FROM shared_game_items WHERE message_id = ?1",
                [message_id.to_string()],
                |row| {
                    Ok(SharedGameItem {
                        id: row::uuid(row, 0)?,
                        message_id: row::uuid(row, 1)?,
                        item_type: row.get(2)?,
                        item_id: row.get(3)?,
                        name: row.get(4)?,
                        metadata: row::opt_json(row, 5)?,
                        created_at: row::time(row, 6)?,
                    })
                },
            )
            .optional()
        })
    }
}

pub(crate) fn insert_invite(conn: &Connection, invite: &GameInvite) -> Result<()> {
    conn.execute(
        "INSERT INTO game_invites (id, message_id, sender_id, game_type, game_room_id,
            invited_user_id, status, expires_at, responded_by, responded_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            invite.id.to_string(),
            invite.message_id.to_string(),
            invite.sender_id.to_string(),
            invite.game_type,
            invite.game_room_id,
            invite.invited_user_id.map(|id| id.to_string()),
            invite.status.as_str(),
            ts(invite.expires_at),
            invite.responded_by.map(|id| id.to_string()),
            opt_ts(invite.responded_at),
            ts(invite.created_at),
        ],
    )?;
    Ok(())
}

pub(crate) fn insert_game_item(conn: &Connection, item: &SharedGameItem) -> Result<()> {
    conn.execute(
        "INSERT INTO shared_game_items (id, message_id, item_type, item_id, name, metadata,
            created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            item.id.to_string(),
            item.message_id.to_string(),
            item.item_type,
            item.item_id,
            item.name,
            item.metadata.as_ref().map(|m| m.to_string()),
            ts(item.created_at),
        ],
    )?;
    Ok(())
}

fn map_invite(row: &Row) -> rusqlite::Result<GameInvite> {
    Ok(GameInvite {
        id: row::uuid(row, 0)?,
        message_id: row::uuid(row, 1)?,
        sender_id: row::uuid(row, 2)?,
        game_type: row.get(3)?,
        game_room_id: row.get(4)?,
        invited_user_id: row::opt_uuid(row, 5)?,
        status: row::enumeration(row, 6)?,
        expires_at: row::time(row, 7)?,
        responded_by: row::opt_uuid(row, 8)?,
        responded_at: row::opt_time(row, 9)?,
        created_at: row::time(row, 10)?,
    })
}
