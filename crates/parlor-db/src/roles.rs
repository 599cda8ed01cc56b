use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use parlor_types::models::{ConversationRole, Role};
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::conversations::delete_member;
use crate::row::{self, ts};
use crate::{Database, OptionalExt};

impl Database {
    pub fn get_role(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Option<Role>> {
        self.with_conn(|conn| query_role(conn, conversation_id, user_id))
    }

    pub fn list_roles(&self, conversation_id: Uuid) -> Result<Vec<ConversationRole>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT conversation_id, user_id, role, updated_at FROM conversation_roles
                 WHERE conversation_id = ?1",
            )?;
            let rows = stmt
                .query_map([conversation_id.to_string()], |row| {
                    Ok(ConversationRole {
                        conversation_id: row::uuid(row, 0)?,
                        user_id: row::uuid(row, 1)?,
                        role: row::enumeration(row, 2)?,
                        updated_at: row::time(row, 3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_role(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        role: Role,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn(|conn| update_role(conn, conversation_id, user_id, role, at))
    }

    /// Earliest-joined participant currently holding `role`.
    pub fn first_with_role(&self, conversation_id: Uuid, role: Role) -> Result<Option<Uuid>> {
        self.with_conn(|conn| query_first_with_role(conn, conversation_id, role))
    }

    /// Move ownership from `from` to `to`: `to` becomes owner and `from`
    /// becomes admin, both rows written in one transaction.
    pub fn transfer_ownership(
        &self,
        conversation_id: Uuid,
        from: Uuid,
        to: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            update_role(&tx, conversation_id, to, Role::Owner, at)?;
            update_role(&tx, conversation_id, from, Role::Admin, at)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Promote the earliest-joined admin to owner and remove `owner` from the
    /// conversation in one transaction. The admin is chosen inside the
    /// transaction; returns None, writing nothing, when there is no admin.
    pub fn hand_over_and_leave(
        &self,
        conversation_id: Uuid,
        owner: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Uuid>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let Some(successor) = query_first_with_role(&tx, conversation_id, Role::Admin)? else {
                return Ok(None);
            };
            update_role(&tx, conversation_id, successor, Role::Owner, at)?;
            delete_member(&tx, conversation_id, owner)?;
            tx.commit()?;
            Ok(Some(successor))
        })
    }
}

fn query_first_with_role(conn: &Connection, conversation_id: Uuid, role: Role) -> Result<Option<Uuid>> {
    conn.query_row(
        "SELECT r.user_id FROM conversation_roles r
         JOIN conversation_participants p
            ON p.conversation_id = r.conversation_id AND p.user_id = r.user_id
         WHERE r.conversation_id = ?1 AND r.role = ?2
         ORDER BY p.joined_at ASC, p.rowid ASC
         LIMIT 1",
        params![conversation_id.to_string(), role.as_str()],
        |row| row::uuid(row, 0),
    )
    .optional()
}

fn query_role(conn: &Connection, conversation_id: Uuid, user_id: Uuid) -> Result<Option<Role>> {
    conn.query_row(
        "SELECT role FROM conversation_roles WHERE conversation_id = ?1 AND user_id = ?2",
        [conversation_id.to_string(), user_id.to_string()],
        |row| row::enumeration(row, 0),
    )
    .optional()
}

fn update_role(
    conn: &Connection,
    conversation_id: Uuid,
    user_id: Uuid,
    role: Role,
    at: DateTime<Utc>,
) -> Result<()> {
    let changed = conn.execute(
        "UPDATE conversation_roles SET role = ?3, updated_at = ?4
         WHERE conversation_id = ?1 AND user_id = ?2",
        params![conversation_id.to_string(), user_id.to_string(), role.as_str(), ts(at)],
    )?;
    if changed == 0 {
        return Err(anyhow!("No role row for {} in {}", user_id, conversation_id));
    }
    Ok(())
}
