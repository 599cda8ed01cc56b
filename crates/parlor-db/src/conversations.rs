use anyhow::Result;
use chrono::{DateTime, Utc};
use parlor_types::models::{
    Conversation, ConversationMember, ConversationSettings, ConversationType, Role,
};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::row::{self, ts};
use crate::{Database, OptionalExt};

const CONVERSATION_COLUMNS: &str = "c.id, c.name, c.description, c.type, c.created_by,
    c.allows_media, c.allows_replies, c.allows_reactions, c.is_moderated, c.is_read_only,
    c.slow_mode, c.max_participants, c.is_active, c.is_public, c.created_at, c.updated_at";

impl Database {
    // -- Conversations --

    /// Insert a conversation together with its initial participants and
    /// their roles in one transaction.
    pub fn insert_conversation(
        &self,
        conversation: &Conversation,
        members: &[(Uuid, Role)],
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let s = &conversation.settings;
            tx.execute(
                "INSERT INTO conversations (id, name, description, type, created_by,
                    allows_media, allows_replies, allows_reactions, is_moderated, is_read_only,
                    slow_mode, max_participants, is_active, is_public, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    conversation.id.to_string(),
                    conversation.name,
                    conversation.description,
                    conversation.conversation_type.as_str(),
                    conversation.created_by.to_string(),
                    s.allows_media,
                    s.allows_replies,
                    s.allows_reactions,
                    s.is_moderated,
                    s.is_read_only,
                    s.slow_mode,
                    s.max_participants,
                    conversation.is_active,
                    conversation.is_public,
                    ts(conversation.created_at),
                    ts(conversation.updated_at),
                ],
            )?;
            insert_members(&tx, conversation.id, members, conversation.created_at)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM conversations c WHERE c.id = ?1", CONVERSATION_COLUMNS);
            conn.query_row(&sql, [id.to_string()], map_conversation).optional()
        })
    }

    /// Active direct conversation between exactly these two users, if any.
    pub fn find_direct_conversation(&self, a: Uuid, b: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM conversations c
                 WHERE c.type = 'direct' AND c.is_active = 1
                   AND EXISTS (SELECT 1 FROM conversation_participants p
                               WHERE p.conversation_id = c.id AND p.user_id = ?1)
                   AND EXISTS (SELECT 1 FROM conversation_participants p
                               WHERE p.conversation_id = c.id AND p.user_id = ?2)
                 ORDER BY c.created_at ASC
                 LIMIT 1",
                CONVERSATION_COLUMNS
            );
            conn.query_row(&sql, [a.to_string(), b.to_string()], map_conversation)
                .optional()
        })
    }

    /// Active conversations the user participates in, most recently active first.
    pub fn list_conversations_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM conversations c
                 JOIN conversation_participants p ON p.conversation_id = c.id
                 WHERE p.user_id = ?1 AND c.is_active = 1
                 ORDER BY COALESCE(
                     (SELECT MAX(m.created_at) FROM messages m WHERE m.conversation_id = c.id),
                     c.updated_at) DESC",
                CONVERSATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id.to_string()], map_conversation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Persist mutable fields. `type` and `created_by` are never rewritten.
    pub fn update_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.with_conn(|conn| {
            let s = &conversation.settings;
            conn.execute(
                "UPDATE conversations SET name = ?2, description = ?3,
                    allows_media = ?4, allows_replies = ?5, allows_reactions = ?6,
                    is_moderated = ?7, is_read_only = ?8, slow_mode = ?9, max_participants = ?10,
                    is_active = ?11, is_public = ?12, updated_at = ?13
                 WHERE id = ?1",
                params![
                    conversation.id.to_string(),
                    conversation.name,
                    conversation.description,
                    s.allows_media,
                    s.allows_replies,
                    s.allows_reactions,
                    s.is_moderated,
                    s.is_read_only,
                    s.slow_mode,
                    s.max_participants,
                    conversation.is_active,
                    conversation.is_public,
                    ts(conversation.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    // -- Participants --

    /// Participant ids in join order.
    pub fn participant_ids(&self, conversation_id: Uuid) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| query_participant_ids(conn, conversation_id))
    }

    pub fn is_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM conversation_participants
                     WHERE conversation_id = ?1 AND user_id = ?2",
                    [conversation_id.to_string(), user_id.to_string()],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn members(&self, conversation_id: Uuid) -> Result<Vec<ConversationMember>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.user_id, u.username, r.role, p.joined_at
                 FROM conversation_participants p
                 LEFT JOIN users u ON u.id = p.user_id
                 LEFT JOIN conversation_roles r
                    ON r.conversation_id = p.conversation_id AND r.user_id = p.user_id
                 WHERE p.conversation_id = ?1
                 ORDER BY p.joined_at ASC",
            )?;
            let rows = stmt
                .query_map([conversation_id.to_string()], |row| {
                    let role: Option<String> = row.get(2)?;
                    Ok(ConversationMember {
                        user_id: row::uuid(row, 0)?,
                        username: row
                            .get::<_, Option<String>>(1)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        role: role.and_then(|r| r.parse().ok()).unwrap_or(Role::Member),
                        joined_at: row::time(row, 3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn add_participants(
        &self,
        conversation_id: Uuid,
        members: &[(Uuid, Role)],
        joined_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_members(&tx, conversation_id, members, joined_at)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Remove the participant row and its role row together.
    /// Returns false if the user was not a participant.
    pub fn remove_participant(&self, conversation_id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = delete_member(&tx, conversation_id, user_id)?;
            tx.commit()?;
            Ok(removed)
        })
    }
}

pub(crate) fn insert_members(
    conn: &Connection,
    conversation_id: Uuid,
    members: &[(Uuid, Role)],
    joined_at: DateTime<Utc>,
) -> Result<()> {
    let cid = conversation_id.to_string();
    let at = ts(joined_at);
    for (user_id, role) in members {
        let uid = user_id.to_string();
        conn.execute(
            "INSERT INTO conversation_participants (conversation_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            params![cid, uid, at],
        )?;
        conn.execute(
            "INSERT INTO conversation_roles (conversation_id, user_id, role, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(conversation_id, user_id) DO UPDATE SET role = excluded.role,
                updated_at = excluded.updated_at",
            params![cid, uid, role.as_str(), at],
        )?;
    }
    Ok(())
}

pub(crate) fn delete_member(conn: &Connection, conversation_id: Uuid, user_id: Uuid) -> Result<bool> {
    let cid = conversation_id.to_string();
    let uid = user_id.to_string();
    let removed = conn.execute(
        "DELETE FROM conversation_participants WHERE conversation_id = ?1 AND user_id = ?2",
        params![cid, uid],
    )?;
    conn.execute(
        "DELETE FROM conversation_roles WHERE conversation_id = ?1 AND user_id = ?2",
        params![cid, uid],
    )?;
    Ok(removed > 0)
}

pub(crate) fn query_participant_ids(conn: &Connection, conversation_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT user_id FROM conversation_participants
         WHERE conversation_id = ?1
         ORDER BY joined_at ASC, rowid ASC",
    )?;
    let ids = stmt
        .query_map([conversation_id.to_string()], |row| row::uuid(row, 0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn map_conversation(row: &Row) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row::uuid(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        conversation_type: row::enumeration::<ConversationType>(row, 3)?,
        created_by: row::uuid(row, 4)?,
        settings: ConversationSettings {
            allows_media: row.get(5)?,
            allows_replies: row.get(6)?,
            allows_reactions: row.get(7)?,
            is_moderated: row.get(8)?,
            is_read_only: row.get(9)?,
            slow_mode: row.get(10)?,
            max_participants: row.get(11)?,
        },
        is_active: row.get(12)?,
        is_public: row.get(13)?,
        created_at: row::time(row, 14)?,
        updated_at: row::time(row, 15)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{conversation, user};

    #[test]
    fn direct_lookup_ignores_argument_order() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "ana");
        let b = user(&db, "ben");
        let c = user(&db, "cy");
        let direct = conversation(&db, ConversationType::Direct, &[(a, Role::Owner), (b, Role::Member)]);

        let found = db.find_direct_conversation(b, a).unwrap().expect("found");
        assert_eq!(found.id, direct.id);
        assert!(db.find_direct_conversation(a, c).unwrap().is_none());
    }

    #[test]
    fn remove_participant_drops_role_row() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "ana");
        let b = user(&db, "ben");
        let group = conversation(&db, ConversationType::Group, &[(a, Role::Owner), (b, Role::Member)]);

        assert!(db.remove_participant(group.id, b).unwrap());
        assert!(!db.is_participant(group.id, b).unwrap());
        assert!(db.get_role(group.id, b).unwrap().is_none());
        assert!(!db.remove_participant(group.id, b).unwrap());
        assert_eq!(db.participant_ids(group.id).unwrap(), vec![a]);
    }

    #[test]
    fn members_carry_roles_in_join_order() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "ana");
        let b = user(&db, "ben");
        let group = conversation(&db, ConversationType::Group, &[(a, Role::Owner), (b, Role::Admin)]);

        let members = db.members(group.id).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].username, "ana");
        assert_eq!(members[0].role, Role::Owner);
        assert_eq!(members[1].role, Role::Admin);
    }
}
