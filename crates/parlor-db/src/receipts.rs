use anyhow::Result;
use chrono::{DateTime, Utc};
use parlor_types::models::{MessageReceipt, ReceiptStatus};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::row::{self, opt_ts, placeholders, ts};
use crate::{Database, OptionalExt};

const RECEIPT_COLUMNS: &str =
    "id, message_id, user_id, status, delivered_at, read_at, created_at, updated_at";

impl Database {
    pub fn get_receipt(&self, id: Uuid) -> Result<Option<MessageReceipt>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM message_receipts WHERE id = ?1", RECEIPT_COLUMNS);
            conn.query_row(&sql, [id.to_string()], map_receipt).optional()
        })
    }

    pub fn get_receipt_for(&self, message_id: Uuid, user_id: Uuid) -> Result<Option<MessageReceipt>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM message_receipts WHERE message_id = ?1 AND user_id = ?2",
                RECEIPT_COLUMNS
            );
            conn.query_row(&sql, [message_id.to_string(), user_id.to_string()], map_receipt)
                .optional()
        })
    }

    pub fn list_receipts(&self, message_id: Uuid) -> Result<Vec<MessageReceipt>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM message_receipts WHERE message_id = ?1 ORDER BY created_at ASC",
                RECEIPT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([message_id.to_string()], map_receipt)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Write status and timestamps. The caller decides whether the
    /// transition is forward; this never compares statuses.
    pub fn update_receipt(&self, receipt: &MessageReceipt) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE message_receipts SET status = ?2, delivered_at = ?3, read_at = ?4,
                    updated_at = ?5
                 WHERE id = ?1",
                params![
                    receipt.id.to_string(),
                    receipt.status.as_str(),
                    opt_ts(receipt.delivered_at),
                    opt_ts(receipt.read_at),
                    ts(receipt.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Upgrade every non-read receipt of `user_id` among `message_ids` to
    /// read in one transaction. Returns the ids of messages whose receipt
    /// actually changed.
    pub fn mark_read(
        &self,
        user_id: Uuid,
        message_ids: &[Uuid],
        at: DateTime<Utc>,
    ) -> Result<Vec<Uuid>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let mut params: Vec<String> = vec![user_id.to_string()];
            params.extend(message_ids.iter().map(Uuid::to_string));
            let sql = format!(
                "SELECT message_id FROM message_receipts
                 WHERE user_id = ?1 AND status != 'read' AND message_id IN ({})",
                placeholders(message_ids.len(), 2)
            );
            let pending = {
                let mut stmt = tx.prepare(&sql)?;
                stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| row::uuid(row, 0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            };

            let at = ts(at);
            for message_id in &pending {
                tx.execute(
                    "UPDATE message_receipts
                     SET status = 'read', read_at = ?3, delivered_at = COALESCE(delivered_at, ?3),
                         updated_at = ?3
                     WHERE message_id = ?1 AND user_id = ?2",
                    params![message_id.to_string(), user_id.to_string(), at],
                )?;
            }

            tx.commit()?;
            Ok(pending)
        })
    }
}

pub(crate) fn insert_receipt(conn: &Connection, r: &MessageReceipt) -> Result<()> {
    conn.execute(
        "INSERT INTO message_receipts (id, message_id, user_id, status, delivered_at, read_at,
            created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            r.id.to_string(),
            r.message_id.to_string(),
            r.user_id.to_string(),
            r.status.as_str(),
            opt_ts(r.delivered_at),
            opt_ts(r.read_at),
            ts(r.created_at),
            ts(r.updated_at),
        ],
    )?;
    Ok(())
}

fn map_receipt(row: &Row) -> rusqlite::Result<MessageReceipt> {
    Ok(MessageReceipt {
        id: row::uuid(row, 0)?,
        message_id: row::uuid(row, 1)?,
        user_id: row::uuid(row, 2)?,
        status: row::enumeration::<ReceiptStatus>(row, 3)?,
        delivered_at: row::opt_time(row, 4)?,
        read_at: row::opt_time(row, 5)?,
        created_at: row::time(row, 6)?,
        updated_at: row::time(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{conversation, message, user};
    use parlor_types::models::{ConversationType, Role};

    #[test]
    fn mark_read_reports_only_changed_messages() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "ana");
        let b = user(&db, "ben");
        let group = conversation(&db, ConversationType::Group, &[(a, Role::Owner), (b, Role::Member)]);
        let m1 = message(&db, group.id, a, &[b]);
        let m2 = message(&db, group.id, a, &[b]);

        let first = db.mark_read(b, &[m1], Utc::now()).unwrap();
        assert_eq!(first, vec![m1]);

        let mut second = db.mark_read(b, &[m1, m2], Utc::now()).unwrap();
        second.sort();
        assert_eq!(second, vec![m2]);

        let receipt = db.get_receipt_for(m1, b).unwrap().unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Read);
        assert!(receipt.read_at.is_some());
        assert!(receipt.delivered_at.is_some());
    }

    #[test]
    fn receipts_cascade_with_message_row() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "ana");
        let b = user(&db, "ben");
        let group = conversation(&db, ConversationType::Group, &[(a, Role::Owner), (b, Role::Member)]);
        let m = message(&db, group.id, a, &[b]);
        assert_eq!(db.list_receipts(m).unwrap().len(), 1);

        db.with_conn(|conn| {
            conn.execute("DELETE FROM messages WHERE id = ?1", [m.to_string()])?;
            Ok(())
        })
        .unwrap();
        assert!(db.list_receipts(m).unwrap().is_empty());
    }
}
