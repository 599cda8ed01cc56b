use anyhow::Result;
use chrono::Utc;
use parlor_types::models::User;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::UserRow;
use crate::row::{self, placeholders, ts};
use crate::{Database, OptionalExt};

impl Database {
    pub fn create_user(&self, id: Uuid, username: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), username, password_hash, ts(Utc::now())),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                [id.to_string()],
                map_user,
            )
            .optional()
        })
    }

    /// Resolve a batch of ids; unknown ids are simply absent from the result.
    pub fn find_users(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, username, created_at FROM users WHERE id IN ({})",
                placeholders(ids.len(), 1)
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<String> = ids.iter().map(Uuid::to_string).collect();
            let rows = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_username(&self, id: Uuid) -> Result<String> {
        Ok(self
            .get_user(id)?
            .map(|u| u.username)
            .unwrap_or_else(|| "unknown".to_string()))
    }
}

fn map_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row::uuid(row, 0)?,
        username: row.get(1)?,
        created_at: row::time(row, 2)?,
    })
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row::uuid(row, 0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row::time(row, 3)?,
            })
        })
        .optional()?;

    Ok(row)
}
