use anyhow::Result;
use chrono::{DateTime, Utc};
use parlor_types::models::{Poll, PollOption, PollVote};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use crate::row::{self, opt_ts, ts};
use crate::{Database, OptionalExt};

const POLL_COLUMNS: &str = "id, message_id, creator_id, question, is_multiple_choice,
    is_anonymous, is_closed, expires_at, created_at";

const VOTE_COLUMNS: &str = "id, poll_id, option_id, user_id, created_at, updated_at";

impl Database {
    pub fn get_poll(&self, id: Uuid) -> Result<Option<Poll>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM polls WHERE id = ?1", POLL_COLUMNS);
            conn.query_row(&sql, [id.to_string()], map_poll).optional()
        })
    }

    pub fn get_poll_by_message(&self, message_id: Uuid) -> Result<Option<Poll>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM polls WHERE message_id = ?1", POLL_COLUMNS);
            conn.query_row(&sql, [message_id.to_string()], map_poll).optional()
        })
    }

    /// Options in their creation order.
    pub fn poll_options(&self, poll_id: Uuid) -> Result<Vec<PollOption>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, poll_id, position, text FROM poll_options
                 WHERE poll_id = ?1 ORDER BY position ASC",
            )?;
            let rows = stmt
                .query_map([poll_id.to_string()], |row| {
                    Ok(PollOption {
                        id: row::uuid(row, 0)?,
                        poll_id: row::uuid(row, 1)?,
                        position: row.get(2)?,
                        text: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn close_poll(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE polls SET is_closed = 1 WHERE id = ?1", [id.to_string()])?;
            Ok(())
        })
    }

    pub fn poll_votes(&self, poll_id: Uuid) -> Result<Vec<PollVote>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM poll_votes WHERE poll_id = ?1 ORDER BY created_at ASC",
                VOTE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([poll_id.to_string()], map_vote)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn user_poll_votes(&self, poll_id: Uuid, user_id: Uuid) -> Result<Vec<PollVote>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM poll_votes WHERE poll_id = ?1 AND user_id = ?2
                 ORDER BY created_at ASC",
                VOTE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([poll_id.to_string(), user_id.to_string()], map_vote)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn insert_vote(&self, vote: &PollVote) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO poll_votes (id, poll_id, option_id, user_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    vote.id.to_string(),
                    vote.poll_id.to_string(),
                    vote.option_id.to_string(),
                    vote.user_id.to_string(),
                    ts(vote.created_at),
                    ts(vote.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Re-point an existing vote row at another option.
    pub fn move_vote(&self, vote_id: Uuid, option_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE poll_votes SET option_id = ?2, updated_at = ?3 WHERE id = ?1",
                params![vote_id.to_string(), option_id.to_string(), ts(at)],
            )?;
            Ok(())
        })
    }
}

pub(crate) fn insert_poll(conn: &Connection, poll: &Poll, options: &[PollOption]) -> Result<()> {
    conn.execute(
        "INSERT INTO polls (id, message_id, creator_id, question, is_multiple_choice,
            is_anonymous, is_closed, expires_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            poll.id.to_string(),
            poll.message_id.to_string(),
            poll.creator_id.to_string(),
            poll.question,
            poll.is_multiple_choice,
            poll.is_anonymous,
            poll.is_closed,
            opt_ts(poll.expires_at),
            ts(poll.created_at),
        ],
    )?;
    for option in options {
        conn.execute(
            "INSERT INTO poll_options (id, poll_id, position, text) VALUES (?1, ?2, ?3, ?4)",
            params![
                option.id.to_string(),
                option.poll_id.to_string(),
                option.position,
                option.text,
            ],
        )?;
    }
    Ok(())
}

fn map_poll(row: &Row) -> rusqlite::Result<Poll> {
    Ok(Poll {
        id: row::uuid(row, 0)?,
        message_id: row::uuid(row, 1)?,
        creator_id: row::uuid(row, 2)?,
        question: row.get(3)?,
        is_multiple_choice: row.get(4)?,
        is_anonymous: row.get(5)?,
        is_closed: row.get(6)?,
        expires_at: row::opt_time(row, 7)?,
        created_at: row::time(row, 8)?,
    })
}

fn map_vote(row: &Row) -> rusqlite::Result<PollVote> {
    Ok(PollVote {
        id: row::uuid(row, 0)?,
        poll_id: row::uuid(row, 1)?,
        option_id: row::uuid(row, 2)?,
        user_id: row::uuid(row, 3)?,
        created_at: row::time(row, 4)?,
        updated_at: row::time(row, 5)?,
    })
}
