use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE conversations (
                id                TEXT PRIMARY KEY,
                name              TEXT,
                description       TEXT,
                type              TEXT NOT NULL,
                created_by        TEXT NOT NULL REFERENCES users(id),
                allows_media      INTEGER NOT NULL DEFAULT 1,
                allows_replies    INTEGER NOT NULL DEFAULT 1,
                allows_reactions  INTEGER NOT NULL DEFAULT 1,
                is_moderated      INTEGER NOT NULL DEFAULT 0,
                is_read_only      INTEGER NOT NULL DEFAULT 0,
                slow_mode         INTEGER NOT NULL DEFAULT 0,
                max_participants  INTEGER,
                is_active         INTEGER NOT NULL DEFAULT 1,
                is_public         INTEGER NOT NULL DEFAULT 0,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL
            );

            CREATE TABLE conversation_participants (
                conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                user_id          TEXT NOT NULL REFERENCES users(id),
                joined_at        TEXT NOT NULL,
                PRIMARY KEY (conversation_id, user_id)
            );

            CREATE INDEX idx_participants_user
                ON conversation_participants(user_id);

            CREATE TABLE conversation_roles (
                conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                user_id          TEXT NOT NULL REFERENCES users(id),
                role             TEXT NOT NULL,
                updated_at       TEXT NOT NULL,
                PRIMARY KEY (conversation_id, user_id)
            );

            CREATE TABLE messages (
                id                  TEXT PRIMARY KEY,
                conversation_id     TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                sender_id           TEXT NOT NULL REFERENCES users(id),
                content             TEXT NOT NULL,
                type                TEXT NOT NULL,
                priority            TEXT NOT NULL DEFAULT 'normal',
                reply_to_id         TEXT REFERENCES messages(id) ON DELETE SET NULL,
                media_url           TEXT,
                metadata            TEXT,
                is_edited           INTEGER NOT NULL DEFAULT 0,
                edited_at           TEXT,
                is_deleted          INTEGER NOT NULL DEFAULT 0,
                deleted_at          TEXT,
                is_moderated        INTEGER NOT NULL DEFAULT 0,
                moderation_reason   TEXT,
                is_scheduled        INTEGER NOT NULL DEFAULT 0,
                scheduled_for       TEXT,
                mentioned_user_ids  TEXT NOT NULL DEFAULT '[]',
                mentions_everyone   INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_messages_conversation
                ON messages(conversation_id, created_at);

            CREATE INDEX idx_messages_sender
                ON messages(conversation_id, sender_id, created_at);

            CREATE TABLE message_receipts (
                id            TEXT PRIMARY KEY,
                message_id    TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                user_id       TEXT NOT NULL REFERENCES users(id),
                status        TEXT NOT NULL,
                delivered_at  TEXT,
                read_at       TEXT,
                created_at    TEXT NOT NULL,
                updated_at    TEXT NOT NULL,
                UNIQUE(message_id, user_id)
            );

            CREATE INDEX idx_receipts_user
                ON message_receipts(user_id, status);

            CREATE TABLE message_reactions (
                id          TEXT PRIMARY KEY,
                message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id),
                reaction    TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                UNIQUE(message_id, user_id, reaction)
            );

            CREATE INDEX idx_reactions_message
                ON message_reactions(message_id);

            CREATE TABLE pinned_messages (
                id               TEXT PRIMARY KEY,
                conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                message_id       TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                pinned_by        TEXT NOT NULL REFERENCES users(id),
                pinned_at        TEXT NOT NULL,
                UNIQUE(conversation_id, message_id)
            );

            CREATE TABLE polls (
                id                  TEXT PRIMARY KEY,
                message_id          TEXT NOT NULL UNIQUE REFERENCES messages(id) ON DELETE CASCADE,
                creator_id          TEXT NOT NULL REFERENCES users(id),
                question            TEXT NOT NULL,
                is_multiple_choice  INTEGER NOT NULL DEFAULT 0,
                is_anonymous        INTEGER NOT NULL DEFAULT 0,
                is_closed           INTEGER NOT NULL DEFAULT 0,
                expires_at          TEXT,
                created_at          TEXT NOT NULL
            );

            CREATE TABLE poll_options (
                id        TEXT PRIMARY KEY,
                poll_id   TEXT NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
                position  INTEGER NOT NULL,
                text      TEXT NOT NULL,
                UNIQUE(poll_id, position)
            );

            CREATE TABLE poll_votes (
                id          TEXT PRIMARY KEY,
                poll_id     TEXT NOT NULL REFERENCES polls(id) ON DELETE CASCADE,
                option_id   TEXT NOT NULL REFERENCES poll_options(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                UNIQUE(poll_id, user_id, option_id)
            );

            CREATE INDEX idx_poll_votes_user
                ON poll_votes(poll_id, user_id);

            CREATE TABLE game_invites (
                id               TEXT PRIMARY KEY,
                message_id       TEXT NOT NULL UNIQUE REFERENCES messages(id) ON DELETE CASCADE,
                sender_id        TEXT NOT NULL REFERENCES users(id),
                game_type        TEXT NOT NULL,
                game_room_id     TEXT,
                invited_user_id  TEXT REFERENCES users(id),
                status           TEXT NOT NULL DEFAULT 'pending',
                expires_at       TEXT NOT NULL,
                responded_by     TEXT REFERENCES users(id),
                responded_at     TEXT,
                created_at       TEXT NOT NULL
            );

            CREATE TABLE shared_game_items (
                id          TEXT PRIMARY KEY,
                message_id  TEXT NOT NULL UNIQUE REFERENCES messages(id) ON DELETE CASCADE,
                item_type   TEXT NOT NULL,
                item_id     TEXT NOT NULL,
                name        TEXT NOT NULL,
                metadata    TEXT,
                created_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
