/// Database row types that never leave the store as-is.
/// Distinct from parlor-types models because they carry credentials.

pub struct UserRow {
    pub id: uuid::Uuid,
    pub username: String,
    pub password: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
