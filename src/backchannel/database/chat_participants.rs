use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Database, DatabaseError,
    utils::{parse_optional_timestamp, parse_optional_uuid, parse_timestamp, parse_uuid},
};

/// Membership of one user in one chat room. Unique per (room, user).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatParticipant {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub user_id: Uuid,
    /// None for the room creator and for direct-message rooms.
    pub invited_by: Option<Uuid>,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for ChatParticipant
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    Option<i64>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        Ok(ChatParticipant {
            id: parse_uuid(row, "id")?,
            chat_room_id: parse_uuid(row, "chat_room_id")?,
            user_id: parse_uuid(row, "user_id")?,
            invited_by: parse_optional_uuid(row, "invited_by")?,
            joined_at: parse_timestamp(row, "joined_at")?,
            last_read_at: parse_optional_timestamp(row, "last_read_at")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }
}

impl ChatParticipant {
    pub fn new(chat_room_id: Uuid, user_id: Uuid, invited_by: Option<Uuid>) -> Self {
        let now = Utc::now();
        ChatParticipant {
            id: Uuid::new_v4(),
            chat_room_id,
            user_id,
            invited_by,
            joined_at: now,
            last_read_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) async fn save(&self, database: &Database) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO chat_participants
             (id, chat_room_id, user_id, invited_by, joined_at, last_read_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(self.chat_room_id.to_string())
        .bind(self.user_id.to_string())
        .bind(self.invited_by.map(|id| id.to_string()))
        .bind(self.joined_at.timestamp_millis())
        .bind(self.last_read_at.map(|ts| ts.timestamp_millis()))
        .bind(self.created_at.timestamp_millis())
        .bind(self.updated_at.timestamp_millis())
        .execute(&database.pool)
        .await?;

        Ok(())
    }

    pub(crate) async fn exists(
        chat_room_id: &Uuid,
        user_id: &Uuid,
        database: &Database,
    ) -> Result<bool, DatabaseError> {
        let result: Option<(bool,)> = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM chat_participants WHERE chat_room_id = ? AND user_id = ?)",
        )
        .bind(chat_room_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&database.pool)
        .await?;

        Ok(result.map(|(exists,)| exists).unwrap_or(false))
    }

    pub(crate) async fn find_by_room(
        chat_room_id: &Uuid,
        database: &Database,
    ) -> Result<Vec<ChatParticipant>, DatabaseError> {
        let participants = sqlx::query_as::<_, ChatParticipant>(
            "SELECT * FROM chat_participants WHERE chat_room_id = ? ORDER BY joined_at ASC, id ASC",
        )
        .bind(chat_room_id.to_string())
        .fetch_all(&database.pool)
        .await?;

        Ok(participants)
    }

    /// Refreshes the participant's last_read_at marker after a sweep.
    /// A no-op when the user is not a participant of the room.
    pub(crate) async fn touch_last_read(
        chat_room_id: &Uuid,
        user_id: &Uuid,
        database: &Database,
    ) -> Result<(), DatabaseError> {
        let now = Utc::now().timestamp_millis();
        sqlx::query(
            "UPDATE chat_participants SET last_read_at = ?, updated_at = ?
             WHERE chat_room_id = ? AND user_id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(chat_room_id.to_string())
        .bind(user_id.to_string())
        .execute(&database.pool)
        .await?;

        Ok(())
    }
}
