use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Database, DatabaseError,
    utils::{parse_optional_uuid, parse_timestamp, parse_uuid},
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageType {
    Text,
    Image,
    Video,
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "TEXT",
            MessageType::Image => "IMAGE",
            MessageType::Video => "VIDEO",
            MessageType::File => "FILE",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "TEXT" => Some(MessageType::Text),
            "IMAGE" => Some(MessageType::Image),
            "VIDEO" => Some(MessageType::Video),
            "FILE" => Some(MessageType::File),
            _ => None,
        }
    }
}

/// An immutable record of content sent into a room. Never mutated after
/// creation.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub chat_room_id: Uuid,
    pub sender_id: Uuid,
    /// Set when this message is a reply.
    pub parent_message_id: Option<Uuid>,
    pub message_type: MessageType,
    pub text_content: Option<String>,
    /// URL for image, video and file messages.
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for ChatMessage
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        let message_type_str: String = row.try_get("message_type")?;
        let message_type = MessageType::from_db_str(&message_type_str).ok_or_else(|| {
            sqlx::Error::ColumnDecode {
                index: "message_type".to_string(),
                source: format!("Unknown message type: {message_type_str}").into(),
            }
        })?;

        Ok(ChatMessage {
            id: parse_uuid(row, "id")?,
            chat_room_id: parse_uuid(row, "chat_room_id")?,
            sender_id: parse_uuid(row, "sender_id")?,
            parent_message_id: parse_optional_uuid(row, "parent_message_id")?,
            message_type,
            text_content: row.try_get("text_content")?,
            metadata: row.try_get("metadata")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }
}

impl ChatMessage {
    pub fn new(
        chat_room_id: Uuid,
        sender_id: Uuid,
        message_type: MessageType,
        text_content: Option<String>,
        metadata: Option<String>,
        parent_message_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        ChatMessage {
            id: Uuid::new_v4(),
            chat_room_id,
            sender_id,
            parent_message_id,
            message_type,
            text_content,
            metadata,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) async fn save(&self, database: &Database) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO chat_messages
             (id, chat_room_id, sender_id, parent_message_id, message_type, text_content, metadata, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(self.chat_room_id.to_string())
        .bind(self.sender_id.to_string())
        .bind(self.parent_message_id.map(|id| id.to_string()))
        .bind(self.message_type.as_str())
        .bind(&self.text_content)
        .bind(&self.metadata)
        .bind(self.created_at.timestamp_millis())
        .bind(self.updated_at.timestamp_millis())
        .execute(&database.pool)
        .await?;

        Ok(())
    }

    pub(crate) async fn find_by_id(
        id: &Uuid,
        database: &Database,
    ) -> Result<Option<ChatMessage>, DatabaseError> {
        let message = sqlx::query_as::<_, ChatMessage>("SELECT * FROM chat_messages WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&database.pool)
            .await?;

        Ok(message)
    }

    /// All messages of a room in creation order, ties broken by id.
    pub(crate) async fn find_by_room(
        chat_room_id: &Uuid,
        database: &Database,
    ) -> Result<Vec<ChatMessage>, DatabaseError> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages WHERE chat_room_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(chat_room_id.to_string())
        .fetch_all(&database.pool)
        .await?;

        Ok(messages)
    }

    /// Ids of messages in the room the user has not read yet, in creation
    /// order.
    ///
    /// A message counts as unread when the user is not its sender and no
    /// receipt row in status READ exists for the (message, user) pair. The
    /// absence of a receipt row is itself meaningful: rows are created
    /// lazily, so a message nobody acknowledged has none.
    pub(crate) async fn find_unread_ids_for_user(
        chat_room_id: &Uuid,
        user_id: &Uuid,
        database: &Database,
    ) -> Result<Vec<Uuid>, DatabaseError> {
        let rows = sqlx::query(
            "SELECT m.id FROM chat_messages m
             WHERE m.chat_room_id = ?
               AND m.sender_id != ?
               AND NOT EXISTS (
                   SELECT 1 FROM message_receipts r
                   WHERE r.message_id = m.id AND r.user_id = ? AND r.status = 'READ'
               )
             ORDER BY m.created_at ASC, m.id ASC",
        )
        .bind(chat_room_id.to_string())
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .fetch_all(&database.pool)
        .await?;

        rows.iter()
            .map(|row| parse_uuid(row, "id"))
            .collect::<Result<Vec<Uuid>, sqlx::Error>>()
            .map_err(DatabaseError::Sqlx)
    }

    /// Number of unread messages for the user in the room, by the same
    /// definition as [`ChatMessage::find_unread_ids_for_user`].
    pub(crate) async fn count_unread_for_user(
        chat_room_id: &Uuid,
        user_id: &Uuid,
        database: &Database,
    ) -> Result<u64, DatabaseError> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM chat_messages m
             WHERE m.chat_room_id = ?
               AND m.sender_id != ?
               AND NOT EXISTS (
                   SELECT 1 FROM message_receipts r
                   WHERE r.message_id = m.id AND r.user_id = ? AND r.status = 'READ'
               )",
        )
        .bind(chat_room_id.to_string())
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(&database.pool)
        .await?;

        Ok(count.0 as u64)
    }
}
