use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Database, DatabaseError,
    utils::{parse_timestamp, parse_uuid},
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatRoom {
    pub id: Uuid,
    /// None for direct messages; clients show the other participant's name.
    pub name: Option<String>,
    pub is_group_chat: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for ChatRoom
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    bool: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        Ok(ChatRoom {
            id: parse_uuid(row, "id")?,
            name: row.try_get("name")?,
            is_group_chat: row.try_get("is_group_chat")?,
            created_by: parse_uuid(row, "created_by")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }
}

impl ChatRoom {
    pub fn new(name: Option<String>, created_by: Uuid, is_group_chat: bool) -> Self {
        let now = Utc::now();
        ChatRoom {
            id: Uuid::new_v4(),
            name,
            is_group_chat,
            created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) async fn save(&self, database: &Database) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO chat_rooms (id, name, is_group_chat, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(&self.name)
        .bind(self.is_group_chat)
        .bind(self.created_by.to_string())
        .bind(self.created_at.timestamp_millis())
        .bind(self.updated_at.timestamp_millis())
        .execute(&database.pool)
        .await?;

        Ok(())
    }

    pub(crate) async fn find_by_id(
        id: &Uuid,
        database: &Database,
    ) -> Result<Option<ChatRoom>, DatabaseError> {
        let room = sqlx::query_as::<_, ChatRoom>("SELECT * FROM chat_rooms WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&database.pool)
            .await?;

        Ok(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backchannel::database::test_utils::setup_test_database;
    use crate::backchannel::database::users::User;

    #[tokio::test]
    async fn test_save_and_find_by_id() {
        let database = setup_test_database().await;
        let host = User::new("host", None);
        host.save(&database).await.unwrap();

        let room = ChatRoom::new(Some("rustaceans".to_string()), host.id, true);
        room.save(&database).await.unwrap();

        let loaded = ChatRoom::find_by_id(&room.id, &database).await.unwrap();
        assert_eq!(loaded, Some(room));
    }

    #[tokio::test]
    async fn test_direct_message_room_has_no_name() {
        let database = setup_test_database().await;
        let host = User::new("host", None);
        host.save(&database).await.unwrap();

        let room = ChatRoom::new(None, host.id, false);
        room.save(&database).await.unwrap();

        let loaded = ChatRoom::find_by_id(&room.id, &database)
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.name.is_none());
        assert!(!loaded.is_group_chat);
    }

    #[tokio::test]
    async fn test_find_by_id_missing_returns_none() {
        let database = setup_test_database().await;
        let loaded = ChatRoom::find_by_id(&Uuid::new_v4(), &database)
            .await
            .unwrap();
        assert!(loaded.is_none());
    }
}
