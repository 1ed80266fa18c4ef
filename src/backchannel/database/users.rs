use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Database, DatabaseError,
    utils::{parse_timestamp, parse_uuid},
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for User
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        Ok(User {
            id: parse_uuid(row, "id")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }
}

impl User {
    pub fn new(username: impl Into<String>, display_name: Option<String>) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            display_name,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) async fn save(&self, database: &Database) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO users (id, username, display_name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(self.id.to_string())
        .bind(&self.username)
        .bind(&self.display_name)
        .bind(self.created_at.timestamp_millis())
        .bind(self.updated_at.timestamp_millis())
        .execute(&database.pool)
        .await?;

        Ok(())
    }

    pub(crate) async fn find_by_id(
        id: &Uuid,
        database: &Database,
    ) -> Result<Option<User>, DatabaseError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&database.pool)
            .await?;

        Ok(user)
    }
}
