use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Database, DatabaseError,
    utils::{parse_optional_timestamp, parse_timestamp, parse_uuid},
};

/// Delivery state of one message for one recipient.
///
/// SENT is the implicit initial state: a message nobody acknowledged has no
/// receipt row at all. Rows only move forward, never back.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "SENT",
            MessageStatus::Delivered => "DELIVERED",
            MessageStatus::Read => "READ",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "SENT" => Some(MessageStatus::Sent),
            "DELIVERED" => Some(MessageStatus::Delivered),
            "READ" => Some(MessageStatus::Read),
            _ => None,
        }
    }
}

/// Outcome of one receipt transition. The wrapped receipt is the stored
/// state after the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ReceiptTransition {
    Created(MessageReceipt),
    Advanced(MessageReceipt),
    Unchanged(MessageReceipt),
}

impl ReceiptTransition {
    pub(crate) fn into_receipt(self) -> MessageReceipt {
        match self {
            ReceiptTransition::Created(receipt)
            | ReceiptTransition::Advanced(receipt)
            | ReceiptTransition::Unchanged(receipt) => receipt,
        }
    }
}

/// Per-recipient delivery/read state of exactly one message. At most one
/// row per (message, user) pair; created lazily on the first delivery or
/// read event and never deleted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MessageReceipt {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub status: MessageStatus,
    /// Stamped once, on the transition into READ.
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r, R> sqlx::FromRow<'r, R> for MessageReceipt
where
    R: sqlx::Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    Option<i64>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    fn from_row(row: &'r R) -> Result<Self, sqlx::Error> {
        let status_str: String = row.try_get("status")?;
        let status =
            MessageStatus::from_db_str(&status_str).ok_or_else(|| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: format!("Unknown message status: {status_str}").into(),
            })?;

        Ok(MessageReceipt {
            id: parse_uuid(row, "id")?,
            message_id: parse_uuid(row, "message_id")?,
            user_id: parse_uuid(row, "user_id")?,
            status,
            read_at: parse_optional_timestamp(row, "read_at")?,
            created_at: parse_timestamp(row, "created_at")?,
            updated_at: parse_timestamp(row, "updated_at")?,
        })
    }
}

impl MessageReceipt {
    /// Moves the (message, user) receipt towards `target` with one
    /// rank-guarded upsert against the unique `(message_id, user_id)` index.
    ///
    /// The status only ever advances. A call that would regress or repeat
    /// the stored status leaves the row untouched and reports
    /// [`ReceiptTransition::Unchanged`], so redundant delivery or read
    /// signals racing each other converge on the same final state. When a
    /// row is created directly in READ (reading implies having received),
    /// `read_at` equals `created_at`. A repeated read never restamps
    /// `read_at`: the first read wins.
    ///
    /// The whole decision lives in the single INSERT statement. A deferred
    /// read-then-write transaction would take a read snapshot first and
    /// fail with SQLITE_BUSY when a concurrent writer commits underneath
    /// it; a lone write statement just waits out the busy timeout.
    pub(crate) async fn apply_transition(
        message_id: &Uuid,
        user_id: &Uuid,
        target: MessageStatus,
        database: &Database,
    ) -> Result<ReceiptTransition, DatabaseError> {
        let now = Utc::now();
        let candidate = MessageReceipt {
            id: Uuid::new_v4(),
            message_id: *message_id,
            user_id: *user_id,
            status: target,
            read_at: (target == MessageStatus::Read).then_some(now),
            created_at: now,
            updated_at: now,
        };

        let result = sqlx::query(
            "INSERT INTO message_receipts
             (id, message_id, user_id, status, read_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (message_id, user_id) DO UPDATE SET
                 status = excluded.status,
                 read_at = CASE WHEN excluded.status = 'READ'
                     THEN COALESCE(message_receipts.read_at, excluded.read_at)
                     ELSE message_receipts.read_at END,
                 updated_at = excluded.updated_at
             WHERE CASE excluded.status
                       WHEN 'SENT' THEN 0 WHEN 'DELIVERED' THEN 1 ELSE 2 END
                 > CASE message_receipts.status
                       WHEN 'SENT' THEN 0 WHEN 'DELIVERED' THEN 1 ELSE 2 END",
        )
        .bind(candidate.id.to_string())
        .bind(candidate.message_id.to_string())
        .bind(candidate.user_id.to_string())
        .bind(candidate.status.as_str())
        .bind(candidate.read_at.map(|ts| ts.timestamp_millis()))
        .bind(candidate.created_at.timestamp_millis())
        .bind(candidate.updated_at.timestamp_millis())
        .execute(&database.pool)
        .await?;

        let stored = sqlx::query_as::<_, MessageReceipt>(
            "SELECT * FROM message_receipts WHERE message_id = ? AND user_id = ?",
        )
        .bind(message_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(&database.pool)
        .await?;

        let transition = if result.rows_affected() == 0 {
            ReceiptTransition::Unchanged(stored)
        } else if stored.id == candidate.id {
            ReceiptTransition::Created(stored)
        } else {
            ReceiptTransition::Advanced(stored)
        };

        Ok(transition)
    }

    pub(crate) async fn find_by_message_and_user(
        message_id: &Uuid,
        user_id: &Uuid,
        database: &Database,
    ) -> Result<Option<MessageReceipt>, DatabaseError> {
        let receipt = sqlx::query_as::<_, MessageReceipt>(
            "SELECT * FROM message_receipts WHERE message_id = ? AND user_id = ?",
        )
        .bind(message_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&database.pool)
        .await?;

        Ok(receipt)
    }

    /// All recipients' receipts for one message, oldest first.
    pub(crate) async fn find_by_message(
        message_id: &Uuid,
        database: &Database,
    ) -> Result<Vec<MessageReceipt>, DatabaseError> {
        let receipts = sqlx::query_as::<_, MessageReceipt>(
            "SELECT * FROM message_receipts WHERE message_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(message_id.to_string())
        .fetch_all(&database.pool)
        .await?;

        Ok(receipts)
    }
}
