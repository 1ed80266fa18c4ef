use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use super::DatabaseError;

/// Parses a NOT NULL timestamp column stored as INTEGER epoch-milliseconds.
pub(crate) fn parse_timestamp<'r, R>(
    row: &'r R,
    column_name: &'r str,
) -> Result<DateTime<Utc>, sqlx::Error>
where
    R: Row,
    &'r str: sqlx::ColumnIndex<R>,
    i64: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let timestamp_ms: i64 = row.try_get(column_name)?;
    DateTime::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
        column_decode_error(
            column_name,
            DatabaseError::InvalidTimestamp {
                timestamp: timestamp_ms,
            },
        )
    })
}

/// Parses a nullable timestamp column stored as INTEGER epoch-milliseconds.
pub(crate) fn parse_optional_timestamp<'r, R>(
    row: &'r R,
    column_name: &'r str,
) -> Result<Option<DateTime<Utc>>, sqlx::Error>
where
    R: Row,
    &'r str: sqlx::ColumnIndex<R>,
    Option<i64>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let timestamp_ms: Option<i64> = row.try_get(column_name)?;
    match timestamp_ms {
        None => Ok(None),
        Some(ms) => DateTime::from_timestamp_millis(ms)
            .map(Some)
            .ok_or_else(|| {
                column_decode_error(column_name, DatabaseError::InvalidTimestamp { timestamp: ms })
            }),
    }
}

/// Parses a NOT NULL uuid column stored as canonical TEXT.
pub(crate) fn parse_uuid<'r, R>(row: &'r R, column_name: &'r str) -> Result<Uuid, sqlx::Error>
where
    R: Row,
    &'r str: sqlx::ColumnIndex<R>,
    String: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let raw: String = row.try_get(column_name)?;
    Uuid::parse_str(&raw).map_err(|e| column_decode_error(column_name, e))
}

/// Parses a nullable uuid column stored as canonical TEXT.
pub(crate) fn parse_optional_uuid<'r, R>(
    row: &'r R,
    column_name: &'r str,
) -> Result<Option<Uuid>, sqlx::Error>
where
    R: Row,
    &'r str: sqlx::ColumnIndex<R>,
    Option<String>: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
{
    let raw: Option<String> = row.try_get(column_name)?;
    match raw {
        None => Ok(None),
        Some(value) => Uuid::parse_str(&value)
            .map(Some)
            .map_err(|e| column_decode_error(column_name, e)),
    }
}

fn column_decode_error(
    column_name: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column_name.to_string(),
        source: Box::new(source),
    }
}
