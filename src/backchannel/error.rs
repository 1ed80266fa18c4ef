use thiserror::Error;

use crate::backchannel::database::DatabaseError;

pub type Result<T> = core::result::Result<T, BackchannelError>;

#[derive(Error, Debug)]
pub enum BackchannelError {
    #[error("Chat message not found")]
    MessageNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Chat room not found")]
    ChatRoomNotFound,

    #[error("User is not a participant of the chat room")]
    NotAParticipant,

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}
