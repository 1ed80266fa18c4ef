use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backchannel::Backchannel;
use crate::backchannel::database::chat_messages::ChatMessage;
use crate::backchannel::database::message_receipts::{MessageReceipt, MessageStatus};
use crate::backchannel::database::users::User;
use crate::backchannel::error::{BackchannelError, Result};

/// What the transport layer gets back for a (message, recipient) pair.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ReceiptView {
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    /// Present once the message reached the recipient, i.e. in status
    /// DELIVERED or READ.
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub is_read: bool,
}

impl ReceiptView {
    pub(crate) fn from_receipt(receipt: &MessageReceipt, user: &User) -> Self {
        let delivered = matches!(
            receipt.status,
            MessageStatus::Delivered | MessageStatus::Read
        );

        ReceiptView {
            message_id: receipt.message_id,
            user_id: user.id,
            username: user.username.clone(),
            delivered_at: delivered.then_some(receipt.created_at),
            read_at: receipt.read_at,
            is_read: receipt.status == MessageStatus::Read,
        }
    }
}

impl Backchannel {
    /// Records that `user_id` received the message, e.g. on a transport
    /// delivery ack.
    ///
    /// Idempotent: a repeated ack, or one arriving after the message was
    /// already read, leaves the stored receipt untouched. Fails with
    /// `MessageNotFound` / `UserNotFound` before any write when either
    /// referent is absent.
    pub async fn mark_as_delivered(&self, message_id: &Uuid, user_id: &Uuid) -> Result<ReceiptView> {
        tracing::debug!(
            target: "backchannel::receipts",
            "Marking message {} as delivered for user {}",
            message_id,
            user_id
        );

        let message = ChatMessage::find_by_id(message_id, &self.database)
            .await?
            .ok_or(BackchannelError::MessageNotFound)?;
        let user = User::find_by_id(user_id, &self.database)
            .await?
            .ok_or(BackchannelError::UserNotFound)?;

        let receipt = MessageReceipt::apply_transition(
            &message.id,
            &user.id,
            MessageStatus::Delivered,
            &self.database,
        )
        .await?
        .into_receipt();

        Ok(ReceiptView::from_receipt(&receipt, &user))
    }

    /// Records that `user_id` read the message. A read without a prior
    /// delivery ack creates the receipt directly in READ — reading implies
    /// having received. The read timestamp is stamped once; repeats keep
    /// the first one.
    pub async fn mark_as_read(&self, message_id: &Uuid, user_id: &Uuid) -> Result<ReceiptView> {
        tracing::debug!(
            target: "backchannel::receipts",
            "Marking message {} as read for user {}",
            message_id,
            user_id
        );

        let message = ChatMessage::find_by_id(message_id, &self.database)
            .await?
            .ok_or(BackchannelError::MessageNotFound)?;
        let user = User::find_by_id(user_id, &self.database)
            .await?
            .ok_or(BackchannelError::UserNotFound)?;

        let receipt = MessageReceipt::apply_transition(
            &message.id,
            &user.id,
            MessageStatus::Read,
            &self.database,
        )
        .await?
        .into_receipt();

        Ok(ReceiptView::from_receipt(&receipt, &user))
    }

    /// Marks each message read for the user, independently per id.
    ///
    /// Partial success by design: an unknown message id is logged and
    /// skipped, the rest of the batch proceeds. The returned views follow
    /// input order and may be fewer than the inputs. An unknown user is
    /// not a per-item condition and fails the whole call.
    pub async fn mark_multiple_as_read(
        &self,
        message_ids: &[Uuid],
        user_id: &Uuid,
    ) -> Result<Vec<ReceiptView>> {
        tracing::debug!(
            target: "backchannel::receipts",
            "Marking {} messages as read for user {}",
            message_ids.len(),
            user_id
        );

        let mut views = Vec::with_capacity(message_ids.len());

        for message_id in message_ids {
            match self.mark_as_read(message_id, user_id).await {
                Ok(view) => views.push(view),
                Err(BackchannelError::MessageNotFound) => {
                    tracing::warn!(
                        target: "backchannel::receipts",
                        "Message not found, skipping: {}",
                        message_id
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Ok(views)
    }

    /// All recipients' receipts for one message, oldest first. An unknown
    /// message yields an empty list rather than an error.
    pub async fn message_receipts(&self, message_id: &Uuid) -> Result<Vec<ReceiptView>> {
        let receipts = MessageReceipt::find_by_message(message_id, &self.database).await?;

        let mut views = Vec::with_capacity(receipts.len());
        for receipt in &receipts {
            let user = User::find_by_id(&receipt.user_id, &self.database)
                .await?
                .ok_or(BackchannelError::UserNotFound)?;
            views.push(ReceiptView::from_receipt(receipt, &user));
        }

        Ok(views)
    }
}
