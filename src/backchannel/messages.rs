use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backchannel::Backchannel;
use crate::backchannel::database::chat_messages::{ChatMessage, MessageType};
use crate::backchannel::database::chat_participants::ChatParticipant;
use crate::backchannel::database::chat_rooms::ChatRoom;
use crate::backchannel::database::users::User;
use crate::backchannel::error::{BackchannelError, Result};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SendMessageRequest {
    pub message_type: MessageType,
    pub text_content: Option<String>,
    /// URL for image, video and file messages.
    pub metadata: Option<String>,
    /// Set when the message replies to another message in the room.
    pub parent_message_id: Option<Uuid>,
}

impl SendMessageRequest {
    pub fn text(content: impl Into<String>) -> Self {
        SendMessageRequest {
            message_type: MessageType::Text,
            text_content: Some(content.into()),
            metadata: None,
            parent_message_id: None,
        }
    }
}

impl Backchannel {
    /// Persists a message sent into a room.
    ///
    /// The room, the sender, and the optional parent message must exist,
    /// and the sender must be a participant of the room. Messages are
    /// immutable once stored; receipts track everything that happens to
    /// them afterwards.
    pub async fn send_message(
        &self,
        room_id: &Uuid,
        sender_id: &Uuid,
        request: SendMessageRequest,
    ) -> Result<ChatMessage> {
        let room = ChatRoom::find_by_id(room_id, &self.database)
            .await?
            .ok_or(BackchannelError::ChatRoomNotFound)?;
        let sender = User::find_by_id(sender_id, &self.database)
            .await?
            .ok_or(BackchannelError::UserNotFound)?;

        if !ChatParticipant::exists(&room.id, &sender.id, &self.database).await? {
            return Err(BackchannelError::NotAParticipant);
        }

        if let Some(parent_id) = &request.parent_message_id {
            ChatMessage::find_by_id(parent_id, &self.database)
                .await?
                .ok_or(BackchannelError::MessageNotFound)?;
        }

        let message = ChatMessage::new(
            room.id,
            sender.id,
            request.message_type,
            request.text_content,
            request.metadata,
            request.parent_message_id,
        );
        message.save(&self.database).await?;

        tracing::info!(
            target: "backchannel::messages",
            "Message {} sent by user {} in chat room {}",
            message.id,
            sender.username,
            room.id
        );

        Ok(message)
    }

    /// All messages of a room in creation order.
    pub async fn fetch_messages_for_room(&self, room_id: &Uuid) -> Result<Vec<ChatMessage>> {
        let room = ChatRoom::find_by_id(room_id, &self.database)
            .await?
            .ok_or(BackchannelError::ChatRoomNotFound)?;

        Ok(ChatMessage::find_by_room(&room.id, &self.database).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backchannel::test_utils::{setup_chat, test_backchannel};

    #[tokio::test]
    async fn test_send_text_message() {
        let backchannel = test_backchannel().await;
        let (sender, _, room) = setup_chat(&backchannel).await;

        let message = backchannel
            .send_message(&room.id, &sender.id, SendMessageRequest::text("hello"))
            .await
            .unwrap();

        assert_eq!(message.chat_room_id, room.id);
        assert_eq!(message.sender_id, sender.id);
        assert_eq!(message.message_type, MessageType::Text);
        assert_eq!(message.text_content.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_send_file_message_keeps_metadata() {
        let backchannel = test_backchannel().await;
        let (sender, _, room) = setup_chat(&backchannel).await;

        let request = SendMessageRequest {
            message_type: MessageType::File,
            text_content: None,
            metadata: Some("https://cdn.example/slides.pdf".to_string()),
            parent_message_id: None,
        };
        let message = backchannel
            .send_message(&room.id, &sender.id, request)
            .await
            .unwrap();

        assert_eq!(message.message_type, MessageType::File);
        assert_eq!(
            message.metadata.as_deref(),
            Some("https://cdn.example/slides.pdf")
        );
    }

    #[tokio::test]
    async fn test_send_reply_validates_parent() {
        let backchannel = test_backchannel().await;
        let (sender, _, room) = setup_chat(&backchannel).await;

        let parent = backchannel
            .send_message(&room.id, &sender.id, SendMessageRequest::text("first"))
            .await
            .unwrap();

        let mut reply = SendMessageRequest::text("reply");
        reply.parent_message_id = Some(parent.id);
        let message = backchannel
            .send_message(&room.id, &sender.id, reply)
            .await
            .unwrap();
        assert_eq!(message.parent_message_id, Some(parent.id));

        let mut dangling = SendMessageRequest::text("reply");
        dangling.parent_message_id = Some(Uuid::new_v4());
        let result = backchannel.send_message(&room.id, &sender.id, dangling).await;
        assert!(matches!(result, Err(BackchannelError::MessageNotFound)));
    }

    #[tokio::test]
    async fn test_send_message_requires_membership() {
        let backchannel = test_backchannel().await;
        let (_, _, room) = setup_chat(&backchannel).await;
        let outsider = backchannel.create_user("outsider", None).await.unwrap();

        let result = backchannel
            .send_message(&room.id, &outsider.id, SendMessageRequest::text("hi"))
            .await;
        assert!(matches!(result, Err(BackchannelError::NotAParticipant)));
    }

    #[tokio::test]
    async fn test_send_message_unknown_room_fails() {
        let backchannel = test_backchannel().await;
        let (sender, _, _) = setup_chat(&backchannel).await;

        let result = backchannel
            .send_message(&Uuid::new_v4(), &sender.id, SendMessageRequest::text("hi"))
            .await;
        assert!(matches!(result, Err(BackchannelError::ChatRoomNotFound)));
    }

    #[tokio::test]
    async fn test_fetch_messages_for_room_in_order() {
        let backchannel = test_backchannel().await;
        let (sender, _, room) = setup_chat(&backchannel).await;

        let first = backchannel
            .send_message(&room.id, &sender.id, SendMessageRequest::text("one"))
            .await
            .unwrap();
        // Distinct creation timestamps keep the expected order deterministic
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = backchannel
            .send_message(&room.id, &sender.id, SendMessageRequest::text("two"))
            .await
            .unwrap();

        let messages = backchannel.fetch_messages_for_room(&room.id).await.unwrap();
        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }
}
