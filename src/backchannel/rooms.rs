use crate::backchannel::Backchannel;
use crate::backchannel::database::chat_participants::ChatParticipant;
use crate::backchannel::database::chat_rooms::ChatRoom;
use crate::backchannel::database::users::User;
use crate::backchannel::error::{BackchannelError, Result};
use uuid::Uuid;

impl Backchannel {
    /// Creates a chat room and enrolls the creator as its first
    /// participant. `name` is None for direct-message rooms.
    pub async fn create_chat_room(
        &self,
        name: Option<String>,
        created_by: &Uuid,
        is_group_chat: bool,
    ) -> Result<ChatRoom> {
        let creator = User::find_by_id(created_by, &self.database)
            .await?
            .ok_or(BackchannelError::UserNotFound)?;

        let room = ChatRoom::new(name, creator.id, is_group_chat);
        room.save(&self.database).await?;

        ChatParticipant::new(room.id, creator.id, None)
            .save(&self.database)
            .await?;

        tracing::debug!(
            target: "backchannel::rooms",
            "Created chat room {} by user {}",
            room.id,
            creator.id
        );

        Ok(room)
    }

    /// Adds a user to a room. Fails if either is unknown; a duplicate
    /// membership is rejected by the store's unique constraint.
    pub async fn add_participant(
        &self,
        room_id: &Uuid,
        user_id: &Uuid,
        invited_by: Option<Uuid>,
    ) -> Result<ChatParticipant> {
        let room = ChatRoom::find_by_id(room_id, &self.database)
            .await?
            .ok_or(BackchannelError::ChatRoomNotFound)?;
        let user = User::find_by_id(user_id, &self.database)
            .await?
            .ok_or(BackchannelError::UserNotFound)?;

        let participant = ChatParticipant::new(room.id, user.id, invited_by);
        participant.save(&self.database).await?;

        tracing::debug!(
            target: "backchannel::rooms",
            "User {} joined chat room {}",
            user.id,
            room.id
        );

        Ok(participant)
    }

    pub async fn room_participants(&self, room_id: &Uuid) -> Result<Vec<ChatParticipant>> {
        let room = ChatRoom::find_by_id(room_id, &self.database)
            .await?
            .ok_or(BackchannelError::ChatRoomNotFound)?;

        Ok(ChatParticipant::find_by_room(&room.id, &self.database).await?)
    }
}
