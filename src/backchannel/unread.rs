use uuid::Uuid;

use crate::backchannel::Backchannel;
use crate::backchannel::database::chat_messages::ChatMessage;
use crate::backchannel::database::chat_participants::ChatParticipant;
use crate::backchannel::error::Result;

impl Backchannel {
    /// Number of messages in the room the user has not read. Messages the
    /// user sent are not counted; a message with no receipt row, or one
    /// still in SENT/DELIVERED, counts as unread.
    pub async fn unread_count(&self, room_id: &Uuid, user_id: &Uuid) -> Result<u64> {
        Ok(ChatMessage::count_unread_for_user(room_id, user_id, &self.database).await?)
    }

    /// Ids of the user's unread messages in the room, in creation order —
    /// stable for client rendering and for feeding
    /// [`Backchannel::mark_multiple_as_read`].
    pub async fn unread_message_ids(&self, room_id: &Uuid, user_id: &Uuid) -> Result<Vec<Uuid>> {
        Ok(ChatMessage::find_unread_ids_for_user(room_id, user_id, &self.database).await?)
    }

    /// Marks every currently-unread message in the room as read for the
    /// user, then refreshes the participant's last_read_at marker.
    ///
    /// The id query and the per-message writes are separate transactional
    /// units: a message arriving in between is missed by this sweep and
    /// picked up by the next one.
    pub async fn mark_all_as_read_in_room(&self, room_id: &Uuid, user_id: &Uuid) -> Result<()> {
        tracing::info!(
            target: "backchannel::unread",
            "Marking all messages as read for user {} in chat room {}",
            user_id,
            room_id
        );

        let unread_ids = self.unread_message_ids(room_id, user_id).await?;
        self.mark_multiple_as_read(&unread_ids, user_id).await?;

        ChatParticipant::touch_last_read(room_id, user_id, &self.database).await?;

        Ok(())
    }
}
