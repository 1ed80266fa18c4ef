use crate::backchannel::Backchannel;
use crate::backchannel::database::users::User;
use crate::backchannel::error::{BackchannelError, Result};
use uuid::Uuid;

impl Backchannel {
    /// Registers a new user. Usernames are unique.
    pub async fn create_user(
        &self,
        username: impl Into<String>,
        display_name: Option<String>,
    ) -> Result<User> {
        let user = User::new(username, display_name);
        user.save(&self.database).await?;

        tracing::debug!(
            target: "backchannel::users",
            "Created user {} ({})",
            user.username,
            user.id
        );

        Ok(user)
    }

    pub async fn fetch_user(&self, user_id: &Uuid) -> Result<User> {
        User::find_by_id(user_id, &self.database)
            .await?
            .ok_or(BackchannelError::UserNotFound)
    }
}
