use async_trait::async_trait;
use flowgate_core::{AppResult, ProjectId};

/// One notification to deliver to a platform user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationInput {
    /// In-app link the notification points at.
    pub link: String,
    /// Short notification title.
    pub title: String,
    /// Notification body.
    pub message: String,
    /// Receiving user id.
    pub recipient_id: String,
}

/// Notification delivery and project membership port.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Creates one notification; delivery mechanics are external.
    async fn create_notification(&self, input: NotificationInput) -> AppResult<()>;

    /// Lists the member user ids of a project.
    async fn list_project_member_ids(&self, project_id: ProjectId) -> AppResult<Vec<String>>;
}
