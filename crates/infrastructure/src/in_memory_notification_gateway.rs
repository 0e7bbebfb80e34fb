use std::collections::HashMap;

use async_trait::async_trait;
use flowgate_application::{NotificationGateway, NotificationInput};
use flowgate_core::{AppResult, ProjectId};
use tokio::sync::RwLock;

/// In-memory notification delivery with a project member registry.
#[derive(Default)]
pub struct InMemoryNotificationGateway {
    members: RwLock<HashMap<ProjectId, Vec<String>>>,
    sent: RwLock<Vec<NotificationInput>>,
}

impl InMemoryNotificationGateway {
    /// Creates an empty gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user as a member of a project.
    pub async fn add_member(&self, project_id: ProjectId, user_id: impl Into<String>) {
        self.members
            .write()
            .await
            .entry(project_id)
            .or_default()
            .push(user_id.into());
    }

    /// Returns all delivered notifications in delivery order.
    pub async fn sent(&self) -> Vec<NotificationInput> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl NotificationGateway for InMemoryNotificationGateway {
    async fn create_notification(&self, input: NotificationInput) -> AppResult<()> {
        self.sent.write().await.push(input);
        Ok(())
    }

    async fn list_project_member_ids(&self, project_id: ProjectId) -> AppResult<Vec<String>> {
        Ok(self
            .members
            .read()
            .await
            .get(&project_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use flowgate_application::{NotificationGateway, NotificationInput};
    use flowgate_core::ProjectId;

    use super::InMemoryNotificationGateway;

    #[tokio::test]
    async fn members_are_scoped_per_project() {
        let gateway = InMemoryNotificationGateway::new();
        let project_a = ProjectId::new();
        let project_b = ProjectId::new();
        gateway.add_member(project_a, "user-1").await;
        gateway.add_member(project_a, "user-2").await;

        let members = gateway
            .list_project_member_ids(project_a)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(members, vec!["user-1".to_owned(), "user-2".to_owned()]);

        let other = gateway
            .list_project_member_ids(project_b)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn notifications_are_captured_in_order() {
        let gateway = InMemoryNotificationGateway::new();

        for n in 1..=2 {
            gateway
                .create_notification(NotificationInput {
                    link: "/projects/p/workflows/w".to_owned(),
                    title: format!("title {n}"),
                    message: "body".to_owned(),
                    recipient_id: format!("user-{n}"),
                })
                .await
                .unwrap_or_else(|_| unreachable!());
        }

        let sent = gateway.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].recipient_id, "user-1");
    }
}
