use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::core::ports::{NotifyError, Notifier};
use crate::models::{PartnerNotice, UserId};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationPayload<'a> {
    user_id: UserId,
    kind: &'static str,
    name: &'a str,
    photo: &'a str,
}

/// Push-notification gateway client
///
/// One POST per notification; the matcher logs failures and moves on.
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    endpoint: String,
}

impl HttpNotifier {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    async fn send(
        &self,
        user_id: UserId,
        kind: &'static str,
        notice: &PartnerNotice,
    ) -> Result<(), NotifyError> {
        let payload = NotificationPayload {
            user_id,
            kind,
            name: &notice.name,
            photo: &notice.photo,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected(format!("{}: {}", status, body)));
        }

        tracing::debug!("Sent {} notification to user {}", kind, user_id);

        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify_liked(&self, user_id: UserId, notice: PartnerNotice) -> Result<(), NotifyError> {
        self.send(user_id, "liked", &notice).await
    }

    async fn notify_match(&self, user_id: UserId, notice: PartnerNotice) -> Result<(), NotifyError> {
        self.send(user_id, "match", &notice).await
    }
}
