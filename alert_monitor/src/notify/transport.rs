use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{JsonStore, JsonStoreExt, StoreError};

/// A rendered notification ready for delivery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub alert: String,
    pub subject: String,
    pub html_body: String,
    pub recipients: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("outbox write failed: {0}")]
    Store(#[from] StoreError),

    #[error("message rejected: {0}")]
    Rejected(String),
}

/// Delivers rendered notifications.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError>;
}

/// Writes each message as a JSON document under `{prefix}/` for a mailer to
/// pick up.
pub struct OutboxTransport {
    store: Arc<dyn JsonStore>,
    prefix: String,
}

impl OutboxTransport {
    pub fn new(store: Arc<dyn JsonStore>, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            store,
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    fn key_for(&self, message: &OutgoingMessage) -> String {
        format!(
            "{}/{}_{}.json",
            self.prefix,
            message.created_at.format("%Y%m%dT%H%M%S%.3fZ"),
            uuid::Uuid::new_v4().simple()
        )
    }
}

#[async_trait]
impl NotificationTransport for OutboxTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), TransportError> {
        if message.recipients.is_empty() {
            return Err(TransportError::Rejected("no recipients".into()));
        }
        self.store.save_as(&self.key_for(message), message)?;
        Ok(())
    }
}
