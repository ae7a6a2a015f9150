//! Queue of async operations handed to background workers.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Message describing one queued async operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub operation_id: Uuid,
    pub operation_type: String,
    pub resource_id: String,
    pub correlation_id: String,
    pub traceparent: String,
    pub accept_language: String,
    pub home_tenant_id: String,
    pub client_object_id: String,
    pub api_version: String,
    #[serde(rename = "operationTimeout")]
    pub operation_timeout_secs: u64,
}

impl QueueMessage {
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

/// Durable queue the background job runner consumes.
///
/// Used as `Arc<dyn QueueClient>`.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Adds a message to the queue.
    async fn enqueue(&self, message: QueueMessage) -> anyhow::Result<()>;
}

/// Unbounded in-process queue backed by a tokio channel.
///
/// The receiving half is handed out once via [`InMemoryQueue::take_receiver`].
#[derive(Debug)]
pub struct InMemoryQueue {
    sender: mpsc::UnboundedSender<QueueMessage>,
    receiver: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<QueueMessage>>>,
}

impl InMemoryQueue {
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: parking_lot::Mutex::new(Some(receiver)),
        }
    }

    /// Returns the consumer side of the queue, or `None` if already taken.
    pub fn take_receiver(&self) -> Option<mpsc::UnboundedReceiver<QueueMessage>> {
        self.receiver.lock().take()
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn enqueue(&self, message: QueueMessage) -> anyhow::Result<()> {
        self.sender
            .send(message)
            .map_err(|_| anyhow::anyhow!("queue receiver has been dropped"))
    }
}
