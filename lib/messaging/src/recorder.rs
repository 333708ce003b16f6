//! Conversation-side recording of delivered messages.
//!
//! After a gateway send succeeds the engine records the outbound message on
//! the customer's conversation timeline. The recorder is a seam: the server
//! wires a database-backed implementation, tests use [`NullRecorder`].

use crate::error::RecorderError;
use crate::gateway::SendReceipt;
use crate::message::OutboundMessage;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use copper_sparrow_core::{ChannelId, CustomerId};
use serde::{Deserialize, Serialize};

/// One delivered outbound message, as written to the conversation timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundRecord {
    /// The customer the message was sent to.
    pub customer_id: CustomerId,
    /// The channel it was sent on.
    pub channel_id: ChannelId,
    /// The message that was delivered.
    pub message: OutboundMessage,
    /// The provider's id for the delivered message.
    pub provider_message_id: String,
    /// When the send completed.
    pub sent_at: DateTime<Utc>,
}

impl OutboundRecord {
    /// Builds a record for a just-delivered message.
    #[must_use]
    pub fn delivered(
        customer_id: CustomerId,
        channel_id: ChannelId,
        message: OutboundMessage,
        receipt: &SendReceipt,
    ) -> Self {
        Self {
            customer_id,
            channel_id,
            message,
            provider_message_id: receipt.provider_message_id.clone(),
            sent_at: Utc::now(),
        }
    }
}

/// Sink for delivered-message records.
#[async_trait]
pub trait MessageRecorder: Send + Sync {
    /// Appends one record to the conversation timeline.
    async fn record(&self, record: OutboundRecord) -> Result<(), RecorderError>;
}

/// A recorder that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRecorder;

#[async_trait]
impl MessageRecorder for NullRecorder {
    async fn record(&self, _record: OutboundRecord) -> Result<(), RecorderError> {
        Ok(())
    }
}
