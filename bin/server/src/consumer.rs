//! The inbound message consumer.
//!
//! The channel webhook adapter publishes every inbound customer message as a
//! versioned JSON envelope on a NATS subject; this consumer drains that
//! subject and feeds the flow engine. Decode failures and engine errors are
//! logged and the loop keeps going: one bad message must not stall the
//! conversation stream.

use copper_sparrow_flow::FlowEngine;
use copper_sparrow_messaging::{Envelope, InboundMessage};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Consumes inbound messages from NATS and drives the engine.
pub struct InboundConsumer {
    client: async_nats::Client,
    subject: String,
    engine: Arc<FlowEngine>,
}

impl InboundConsumer {
    #[must_use]
    pub fn new(client: async_nats::Client, subject: String, engine: Arc<FlowEngine>) -> Self {
        Self {
            client,
            subject,
            engine,
        }
    }

    /// Subscribes and processes messages until the subscription ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    pub async fn run(self) -> Result<(), async_nats::SubscribeError> {
        let mut subscription = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "consuming inbound messages");

        while let Some(delivery) = subscription.next().await {
            let envelope = match Envelope::<InboundMessage>::from_json_bytes(&delivery.payload) {
                Ok(envelope) => envelope,
                Err(error) => {
                    warn!(subject = %self.subject, %error, "dropping undecodable inbound message");
                    continue;
                }
            };
            if !envelope.is_current_version() {
                warn!(
                    version = envelope.version,
                    "dropping inbound message with unsupported envelope version"
                );
                continue;
            }
            let message = envelope.into_payload();
            match self.engine.handle_message(&message).await {
                Ok(outcome) => {
                    debug!(
                        customer_id = %message.customer.id,
                        channel_id = %message.channel_id,
                        ?outcome,
                        "inbound message handled"
                    );
                }
                Err(error) => {
                    warn!(
                        customer_id = %message.customer.id,
                        channel_id = %message.channel_id,
                        %error,
                        "inbound message failed"
                    );
                }
            }
        }

        info!(subject = %self.subject, "inbound subscription closed");
        Ok(())
    }
}
