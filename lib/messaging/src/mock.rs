//! In-memory gateway for tests.

use crate::error::GatewayError;
use crate::gateway::{ChannelCredentials, MessagingGateway, SendReceipt};
use crate::message::{
    ButtonsContent, ContactContent, ListContent, LocationContent, MediaContent, OutboundMessage,
};
use async_trait::async_trait;
use std::sync::Mutex;
use ulid::Ulid;

/// One message captured by [`MockGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    /// The recipient.
    pub to: String,
    /// The message that was sent.
    pub message: OutboundMessage,
}

/// A gateway that records sends in memory instead of calling a provider.
///
/// Every shape operation funnels through the same capture, so assertions can
/// inspect the typed [`OutboundMessage`] regardless of which operation the
/// engine dispatched to. Call [`MockGateway::fail_next`] to script a provider
/// rejection for the next send.
#[derive(Debug, Default)]
pub struct MockGateway {
    sent: Mutex<Vec<SentMessage>>,
    fail_next: Mutex<Option<GatewayError>>,
}

impl MockGateway {
    /// Creates an empty mock gateway.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a failure for the next send. Subsequent sends succeed again.
    pub fn fail_next(&self, error: GatewayError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    /// Returns all captured sends, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn capture(&self, to: &str, message: OutboundMessage) -> Result<SendReceipt, GatewayError> {
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }
        self.sent.lock().unwrap().push(SentMessage {
            to: to.to_string(),
            message,
        });
        Ok(SendReceipt {
            provider_message_id: format!("mock-{}", Ulid::new()),
        })
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn send_text(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        body: &str,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(
            to,
            OutboundMessage::Text {
                body: body.to_string(),
            },
        )
    }

    async fn send_image(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(to, OutboundMessage::Image(media.clone()))
    }

    async fn send_video(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(to, OutboundMessage::Video(media.clone()))
    }

    async fn send_audio(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(to, OutboundMessage::Audio(media.clone()))
    }

    async fn send_document(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(to, OutboundMessage::Document(media.clone()))
    }

    async fn send_sticker(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(to, OutboundMessage::Sticker(media.clone()))
    }

    async fn send_location(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        location: &LocationContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(to, OutboundMessage::Location(location.clone()))
    }

    async fn send_contact(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        contact: &ContactContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(to, OutboundMessage::Contact(contact.clone()))
    }

    async fn send_buttons(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        buttons: &ButtonsContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(to, OutboundMessage::Buttons(buttons.clone()))
    }

    async fn send_list(
        &self,
        _channel: &ChannelCredentials,
        to: &str,
        list: &ListContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.capture(to, OutboundMessage::List(list.clone()))
    }
}
