//! The messaging gateway contract.
//!
//! A gateway adapter speaks one chat provider's wire protocol. The contract
//! exposes one operation per outbound shape, each taking channel credentials,
//! a recipient, and the typed content. The engine itself only ever calls
//! [`MessagingGateway::send`], which dispatches over the shapes.

use crate::error::GatewayError;
use crate::message::{
    ButtonsContent, ContactContent, ListContent, LocationContent, MediaContent, OutboundMessage,
};
use async_trait::async_trait;
use copper_sparrow_core::ChannelId;
use serde::{Deserialize, Serialize};

/// Credentials for one configured messaging channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelCredentials {
    /// The channel these credentials belong to.
    pub channel_id: ChannelId,
    /// Provider-side sender account id.
    pub sender_id: String,
    /// Provider access token.
    pub access_token: String,
}

/// Acknowledgement for a delivered outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// The provider's identifier for the delivered message.
    pub provider_message_id: String,
}

/// Provider-facing send contract, one operation per outbound shape.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Sends a plain text message.
    async fn send_text(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        body: &str,
    ) -> Result<SendReceipt, GatewayError>;

    /// Sends an image.
    async fn send_image(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError>;

    /// Sends a video.
    async fn send_video(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError>;

    /// Sends an audio clip.
    async fn send_audio(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError>;

    /// Sends a document.
    async fn send_document(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError>;

    /// Sends a sticker.
    async fn send_sticker(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError>;

    /// Sends a location pin.
    async fn send_location(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        location: &LocationContent,
    ) -> Result<SendReceipt, GatewayError>;

    /// Sends a contact card.
    async fn send_contact(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        contact: &ContactContent,
    ) -> Result<SendReceipt, GatewayError>;

    /// Sends an interactive buttons message.
    async fn send_buttons(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        buttons: &ButtonsContent,
    ) -> Result<SendReceipt, GatewayError>;

    /// Sends an interactive list message.
    async fn send_list(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        list: &ListContent,
    ) -> Result<SendReceipt, GatewayError>;

    /// Dispatches a typed outbound message to the matching shape operation.
    async fn send(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        message: &OutboundMessage,
    ) -> Result<SendReceipt, GatewayError> {
        match message {
            OutboundMessage::Text { body } => self.send_text(channel, to, body).await,
            OutboundMessage::Image(media) => self.send_image(channel, to, media).await,
            OutboundMessage::Video(media) => self.send_video(channel, to, media).await,
            OutboundMessage::Audio(media) => self.send_audio(channel, to, media).await,
            OutboundMessage::Document(media) => self.send_document(channel, to, media).await,
            OutboundMessage::Sticker(media) => self.send_sticker(channel, to, media).await,
            OutboundMessage::Location(location) => self.send_location(channel, to, location).await,
            OutboundMessage::Contact(contact) => self.send_contact(channel, to, contact).await,
            OutboundMessage::Buttons(buttons) => self.send_buttons(channel, to, buttons).await,
            OutboundMessage::List(list) => self.send_list(channel, to, list).await,
        }
    }
}
