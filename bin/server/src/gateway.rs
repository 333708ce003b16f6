//! The relay messaging gateway.
//!
//! The provider wire protocol lives in a separate relay service; this
//! gateway posts shape-tagged JSON to it and maps its replies onto
//! [`SendReceipt`]s. One POST per outbound message, whatever its shape.

use copper_sparrow_messaging::{
    ButtonsContent, ChannelCredentials, ContactContent, GatewayError, ListContent,
    LocationContent, MediaContent, MessagingGateway, OutboundMessage, SendReceipt,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Deserialize)]
struct RelayReply {
    message_id: String,
}

/// A [`MessagingGateway`] that relays sends to the channel adapter service.
pub struct RelayGateway {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RelayGateway {
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            timeout,
        }
    }

    async fn post(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        message: &OutboundMessage,
    ) -> Result<SendReceipt, GatewayError> {
        let url = format!("{}/messages", self.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .bearer_auth(&channel.access_token)
            .json(&json!({
                "channel_id": channel.channel_id,
                "sender_id": channel.sender_id,
                "to": to,
                "message": message,
            }))
            .send()
            .await
            .map_err(|error| GatewayError::Transport {
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Provider {
                status: Some(status.as_u16()),
                message,
            });
        }
        let reply: RelayReply =
            response
                .json()
                .await
                .map_err(|error| GatewayError::Provider {
                    status: Some(status.as_u16()),
                    message: format!("unreadable relay reply: {error}"),
                })?;
        Ok(SendReceipt {
            provider_message_id: reply.message_id,
        })
    }
}

#[async_trait]
impl MessagingGateway for RelayGateway {
    async fn send_text(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        body: &str,
    ) -> Result<SendReceipt, GatewayError> {
        let message = OutboundMessage::Text {
            body: body.to_string(),
        };
        self.post(channel, to, &message).await
    }

    async fn send_image(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.post(channel, to, &OutboundMessage::Image(media.clone()))
            .await
    }

    async fn send_video(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.post(channel, to, &OutboundMessage::Video(media.clone()))
            .await
    }

    async fn send_audio(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.post(channel, to, &OutboundMessage::Audio(media.clone()))
            .await
    }

    async fn send_document(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.post(channel, to, &OutboundMessage::Document(media.clone()))
            .await
    }

    async fn send_sticker(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        media: &MediaContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.post(channel, to, &OutboundMessage::Sticker(media.clone()))
            .await
    }

    async fn send_location(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        location: &LocationContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.post(channel, to, &OutboundMessage::Location(location.clone()))
            .await
    }

    async fn send_contact(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        contact: &ContactContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.post(channel, to, &OutboundMessage::Contact(contact.clone()))
            .await
    }

    async fn send_buttons(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        buttons: &ButtonsContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.post(channel, to, &OutboundMessage::Buttons(buttons.clone()))
            .await
    }

    async fn send_list(
        &self,
        channel: &ChannelCredentials,
        to: &str,
        list: &ListContent,
    ) -> Result<SendReceipt, GatewayError> {
        self.post(channel, to, &OutboundMessage::List(list.clone()))
            .await
    }
}
