//! Inbound and outbound message shapes.
//!
//! Inbound messages are produced by a channel-webhook adapter (out of scope
//! here) and normalized to [`InboundMessage`]. Outbound messages are built by
//! flow nodes and handed to the [`MessagingGateway`](crate::MessagingGateway)
//! as one of the typed [`OutboundMessage`] shapes.

use chrono::{DateTime, Utc};
use copper_sparrow_core::{ChannelId, CustomerId};
use serde::{Deserialize, Serialize};

/// Identity of the customer a message belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    /// Customer identifier.
    pub id: CustomerId,
    /// Display name, if the channel provides one.
    pub name: Option<String>,
    /// Phone number in the channel's canonical form.
    pub phone: String,
}

/// The kind of inbound message the customer sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundKind {
    /// Plain text message.
    Text,
    /// A button tap on an interactive message.
    Button,
    /// A row selection on an interactive list.
    ListReply,
    /// Any media attachment (image, audio, document, ...).
    Media,
}

/// A normalized inbound message as consumed by the flow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Who sent the message.
    pub customer: CustomerProfile,
    /// The channel the message arrived on.
    pub channel_id: ChannelId,
    /// Message kind.
    pub kind: InboundKind,
    /// Text body (button/list replies carry their title here).
    pub text: String,
    /// Button id, for [`InboundKind::Button`].
    pub button_id: Option<String>,
    /// List row id, for [`InboundKind::ListReply`].
    pub list_row_id: Option<String>,
    /// When the channel adapter received the message.
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Creates a plain text inbound message.
    #[must_use]
    pub fn text(customer: CustomerProfile, channel_id: ChannelId, text: impl Into<String>) -> Self {
        Self {
            customer,
            channel_id,
            kind: InboundKind::Text,
            text: text.into(),
            button_id: None,
            list_row_id: None,
            received_at: Utc::now(),
        }
    }

    /// Creates a button-reply inbound message.
    #[must_use]
    pub fn button(
        customer: CustomerProfile,
        channel_id: ChannelId,
        button_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            customer,
            channel_id,
            kind: InboundKind::Button,
            text: title.into(),
            button_id: Some(button_id.into()),
            list_row_id: None,
            received_at: Utc::now(),
        }
    }

    /// Creates a list-reply inbound message.
    #[must_use]
    pub fn list_reply(
        customer: CustomerProfile,
        channel_id: ChannelId,
        row_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            customer,
            channel_id,
            kind: InboundKind::ListReply,
            text: title.into(),
            button_id: None,
            list_row_id: Some(row_id.into()),
            received_at: Utc::now(),
        }
    }
}

/// Media content for image/video/audio/document/sticker messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaContent {
    /// URL the provider fetches the media from.
    pub url: String,
    /// Optional caption shown under the media.
    pub caption: Option<String>,
    /// Optional filename, for documents.
    pub filename: Option<String>,
}

impl MediaContent {
    /// Creates media content with just a URL.
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            caption: None,
            filename: None,
        }
    }
}

/// A geographic location message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationContent {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Optional place name.
    pub name: Option<String>,
    /// Optional street address.
    pub address: Option<String>,
}

/// A shared contact card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactContent {
    /// Contact display name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
}

/// One tappable button on an interactive message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Button {
    /// Stable id reported back in the button reply.
    pub id: String,
    /// Button label.
    pub title: String,
}

/// An interactive message with reply buttons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonsContent {
    /// Message body shown above the buttons.
    pub body: String,
    /// The buttons, in display order.
    pub buttons: Vec<Button>,
}

/// One selectable row in an interactive list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListRow {
    /// Stable id reported back in the list reply.
    pub id: String,
    /// Row title.
    pub title: String,
    /// Optional secondary line.
    pub description: Option<String>,
}

/// A titled section of list rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListSection {
    /// Section heading.
    pub title: String,
    /// Rows in this section.
    pub rows: Vec<ListRow>,
}

/// An interactive list message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListContent {
    /// Message body shown above the list button.
    pub body: String,
    /// Label on the button that opens the list.
    pub button_label: String,
    /// List sections, in display order.
    pub sections: Vec<ListSection>,
}

/// A typed outbound message, one variant per shape the channel carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Plain text.
    Text {
        /// Message body.
        body: String,
    },
    /// Image with optional caption.
    Image(MediaContent),
    /// Video with optional caption.
    Video(MediaContent),
    /// Audio clip.
    Audio(MediaContent),
    /// Document with optional filename.
    Document(MediaContent),
    /// Sticker.
    Sticker(MediaContent),
    /// Geographic location.
    Location(LocationContent),
    /// Contact card.
    Contact(ContactContent),
    /// Interactive reply buttons.
    Buttons(ButtonsContent),
    /// Interactive list.
    List(ListContent),
}

impl OutboundMessage {
    /// A short human-readable summary of the content, for conversation records.
    #[must_use]
    pub fn content_summary(&self) -> String {
        match self {
            Self::Text { body } => body.clone(),
            Self::Image(m) | Self::Video(m) | Self::Audio(m) | Self::Document(m)
            | Self::Sticker(m) => m.caption.clone().unwrap_or_else(|| m.url.clone()),
            Self::Location(l) => l
                .name
                .clone()
                .unwrap_or_else(|| format!("{}, {}", l.latitude, l.longitude)),
            Self::Contact(c) => format!("{} <{}>", c.name, c.phone),
            Self::Buttons(b) => b.body.clone(),
            Self::List(l) => l.body.clone(),
        }
    }

    /// The media URL carried by this message, if any.
    #[must_use]
    pub fn media_url(&self) -> Option<&str> {
        match self {
            Self::Image(m) | Self::Video(m) | Self::Audio(m) | Self::Document(m)
            | Self::Sticker(m) => Some(m.url.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> CustomerProfile {
        CustomerProfile {
            id: CustomerId::new(),
            name: Some("Ada".to_string()),
            phone: "+15550100".to_string(),
        }
    }

    #[test]
    fn text_inbound_has_no_reply_ids() {
        let msg = InboundMessage::text(customer(), ChannelId::new(), "hello");
        assert_eq!(msg.kind, InboundKind::Text);
        assert!(msg.button_id.is_none());
        assert!(msg.list_row_id.is_none());
    }

    #[test]
    fn button_inbound_carries_id_and_title() {
        let msg = InboundMessage::button(customer(), ChannelId::new(), "yes", "Yes please");
        assert_eq!(msg.kind, InboundKind::Button);
        assert_eq!(msg.button_id.as_deref(), Some("yes"));
        assert_eq!(msg.text, "Yes please");
    }

    #[test]
    fn content_summary_prefers_caption() {
        let msg = OutboundMessage::Image(MediaContent {
            url: "https://cdn.example/cat.jpg".to_string(),
            caption: Some("a cat".to_string()),
            filename: None,
        });
        assert_eq!(msg.content_summary(), "a cat");
        assert_eq!(msg.media_url(), Some("https://cdn.example/cat.jpg"));
    }

    #[test]
    fn text_has_no_media_url() {
        let msg = OutboundMessage::Text {
            body: "hi".to_string(),
        };
        assert!(msg.media_url().is_none());
    }

    #[test]
    fn outbound_serde_roundtrip() {
        let msg = OutboundMessage::Buttons(ButtonsContent {
            body: "Pick one".to_string(),
            buttons: vec![
                Button {
                    id: "a".to_string(),
                    title: "A".to_string(),
                },
                Button {
                    id: "b".to_string(),
                    title: "B".to_string(),
                },
            ],
        });
        let json = serde_json::to_string(&msg).expect("serialize");
        let parsed: OutboundMessage = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(msg, parsed);
    }
}
