//! Messaging boundary for the copper-sparrow platform.
//!
//! This crate defines the shapes that cross the chat-channel boundary and the
//! contracts the flow engine drives them through:
//!
//! - **Inbound**: the normalized message a channel adapter hands the engine
//! - **Outbound**: one typed shape per kind of message a channel can carry
//! - **Gateway**: the provider-facing send contract, one operation per shape
//! - **Recorder**: conversation-side bookkeeping for delivered messages
//! - **Envelope**: versioned wrapper for everything serialized onto the wire

pub mod envelope;
pub mod error;
pub mod gateway;
pub mod message;
pub mod mock;
pub mod recorder;

pub use envelope::Envelope;
pub use error::{GatewayError, RecorderError};
pub use gateway::{ChannelCredentials, MessagingGateway, SendReceipt};
pub use message::{
    Button, ButtonsContent, ContactContent, CustomerProfile, InboundKind, InboundMessage,
    ListContent, ListRow, ListSection, LocationContent, MediaContent, OutboundMessage,
};
pub use mock::{MockGateway, SentMessage};
pub use recorder::{MessageRecorder, NullRecorder, OutboundRecord};
