//! WhatsApp transport capability.
//!
//! Connectivity, pairing, and session encryption are delegated to a local
//! gateway sidecar; this module only defines the event types the bot
//! consumes and the reply seam it sends through.

pub mod gateway;

pub use gateway::GatewayClient;

use std::fmt;

/// An inbound message event, normalized by the gateway.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Transport-level message id, used for quoted replies.
    pub id: String,
    /// Chat the message arrived in.
    pub chat: String,
    /// Sender user id (bare, without server suffix).
    pub sender: String,
    /// Plain-text body; empty when the message carried no usable text.
    pub text: String,
    pub is_group: bool,
    /// Sender display name, when the transport provides one.
    pub push_name: Option<String>,
}

/// Reference to a message, enough for the transport to quote it in a reply.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MessageRef {
    pub id: String,
    pub chat: String,
    pub sender: String,
}

impl InboundMessage {
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            id: self.id.clone(),
            chat: self.chat.clone(),
            sender: self.sender.clone(),
        }
    }
}

#[derive(Debug)]
pub enum TransportError {
    Http(String),
    Api(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::Api(e) => write!(f, "gateway error: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Outbound seam used by the message handler.
pub trait Transport: Send + Sync {
    /// Send `text` as a reply quoting the referenced message.
    fn send_reply(
        &self,
        text: &str,
        quoted: &MessageRef,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}
