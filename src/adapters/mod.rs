//! Chat transport adapters.
//!
//! One adapter is implemented: Slack over Socket Mode. The adapter
//! normalizes platform events into [`InboundMessage`]s and exchanges them
//! with the router over mpsc channels.

use serde::{Deserialize, Serialize};

pub mod slack;

/// How the bot was addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// `@bot` mention in a channel.
    Mention,
    /// Direct (IM) message.
    DirectMessage,
}

/// A normalized inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Mention or direct message.
    pub kind: MessageKind,
    /// Platform ID of the sender.
    pub user_id: String,
    /// Channel to reply into.
    pub channel_id: String,
    /// Raw message text as delivered (mention markup included).
    pub text: String,
    /// Platform event ID, used for duplicate suppression.
    pub event_id: String,
}

/// Messages from adapter to router.
#[derive(Debug)]
pub enum AdapterToRouter {
    /// A normalized inbound message (boxed to keep the enum small).
    Message(Box<InboundMessage>),
}

/// Messages from router to adapter.
#[derive(Debug)]
pub enum RouterToAdapter {
    /// Send a reply into a channel.
    SendMessage {
        /// Target channel ID.
        channel_id: String,
        /// Reply text.
        text: String,
    },
    /// Gracefully stop the adapter.
    Shutdown,
}
