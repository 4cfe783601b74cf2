//! Conversation messages over the shared store
//!
//! Transport only: composing, storing, and observing the ordered feed.
//! Rendering message content is the UI layer's concern.

mod message;
mod service;

pub use message::ChatMessage;
pub use service::{MessageError, MessageFeed, MessageService};
