//! Messenger trait
//!
//! One fixed operator destination receives every outbound text; inbound
//! updates are polled in batches. Implementations filter inbound messages
//! to the configured operator destination but still advance the offset past
//! everything they saw, so foreign-chat noise cannot wedge the poll loop.

use async_trait::async_trait;

use crate::messaging::errors::MessagingResult;

/// An inbound operator message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub update_id: i64,
    pub chat_id: i64,
    pub text: String,
}

/// One round of update polling
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    /// Operator messages, oldest first
    pub messages: Vec<InboundMessage>,
    /// Offset to pass to the next poll (past every update seen, including
    /// ones filtered out)
    pub next_offset: i64,
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Deliver `text` to the fixed operator destination.
    async fn send_message(&self, text: &str) -> MessagingResult<()>;

    /// Poll for inbound updates at `offset`, blocking up to the transport's
    /// long-poll timeout.
    async fn poll_updates(&self, offset: i64) -> MessagingResult<UpdateBatch>;
}

// ============================================================================
// Test Support
// ============================================================================
