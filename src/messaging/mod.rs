//! Messaging channel: outbound alerts and inbound operator commands
//!
//! The `Messenger` trait decouples the polling loop and the command
//! listener from the concrete transport (Telegram Bot API over REST).

pub mod commands;
pub mod errors;
pub mod telegram;
pub mod traits;

// Re-export commonly used types for convenience
pub use commands::{command_task, handle_command, CommandOutcome};
pub use errors::{MessagingError, MessagingResult};
pub use telegram::{TelegramChannel, TelegramConfig};
pub use traits::{InboundMessage, Messenger, UpdateBatch};
