//! Operator command handling
//!
//! Grammar:
//! - `/set_alert_threshold <float>`: touch tolerance as a fraction
//! - `/set_precision <float>`: alias for the threshold command
//! - `/set_interval <token>`: sampling interval, token in {1h, 4h, 1d, 1w}
//!
//! Parsing and validation are pure (`handle_command`) so the command
//! handler's effect on the shared configuration is testable in isolation;
//! `command_task` is the long-poll loop wiring it to the messenger.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{constants, AlertConfig, Interval, SharedConfig};
use crate::core::audit::AuditLog;
use crate::messaging::traits::Messenger;

/// Delay before re-polling after a drained update queue
const IDLE_DELAY: Duration = Duration::from_secs(1);

/// Delay before re-polling after a transport failure
const POLL_ERROR_DELAY: Duration = Duration::from_secs(5);

/// Result of applying one inbound message to the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Accepted; configuration mutated; reply text for the operator
    Ack(String),
    /// Refused with a human-readable reason; configuration unchanged
    Rejected(String),
    /// Not a command; no response required
    Ignored,
}

/// Parse one inbound message and apply it to the configuration.
///
/// `bounds` are the exclusive (lower, upper) limits accepted for the touch
/// threshold.
pub fn handle_command(
    text: &str,
    config: &mut AlertConfig,
    bounds: (f64, f64),
) -> CommandOutcome {
    let mut parts = text.split_whitespace();
    let Some(command) = parts.next() else {
        return CommandOutcome::Ignored;
    };
    if !command.starts_with('/') {
        return CommandOutcome::Ignored;
    }
    let argument = parts.next();

    match command {
        "/set_alert_threshold" | "/set_precision" => set_threshold(argument, config, bounds),
        "/set_interval" => set_interval(argument, config),
        other => CommandOutcome::Rejected(format!("Unrecognized command '{}'", other)),
    }
}

fn set_threshold(
    argument: Option<&str>,
    config: &mut AlertConfig,
    (lower, upper): (f64, f64),
) -> CommandOutcome {
    let Some(raw) = argument else {
        return CommandOutcome::Rejected(
            "Usage: /set_alert_threshold <fraction>, e.g. 0.05 for 5%".to_string(),
        );
    };
    match raw.parse::<f64>() {
        // NaN fails both comparisons and lands in the rejection arm
        Ok(value) if value > lower && value < upper => {
            config.touch_precision = value;
            CommandOutcome::Ack(format!("Alert threshold set to {}%", value * 100.0))
        }
        Ok(value) => CommandOutcome::Rejected(format!(
            "Threshold must be between {}% and {}% exclusive, got {}",
            lower * 100.0,
            upper * 100.0,
            value
        )),
        Err(_) => CommandOutcome::Rejected(format!(
            "'{}' is not a valid number (e.g. 0.05 for 5%)",
            raw
        )),
    }
}

fn set_interval(argument: Option<&str>, config: &mut AlertConfig) -> CommandOutcome {
    let Some(raw) = argument else {
        return CommandOutcome::Rejected(
            "Usage: /set_interval <token>, one of 1h, 4h, 1d, 1w".to_string(),
        );
    };
    match Interval::from_str(raw) {
        Ok(interval) => {
            config.interval = interval;
            CommandOutcome::Ack(format!("Sampling interval set to {}", interval))
        }
        Err(_) => CommandOutcome::Rejected(format!(
            "Unsupported interval '{}' (expected one of 1h, 4h, 1d, 1w)",
            raw
        )),
    }
}

/// Long-poll loop dispatching operator commands
///
/// Every accepted command is acknowledged to the operator and written to
/// the audit trail; rejections are reported back with the specific reason.
/// Transport failures back off briefly and the loop continues until
/// shutdown.
pub async fn command_task(
    messenger: Arc<dyn Messenger>,
    config: SharedConfig,
    audit: Arc<AuditLog>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    info!("command listener started");
    let mut offset = 0i64;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("command listener shutting down");
                break;
            }
            polled = messenger.poll_updates(offset) => match polled {
                Ok(batch) => {
                    offset = batch.next_offset;
                    let drained = batch.messages.is_empty();

                    for message in batch.messages {
                        let outcome = {
                            let mut cfg = config.write().await;
                            handle_command(&message.text, &mut cfg, constants::threshold_bounds())
                        };
                        match outcome {
                            CommandOutcome::Ack(reply) => {
                                info!(command = %message.text, "operator command accepted");
                                audit.config_change(&format!("{} -> {}", message.text, reply));
                                if let Err(e) = messenger.send_message(&reply).await {
                                    error!(error = ?e, "failed to acknowledge command");
                                }
                            }
                            CommandOutcome::Rejected(reason) => {
                                warn!(command = %message.text, reason = %reason, "operator command rejected");
                                if let Err(e) = messenger.send_message(&reason).await {
                                    error!(error = ?e, "failed to send rejection");
                                }
                            }
                            CommandOutcome::Ignored => {}
                        }
                    }

                    if drained {
                        // A drained queue can answer immediately; avoid a
                        // hot loop against transports without long-poll
                        tokio::select! {
                            _ = shutdown_rx.recv() => break,
                            _ = sleep(IDLE_DELAY) => {}
                        }
                    }
                }
                Err(e) => {
                    warn!(error = ?e, "update polling failed, backing off");
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = sleep(POLL_ERROR_DELAY) => {}
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::traits::tests::MockMessenger;
    use crate::messaging::traits::{InboundMessage, UpdateBatch};
    use tempfile::tempdir;

    const BOUNDS: (f64, f64) = (0.0, 0.2);

    #[test]
    fn test_set_threshold_in_range_accepted() {
        let mut config = AlertConfig::default();
        let outcome = handle_command("/set_alert_threshold 0.05", &mut config, BOUNDS);

        assert!(matches!(outcome, CommandOutcome::Ack(_)));
        assert_eq!(config.touch_precision, 0.05);
    }

    #[test]
    fn test_set_precision_is_an_alias() {
        let mut config = AlertConfig::default();
        let outcome = handle_command("/set_precision 0.03", &mut config, BOUNDS);

        assert!(matches!(outcome, CommandOutcome::Ack(_)));
        assert_eq!(config.touch_precision, 0.03);
    }

    #[test]
    fn test_set_threshold_out_of_range_rejected_state_unchanged() {
        let mut config = AlertConfig::default();
        let outcome = handle_command("/set_alert_threshold 0.25", &mut config, BOUNDS);

        assert!(matches!(outcome, CommandOutcome::Rejected(_)));
        assert_eq!(config.touch_precision, 0.01);
    }

    #[test]
    fn test_set_threshold_bounds_are_exclusive() {
        let mut config = AlertConfig::default();
        assert!(matches!(
            handle_command("/set_alert_threshold 0.2", &mut config, BOUNDS),
            CommandOutcome::Rejected(_)
        ));
        assert!(matches!(
            handle_command("/set_alert_threshold 0", &mut config, BOUNDS),
            CommandOutcome::Rejected(_)
        ));
        assert_eq!(config.touch_precision, 0.01);
    }

    #[test]
    fn test_set_threshold_unparseable_rejected_with_parse_reason() {
        let mut config = AlertConfig::default();
        let outcome = handle_command("/set_alert_threshold abc", &mut config, BOUNDS);

        match outcome {
            CommandOutcome::Rejected(reason) => assert!(reason.contains("not a valid number")),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(config.touch_precision, 0.01);
    }

    #[test]
    fn test_set_threshold_nan_rejected() {
        let mut config = AlertConfig::default();
        let outcome = handle_command("/set_alert_threshold NaN", &mut config, BOUNDS);
        assert!(matches!(outcome, CommandOutcome::Rejected(_)));
        assert_eq!(config.touch_precision, 0.01);
    }

    #[test]
    fn test_set_threshold_missing_argument_rejected() {
        let mut config = AlertConfig::default();
        let outcome = handle_command("/set_alert_threshold", &mut config, BOUNDS);
        assert!(matches!(outcome, CommandOutcome::Rejected(_)));
    }

    #[test]
    fn test_set_interval_accepted() {
        let mut config = AlertConfig::default();
        let outcome = handle_command("/set_interval 1d", &mut config, BOUNDS);

        assert!(matches!(outcome, CommandOutcome::Ack(_)));
        assert_eq!(config.interval, Interval::D1);
    }

    #[test]
    fn test_set_interval_unknown_token_rejected() {
        let mut config = AlertConfig::default();
        let outcome = handle_command("/set_interval 5h", &mut config, BOUNDS);

        match outcome {
            CommandOutcome::Rejected(reason) => assert!(reason.contains("5h")),
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(config.interval, Interval::H4);
    }

    #[test]
    fn test_unrecognized_command_rejected() {
        let mut config = AlertConfig::default();
        let outcome = handle_command("/do_something", &mut config, BOUNDS);
        assert!(matches!(outcome, CommandOutcome::Rejected(_)));
    }

    #[test]
    fn test_plain_text_ignored() {
        let mut config = AlertConfig::default();
        assert_eq!(
            handle_command("good morning bot", &mut config, BOUNDS),
            CommandOutcome::Ignored
        );
        assert_eq!(handle_command("", &mut config, BOUNDS), CommandOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_command_task_applies_and_acknowledges() {
        let dir = tempdir().unwrap();
        let audit = Arc::new(AuditLog::new(dir.path().join("audit.log"), 1024 * 1024, 3));
        let config = AlertConfig::default().into_shared();

        let messenger = Arc::new(MockMessenger::new().with_updates(UpdateBatch {
            messages: vec![
                InboundMessage {
                    update_id: 1,
                    chat_id: 42,
                    text: "/set_alert_threshold 0.05".to_string(),
                },
                InboundMessage {
                    update_id: 2,
                    chat_id: 42,
                    text: "/set_interval 5h".to_string(),
                },
            ],
            next_offset: 3,
        }));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(command_task(
            messenger.clone() as Arc<dyn Messenger>,
            config.clone(),
            audit,
            shutdown_rx,
        ));

        // Give the task one poll round
        sleep(Duration::from_millis(100)).await;
        let _ = shutdown_tx.send(());
        let _ = handle.await;

        assert_eq!(config.read().await.touch_precision, 0.05);
        // Still on the default interval after the rejected token
        assert_eq!(config.read().await.interval, Interval::H4);

        let sent = messenger.sent_messages();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("Alert threshold set to 5%"));
        assert!(sent[1].contains("Unsupported interval '5h'"));
    }
}
