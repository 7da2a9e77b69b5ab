//! Application-wide constants and configuration defaults
//!
//! This module centralizes all hardcoded tuning values to make them
//! configurable and maintainable. Values can be overridden via environment
//! variables.

use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// Polling & Batching
// =============================================================================

/// Maximum symbols evaluated per batch (default: 50)
///
/// Environment variable: `BATCH_SIZE`
pub fn batch_size() -> usize {
    std::env::var("BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|&n: &usize| n > 0)
        .unwrap_or(50)
}

/// Concurrent per-symbol checks within a batch (default: 8)
///
/// Environment variable: `MAX_CONCURRENT_CHECKS`
pub fn max_concurrent_checks() -> usize {
    std::env::var("MAX_CONCURRENT_CHECKS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|&n: &usize| n > 0)
        .unwrap_or(8)
}

// =============================================================================
// Provider Rate Governance
// =============================================================================

/// Global provider request budget per minute (default: 600)
///
/// Environment variable: `RATE_BUDGET_PER_MIN`
pub fn rate_budget_per_min() -> u32 {
    std::env::var("RATE_BUDGET_PER_MIN")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(600)
}

/// Moving-average cache entry lifetime (default: 1800s, one polling cycle)
///
/// Environment variable: `CACHE_TTL_SECS`
pub fn cache_ttl() -> Duration {
    let secs = std::env::var("CACHE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1800);
    Duration::from_secs(secs)
}

// =============================================================================
// Cycle Failure Backoff
// =============================================================================

/// Base cooldown after an unexpected cycle failure (default: 60s)
///
/// Environment variable: `CYCLE_COOLDOWN_SECS`
pub fn cycle_cooldown() -> Duration {
    let secs = std::env::var("CYCLE_COOLDOWN_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(60);
    Duration::from_secs(secs)
}

/// Cooldown cap for repeated cycle failures (default: 900s)
///
/// Environment variable: `CYCLE_COOLDOWN_MAX_SECS`
pub fn cycle_cooldown_max() -> Duration {
    let secs = std::env::var("CYCLE_COOLDOWN_MAX_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(900);
    Duration::from_secs(secs)
}

// =============================================================================
// Operator Command Bounds
// =============================================================================

/// Exclusive bounds for the touch threshold accepted from operator commands
/// (default: (0.0, 0.2), i.e. anything strictly between 0% and 20%).
///
/// Environment variables: `THRESHOLD_MIN`, `THRESHOLD_MAX`
pub fn threshold_bounds() -> (f64, f64) {
    let lower = std::env::var("THRESHOLD_MIN")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.0);
    let upper = std::env::var("THRESHOLD_MAX")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.2);
    (lower, upper)
}

/// Telegram getUpdates long-poll timeout (default: 30s)
///
/// Environment variable: `COMMAND_POLL_TIMEOUT_SECS`
pub fn command_poll_timeout_secs() -> u64 {
    std::env::var("COMMAND_POLL_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(30)
}

// =============================================================================
// Audit Trail
// =============================================================================

/// Audit log file path (default: `ma_touch_bot.log`)
///
/// Environment variable: `AUDIT_LOG_PATH`
pub fn audit_log_path() -> PathBuf {
    std::env::var("AUDIT_LOG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("ma_touch_bot.log"))
}

/// Audit log rotation threshold in bytes (default: 5 MB)
///
/// Environment variable: `AUDIT_MAX_BYTES`
pub fn audit_max_bytes() -> u64 {
    std::env::var("AUDIT_MAX_BYTES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(5 * 1024 * 1024)
}

/// Rotated audit files retained (default: 3)
///
/// Environment variable: `AUDIT_MAX_BACKUPS`
pub fn audit_max_backups() -> usize {
    std::env::var("AUDIT_MAX_BACKUPS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3)
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Print all configuration values (for debugging/startup logs)
pub fn log_configuration() {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Polling:");
    tracing::info!("  - Batch size: {}", batch_size());
    tracing::info!("  - Concurrent checks: {}", max_concurrent_checks());

    tracing::info!("Provider:");
    tracing::info!("  - Rate budget: {} req/min", rate_budget_per_min());
    tracing::info!("  - MA cache TTL: {:?}", cache_ttl());

    tracing::info!("Recovery:");
    tracing::info!("  - Cycle cooldown: {:?}", cycle_cooldown());
    tracing::info!("  - Cycle cooldown cap: {:?}", cycle_cooldown_max());

    tracing::info!("Commands:");
    tracing::info!("  - Threshold bounds: {:?}", threshold_bounds());
    tracing::info!("  - Update poll timeout: {}s", command_poll_timeout_secs());

    tracing::info!("Audit:");
    tracing::info!("  - Log path: {}", audit_log_path().display());
    tracing::info!("  - Rotate at: {} bytes", audit_max_bytes());
    tracing::info!("  - Backups kept: {}", audit_max_backups());
    tracing::info!("==================================");
}
