//! Global request-rate governor
//!
//! Outbound provider calls share a fixed requests-per-minute budget. When
//! the budget is exhausted mid-cycle the caller pauses until the window
//! resets instead of hammering the provider into rate-limit errors.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::warn;

/// Length of one budget window
const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct BudgetWindow {
    used: u32,
    started_at: Instant,
}

/// Requests-per-minute budget shared by all calls of one provider
#[derive(Debug)]
pub struct RateBudget {
    max_per_minute: u32,
    state: Mutex<BudgetWindow>,
}

impl RateBudget {
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            // A zero budget would deadlock every caller
            max_per_minute: max_per_minute.max(1),
            state: Mutex::new(BudgetWindow {
                used: 0,
                started_at: Instant::now(),
            }),
        }
    }

    /// Consume one unit of budget, pausing until the window resets when the
    /// budget is exhausted.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.state.lock().await;
                if window.started_at.elapsed() >= WINDOW {
                    window.used = 0;
                    window.started_at = Instant::now();
                }
                if window.used < self.max_per_minute {
                    window.used += 1;
                    return;
                }
                WINDOW.saturating_sub(window.started_at.elapsed())
            };
            warn!(
                wait_secs = wait.as_secs(),
                budget = self.max_per_minute,
                "provider request budget exhausted, pausing"
            );
            sleep(wait).await;
        }
    }

    /// Units consumed in the current window (test/diagnostic use)
    pub async fn used(&self) -> u32 {
        self.state.lock().await.used
    }
}
