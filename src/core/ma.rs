//! Simple moving-average computation

/// Arithmetic mean of the most recent `window` closes.
///
/// Returns `None` when fewer than `window` samples are available; a moving
/// average is never silently computed over a short window.
#[must_use]
pub fn moving_average(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}
