//! Touch detection
//!
//! Decides whether the current price lies within a fractional tolerance of
//! any computed moving-average level. Pure and deterministic; this is the
//! natural unit-test surface of the whole pipeline.

/// A detected touch of one moving-average level
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub symbol: String,
    /// Human-readable window label (e.g. "MA 99")
    pub ma_label: String,
    pub ma_value: f64,
    pub current_price: f64,
}

impl TouchEvent {
    /// Alert text sent to the operator and written to the audit trail
    pub fn alert_text(&self) -> String {
        format!(
            "Price of {} touched {}: {} ({} = {})",
            self.symbol, self.ma_label, self.current_price, self.ma_label, self.ma_value
        )
    }
}

/// Evaluate every computed moving average against the current price.
///
/// `mas` pairs each window size with its computed average (`None` when the
/// asset lacks history for that window). Each window is judged
/// independently: zero, one, or more events can result. A window whose
/// average is absent or zero is skipped.
///
/// A touch fires iff `|price - ma| / ma <= tolerance`, inclusive at the
/// boundary.
#[must_use]
pub fn evaluate(
    symbol: &str,
    current_price: f64,
    mas: &[(usize, Option<f64>)],
    tolerance: f64,
) -> Vec<TouchEvent> {
    let mut events = Vec::new();
    for &(window, ma) in mas {
        let Some(ma) = ma else { continue };
        if ma == 0.0 {
            continue;
        }
        let distance = ((current_price - ma) / ma).abs();
        if distance <= tolerance {
            events.push(TouchEvent {
                symbol: symbol.to_string(),
                ma_label: format!("MA {}", window),
                ma_value: ma,
                current_price,
            });
        }
    }
    events
}
