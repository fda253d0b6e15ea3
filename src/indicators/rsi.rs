// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// Step 1 — Compute day-over-day deltas from consecutive closes.
// Step 2 — Seed average gain / average loss with the arithmetic mean of the
//          first `period` gains / losses.
// Step 3 — Walk the remaining deltas once, applying Wilder's smoothing:
//            avg = (prev_avg * (period - 1) + current) / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// This is a single O(n) forward pass producing the final value only — not a
// re-seeded rolling window.

use super::round2;

/// Default look-back period used by the snapshot pipeline.
pub const RSI_PERIOD: usize = 30;

/// Compute the RSI of `closes` over `period`, rounded to 2 decimal places.
///
/// # Edge cases
/// - `period == 0` => `None`
/// - `closes.len() < period + 1` => `None` (need at least `period` deltas)
/// - Final average loss of exactly zero => `Some(100.0)` (division guard;
///   a series with no down moves is maximally overbought)
/// - Non-finite result => `None`
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // Seed with the mean of the first `period` gains / losses.
    let (sum_gain, sum_loss) =
        deltas[..period]
            .iter()
            .fold((0.0_f64, 0.0_f64), |(g, l), &d| {
                if d > 0.0 {
                    (g + d, l)
                } else {
                    (g, l + d.abs())
                }
            });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    // Wilder smoothing over the remaining deltas.
    for &delta in &deltas[period..] {
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    let value = 100.0 - 100.0 / (1.0 + rs);

    if value.is_finite() {
        Some(round2(value))
    } else {
        None
    }
}
