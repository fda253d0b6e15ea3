// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of the most recent `period` closing prices.  The window is
// trailing (ends at the latest close), never centered.

use super::round2;

/// Compute the SMA of the last `period` values of `closes`.
///
/// # Edge cases
/// - `period == 0` => `None` (division by zero guard)
/// - `closes.len() < period` => `None`
/// - Non-finite mean => `None`
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let window = &closes[closes.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;

    if mean.is_finite() {
        Some(round2(mean))
    } else {
        None
    }
}
