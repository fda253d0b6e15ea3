// =============================================================================
// 52-Week High / Low
// =============================================================================
//
// Computed over the trailing 252 trading days (one calendar year), or the
// whole series when it is shorter.  Two variants exist because the upstream
// providers differ: the daily-bar provider historically derived the range
// from closing prices only, while the history-bar provider uses true bar
// highs and lows.  Both behaviors are preserved; the provider picks one via
// `ExtremaSource`.

use super::round2;
use crate::types::PriceBar;

/// Trading days in the trailing 52-week window.
pub const TRADING_DAYS_52W: usize = 252;

/// 52-week range from closing prices only (daily-bar provider behavior).
///
/// Returns `(high, low)` rounded to 2 decimals, or `None` for an empty slice.
pub fn range_from_closes(closes: &[f64]) -> Option<(f64, f64)> {
    let window = trailing(closes);
    let first = *window.first()?;

    let (high, low) = window
        .iter()
        .fold((first, first), |(hi, lo), &c| (hi.max(c), lo.min(c)));

    Some((round2(high), round2(low)))
}

/// 52-week range from bar highs and lows (history-bar provider behavior).
pub fn range_from_bars(bars: &[PriceBar]) -> Option<(f64, f64)> {
    let window = trailing(bars);
    let first = window.first()?;

    let (high, low) = window.iter().fold((first.high, first.low), |(hi, lo), b| {
        (hi.max(b.high), lo.min(b.low))
    });

    Some((round2(high), round2(low)))
}

fn trailing<T>(items: &[T]) -> &[T] {
    if items.len() > TRADING_DAYS_52W {
        &items[items.len() - TRADING_DAYS_52W..]
    } else {
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .checked_add_days(chrono::Days::new(day as u64))
                .unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn close_range_empty() {
        assert_eq!(range_from_closes(&[]), None);
    }

    #[test]
    fn close_range_short_series_uses_all_values() {
        let closes = vec![5.0, 1.0, 3.0];
        assert_eq!(range_from_closes(&closes), Some((5.0, 1.0)));
    }

    #[test]
    fn close_range_uses_trailing_252_only() {
        // 300 ascending closes 100.0..=399.0: the last 252 start at 148.0.
        let closes: Vec<f64> = (0..300).map(|i| 100.0 + i as f64).collect();
        assert_eq!(range_from_closes(&closes), Some((399.0, 148.0)));
    }

    #[test]
    fn bar_range_uses_highs_and_lows() {
        let bars = vec![bar(0, 12.0, 9.0, 10.0), bar(1, 15.0, 11.0, 14.0)];
        assert_eq!(range_from_bars(&bars), Some((15.0, 9.0)));
    }

    #[test]
    fn bar_range_trailing_window() {
        let mut bars: Vec<PriceBar> = (0..260)
            .map(|i| bar(i, 100.0 + i as f64, 90.0 + i as f64, 95.0 + i as f64))
            .collect();
        // A spike outside the window must be ignored.
        bars[0].high = 10_000.0;
        let (high, low) = range_from_bars(&bars).unwrap();
        assert_eq!(high, 100.0 + 259.0);
        assert_eq!(low, 90.0 + 8.0); // first bar inside the 252-day window
    }
}
