// =============================================================================
// Trend-Signal Classification — SMA(20) / SMA(50) / SMA(200) alignment
// =============================================================================
//
// The branch order below is load-bearing legacy behavior: once branches 1–3
// have been evaluated, branch 4 is only reachable with sma20 <= sma50, and
// branch 6 only with sma20 >= sma50.  The ordering is kept verbatim for
// output compatibility and pinned by the tests at the bottom of this file.

use crate::types::TrendSignal;

/// Classify the alignment of the three moving averages.
///
/// Returns [`TrendSignal::None`] (the "-" sentinel) when any input is absent
/// or zero — a zero SMA cannot come from a real positive-price series, so it
/// is treated the same as missing data.
pub fn trend_signal(
    sma20: Option<f64>,
    sma50: Option<f64>,
    sma200: Option<f64>,
) -> TrendSignal {
    let (Some(s20), Some(s50), Some(s200)) = (sma20, sma50, sma200) else {
        return TrendSignal::None;
    };
    if s20 == 0.0 || s50 == 0.0 || s200 == 0.0 {
        return TrendSignal::None;
    }

    if s20 > s50 && s50 > s200 {
        TrendSignal::BullishAligned
    } else if s20 < s50 && s50 < s200 {
        TrendSignal::BearishAligned
    } else if s20 > s50 {
        TrendSignal::GoldenCross2050
    } else if s50 > s200 {
        TrendSignal::GoldenCross50200
    } else if s20 < s50 {
        TrendSignal::DeadCross2050
    } else if s50 < s200 {
        TrendSignal::DeadCross50200
    } else {
        TrendSignal::None
    }
}
