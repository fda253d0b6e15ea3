// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators derived for every
// ticker snapshot.  Every public function returns `Option<T>` so callers are
// forced to handle insufficient-data and numerical-edge-case scenarios.

pub mod extrema;
pub mod rsi;
pub mod sma;
pub mod trend;

/// Round to 2 decimal places (prices, ratios, indicator values).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 4 decimal places (percentage fields).
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
