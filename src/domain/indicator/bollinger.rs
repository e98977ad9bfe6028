//! Bollinger Bands.
//!
//! - Middle: SMA over n periods
//! - Upper/Lower: Middle ± (multiplier × population StdDev)
//!
//! Multiplier is stored ×100 so the key stays hashable. Undefined for the first (n-1) bars.

use crate::domain::bar::Bar;
use crate::domain::indicator::{closes, IndicatorValue};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;

pub fn bollinger_at(bars: &[Bar], period: usize, stddev_mult_x100: u32) -> IndicatorValue {
    let Some(window) = closes(bars, period) else {
        return IndicatorValue::Undefined;
    };
    let window: Vec<f64> = window.collect();
    let n = period as f64;
    let middle = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|c| (c - middle).powi(2)).sum::<f64>() / n;
    let width = stddev_mult_x100 as f64 / 100.0 * variance.sqrt();

    IndicatorValue::Bollinger {
        upper: middle + width,
        middle,
        lower: middle - width,
    }
}
