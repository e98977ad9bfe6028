//! Weighted Moving Average.
//!
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! Undefined for the first (n-1) bars.

use crate::domain::bar::Bar;
use crate::domain::indicator::{closes, IndicatorValue};

pub fn wma_at(bars: &[Bar], period: usize) -> IndicatorValue {
    let Some(window) = closes(bars, period) else {
        return IndicatorValue::Undefined;
    };
    let divisor = (period * (period + 1)) as f64 / 2.0;
    let weighted: f64 = window
        .enumerate()
        .map(|(i, close)| (i + 1) as f64 * close)
        .sum();
    IndicatorValue::Simple(weighted / divisor)
}
