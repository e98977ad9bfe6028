//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]). Undefined for the first (n-1) bars.

use crate::domain::bar::Bar;
use crate::domain::indicator::{closes, IndicatorValue};

pub fn sma_at(bars: &[Bar], period: usize) -> IndicatorValue {
    match closes(bars, period) {
        Some(window) => IndicatorValue::Simple(window.sum::<f64>() / period as f64),
        None => IndicatorValue::Undefined,
    }
}
