//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with SMA(n) on bar n-1, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! The previous EMA is read from the bar cache, so each step is O(1) after the seed.

use crate::domain::bar::Bar;
use crate::domain::indicator::{previous, sma, IndicatorKey, IndicatorValue};

pub fn smoothing(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

pub fn ema_step(value: f64, prev: f64, period: usize) -> f64 {
    let k = smoothing(period);
    value * k + prev * (1.0 - k)
}

pub fn ema_at(bars: &[Bar], period: usize, key: &IndicatorKey) -> IndicatorValue {
    if period == 0 || bars.len() < period {
        return IndicatorValue::Undefined;
    }
    let close = bars[bars.len() - 1].close;
    match previous(bars, key).and_then(|v| v.simple()) {
        Some(prev) if bars.len() > period => IndicatorValue::Simple(ema_step(close, prev, period)),
        _ => sma::sma_at(bars, period),
    }
}
