//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded with the mean of its first `signal` values
//! Histogram = MACD Line - Signal Line
//!
//! The two EMAs are cached under their own keys and filled before MACD, so the
//! line for any earlier bar is a cache read. Undefined until the signal line exists.

use crate::domain::bar::Bar;
use crate::domain::indicator::{ema, previous, IndicatorKey, IndicatorValue};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

fn line_at(bar: &Bar, fast: usize, slow: usize) -> Option<f64> {
    let f = bar.indicator(&IndicatorKey::Ema(fast))?.simple()?;
    let s = bar.indicator(&IndicatorKey::Ema(slow))?.simple()?;
    Some(f - s)
}

pub fn macd_at(
    bars: &[Bar],
    fast: usize,
    slow: usize,
    signal_period: usize,
    key: &IndicatorKey,
) -> IndicatorValue {
    if fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorValue::Undefined;
    }
    let Some(last) = bars.last() else {
        return IndicatorValue::Undefined;
    };
    let Some(line) = line_at(last, fast, slow) else {
        return IndicatorValue::Undefined;
    };

    let signal = match previous(bars, key) {
        Some(IndicatorValue::Macd { signal: prev, .. }) => {
            ema::ema_step(line, prev, signal_period)
        }
        _ => {
            if bars.len() < signal_period {
                return IndicatorValue::Undefined;
            }
            let seed: Option<Vec<f64>> = bars[bars.len() - signal_period..]
                .iter()
                .map(|b| line_at(b, fast, slow))
                .collect();
            match seed {
                Some(lines) => lines.iter().sum::<f64>() / signal_period as f64,
                None => return IndicatorValue::Undefined,
            }
        }
    };

    IndicatorValue::Macd {
        line,
        signal,
        histogram: line - signal,
    }
}
