//! Indicator cache manager.
//!
//! - `IndicatorKey`: indicator identity + parameters (serves as the per-bar cache key)
//! - `IndicatorValue`: one cached value, or `Undefined` while the lookback is short
//! - `ensure_indicator` / `update_indicator`: fill the cache for every bar of a series
//!
//! Values are computed bar by bar in order. The value at index `i` only sees
//! bars `0..=i` and the entry already cached on bar `i - 1`, so extending a
//! series never touches bars that already hold the key.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod wma;

use crate::domain::bar::{Bar, BarSeries};
use crate::domain::error::SignalError;
use std::fmt;

/// Upper bound on indicator periods accepted from configuration.
pub const MAX_PERIOD: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    /// Not enough bars yet for this indicator's lookback.
    Undefined,
    Simple(f64),
    Rsi {
        value: f64,
        avg_gain: f64,
        avg_loss: f64,
    },
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

impl IndicatorValue {
    /// Primary scalar of the value: the average itself, the RSI reading, the
    /// MACD line or the Bollinger middle band.
    pub fn simple(&self) -> Option<f64> {
        match *self {
            IndicatorValue::Undefined => None,
            IndicatorValue::Simple(v) => Some(v),
            IndicatorValue::Rsi { value, .. } => Some(value),
            IndicatorValue::Macd { line, .. } => Some(line),
            IndicatorValue::Bollinger { middle, .. } => Some(middle),
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self, IndicatorValue::Undefined)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorKey {
    Sma(usize),
    Ema(usize),
    Wma(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

impl IndicatorKey {
    /// Build a moving-average key from a kind name such as `"SMA"` or `"ema"`.
    pub fn moving_average(ma_kind: &str, period: usize) -> Result<Self, SignalError> {
        if !(1..=MAX_PERIOD).contains(&period) {
            return Err(SignalError::out_of_range("period", period, 1, MAX_PERIOD));
        }
        match ma_kind.trim().to_uppercase().as_str() {
            "SMA" => Ok(IndicatorKey::Sma(period)),
            "EMA" => Ok(IndicatorKey::Ema(period)),
            "WMA" => Ok(IndicatorKey::Wma(period)),
            _ => Err(SignalError::UnknownIndicator {
                kind: ma_kind.to_string(),
            }),
        }
    }

    /// Smallest number of bars after which the value is defined.
    pub fn lookback(&self) -> usize {
        match *self {
            IndicatorKey::Sma(p)
            | IndicatorKey::Ema(p)
            | IndicatorKey::Wma(p)
            | IndicatorKey::Bollinger { period: p, .. } => p,
            IndicatorKey::Rsi(p) => p + 1,
            IndicatorKey::Macd { fast, slow, signal } => (fast.max(slow) + signal).saturating_sub(1),
        }
    }

    fn compute(&self, bars: &[Bar]) -> IndicatorValue {
        match *self {
            IndicatorKey::Sma(period) => sma::sma_at(bars, period),
            IndicatorKey::Ema(period) => ema::ema_at(bars, period, self),
            IndicatorKey::Wma(period) => wma::wma_at(bars, period),
            IndicatorKey::Rsi(period) => rsi::rsi_at(bars, period, self),
            IndicatorKey::Macd { fast, slow, signal } => {
                macd::macd_at(bars, fast, slow, signal, self)
            }
            IndicatorKey::Bollinger {
                period,
                stddev_mult_x100,
            } => bollinger::bollinger_at(bars, period, stddev_mult_x100),
        }
    }

    /// Keys this indicator reads from the cache; they are filled first.
    fn dependencies(&self) -> Vec<IndicatorKey> {
        match *self {
            IndicatorKey::Macd { fast, slow, .. } => {
                vec![IndicatorKey::Ema(fast), IndicatorKey::Ema(slow)]
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for IndicatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKey::Sma(period) => write!(f, "SMA#{}", period),
            IndicatorKey::Ema(period) => write!(f, "EMA#{}", period),
            IndicatorKey::Wma(period) => write!(f, "WMA#{}", period),
            IndicatorKey::Rsi(period) => write!(f, "RSI#{}", period),
            IndicatorKey::Macd { fast, slow, signal } => {
                write!(f, "MACD#{}#{}#{}", fast, slow, signal)
            }
            IndicatorKey::Bollinger {
                period,
                stddev_mult_x100,
            } => write!(f, "BOLL#{}#{}", period, stddev_mult_x100),
        }
    }
}

/// Make sure every bar in `series` has a value under `key` and return the key.
pub fn ensure_indicator(series: &mut BarSeries, key: IndicatorKey) -> IndicatorKey {
    update_indicator(series, &key);
    key
}

/// Compute `key` for the bars that lack it. Returns how many values were computed.
pub fn update_indicator(series: &mut BarSeries, key: &IndicatorKey) -> usize {
    for dep in key.dependencies() {
        update_indicator(series, &dep);
    }

    let bars = series.bars_mut();
    let start = bars
        .iter()
        .rposition(|b| b.has_indicator(key))
        .map_or(0, |i| i + 1);

    for i in start..bars.len() {
        let value = key.compute(&bars[..=i]);
        bars[i].cache_insert(key, value);
    }

    let computed = bars.len() - start;
    if computed > 0 {
        log::debug!("{}: computed {} of {} bars", key, computed, bars.len());
    }
    computed
}

/// Value of `key` cached on the bar before the last one in `bars`.
pub(crate) fn previous(bars: &[Bar], key: &IndicatorKey) -> Option<IndicatorValue> {
    let n = bars.len();
    if n < 2 {
        return None;
    }
    bars[n - 2].indicator(key).copied()
}

/// Closes of the last `period` bars, or `None` if fewer exist.
pub(crate) fn closes(bars: &[Bar], period: usize) -> Option<impl Iterator<Item = f64> + '_> {
    if period == 0 || bars.len() < period {
        return None;
    }
    Some(bars[bars.len() - period..].iter().map(|b| b.close))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn key_display() {
        assert_eq!(IndicatorKey::Sma(5).to_string(), "SMA#5");
        assert_eq!(
            IndicatorKey::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .to_string(),
            "MACD#12#26#9"
        );
        assert_eq!(
            IndicatorKey::Bollinger {
                period: 20,
                stddev_mult_x100: 200
            }
            .to_string(),
            "BOLL#20#200"
        );
    }

    #[test]
    fn key_hash_eq() {
        let mut map = HashMap::new();
        map.insert(IndicatorKey::Sma(20), "sma20");
        map.insert(IndicatorKey::Ema(20), "ema20");
        assert_eq!(map.get(&IndicatorKey::Sma(20)), Some(&"sma20"));
        assert_eq!(map.get(&IndicatorKey::Ema(20)), Some(&"ema20"));
        assert_eq!(map.get(&IndicatorKey::Sma(21)), None);
    }

    #[test]
    fn moving_average_parses_kind() {
        assert_eq!(
            IndicatorKey::moving_average("sma", 5).unwrap(),
            IndicatorKey::Sma(5)
        );
        assert_eq!(
            IndicatorKey::moving_average("EMA", 10).unwrap(),
            IndicatorKey::Ema(10)
        );
        assert_eq!(
            IndicatorKey::moving_average(" Wma ", 3).unwrap(),
            IndicatorKey::Wma(3)
        );
    }

    #[test]
    fn moving_average_rejects_unknown_kind() {
        let err = IndicatorKey::moving_average("KAMA", 5).unwrap_err();
        assert!(matches!(err, SignalError::UnknownIndicator { kind } if kind == "KAMA"));
    }

    #[test]
    fn moving_average_rejects_zero_period() {
        let err = IndicatorKey::moving_average("SMA", 0).unwrap_err();
        assert!(matches!(err, SignalError::ParamOutOfRange { .. }));
    }

    #[test]
    fn ensure_fills_every_bar() {
        let mut series = make_series(&[1.0, 2.0, 3.0, 4.0]);
        let key = ensure_indicator(&mut series, IndicatorKey::Sma(3));
        assert!(series.bars().iter().all(|b| b.has_indicator(&key)));
        assert_eq!(values(&series, &key), vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn second_update_is_noop() {
        let mut series = make_series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let key = IndicatorKey::Ema(2);
        assert_eq!(update_indicator(&mut series, &key), 5);
        let before = values(&series, &key);
        assert_eq!(update_indicator(&mut series, &key), 0);
        assert_eq!(values(&series, &key), before);
    }

    #[test]
    fn append_only_computes_suffix() {
        let mut series = make_series(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let key = IndicatorKey::Wma(3);
        update_indicator(&mut series, &key);
        let before = values(&series, &key);

        let extended = make_series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        for bar in extended.bars()[5..].iter() {
            series
                .push(Bar::new(
                    bar.dt, bar.open, bar.high, bar.low, bar.close, bar.vol, bar.amount,
                ))
                .unwrap();
        }

        assert_eq!(update_indicator(&mut series, &key), 2);
        let after = values(&series, &key);
        assert_eq!(&after[..5], &before[..]);
        assert_eq!(after.len(), 7);
    }

    #[test]
    fn lookback_longer_than_series_is_undefined() {
        let mut series = make_series(&[1.0, 2.0]);
        let key = ensure_indicator(&mut series, IndicatorKey::Sma(10));
        for bar in series.bars() {
            assert_eq!(bar.indicator(&key), Some(&IndicatorValue::Undefined));
        }
    }

    #[test]
    fn empty_series_is_noop() {
        let mut series = BarSeries::new();
        assert_eq!(update_indicator(&mut series, &IndicatorKey::Rsi(14)), 0);
    }

    #[test]
    fn macd_fills_component_emas() {
        let mut series = make_series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        ensure_indicator(
            &mut series,
            IndicatorKey::Macd {
                fast: 2,
                slow: 3,
                signal: 2,
            },
        );
        let last = series.last().unwrap();
        assert!(last.has_indicator(&IndicatorKey::Ema(2)));
        assert!(last.has_indicator(&IndicatorKey::Ema(3)));
        assert_eq!(last.cached_len(), 3);
    }

    #[test]
    fn lookback_per_kind() {
        assert_eq!(IndicatorKey::Sma(5).lookback(), 5);
        assert_eq!(IndicatorKey::Rsi(14).lookback(), 15);
        assert_eq!(
            IndicatorKey::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .lookback(),
            34
        );
    }

    #[test]
    fn lookback_matches_first_defined_index() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin()).collect();
        let keys = [
            IndicatorKey::Sma(5),
            IndicatorKey::Ema(7),
            IndicatorKey::Wma(4),
            IndicatorKey::Rsi(6),
            IndicatorKey::Macd {
                fast: 5,
                slow: 10,
                signal: 4,
            },
            IndicatorKey::Bollinger {
                period: 8,
                stddev_mult_x100: 200,
            },
        ];
        for key in keys {
            let mut series = make_series(&prices);
            update_indicator(&mut series, &key);
            let first = series
                .bars()
                .iter()
                .position(|b| b.indicator(&key).is_some_and(|v| v.is_defined()))
                .unwrap();
            assert_eq!(first + 1, key.lookback(), "{}", key);
        }
    }
}
