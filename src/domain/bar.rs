//! Price bars and the append-only bar series.
//!
//! Each bar carries its own indicator cache. Core fields never change once a
//! bar is in a series; the cache only gains entries.

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorKey, IndicatorValue};
use chrono::NaiveDateTime;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Bar {
    pub dt: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub vol: f64,
    pub amount: f64,
    cache: HashMap<IndicatorKey, IndicatorValue>,
}

impl Bar {
    pub fn new(
        dt: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        vol: f64,
        amount: f64,
    ) -> Self {
        Self {
            dt,
            open,
            high,
            low,
            close,
            vol,
            amount,
            cache: HashMap::new(),
        }
    }

    /// Cached indicator value, if the key has been computed for this bar.
    pub fn indicator(&self, key: &IndicatorKey) -> Option<&IndicatorValue> {
        self.cache.get(key)
    }

    pub fn has_indicator(&self, key: &IndicatorKey) -> bool {
        self.cache.contains_key(key)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Entries are written once; a second insert under the same key is ignored.
    pub(crate) fn cache_insert(&mut self, key: &IndicatorKey, value: IndicatorValue) {
        self.cache.entry(key.clone()).or_insert(value);
    }
}

/// Ordered, append-only sequence of bars for one frequency.
#[derive(Debug, Clone, Default)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self { bars: Vec::new() }
    }

    /// Build a series from bars already sorted by `dt`.
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, SignalError> {
        let mut series = Self::new();
        for bar in bars {
            series.push(bar)?;
        }
        Ok(series)
    }

    /// Append a bar; its `dt` must be strictly after the current last bar.
    pub fn push(&mut self, bar: Bar) -> Result<(), SignalError> {
        if let Some(last) = self.bars.last() {
            if bar.dt <= last.dt {
                return Err(SignalError::OutOfOrder {
                    dt: bar.dt.to_string(),
                    last: last.dt.to_string(),
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// The most recent `n` bars (all of them if fewer exist).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }

    pub(crate) fn bars_mut(&mut self) -> &mut [Bar] {
        &mut self.bars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample_bar(hour: u32, close: f64) -> Bar {
        Bar::new(at(hour), close, close + 1.0, close - 1.0, close, 1000.0, close * 1000.0)
    }

    #[test]
    fn push_keeps_order() {
        let mut series = BarSeries::new();
        series.push(sample_bar(9, 100.0)).unwrap();
        series.push(sample_bar(10, 101.0)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().close, 101.0);
    }

    #[test]
    fn push_rejects_out_of_order() {
        let mut series = BarSeries::new();
        series.push(sample_bar(10, 100.0)).unwrap();
        let err = series.push(sample_bar(9, 99.0)).unwrap_err();
        assert!(matches!(err, SignalError::OutOfOrder { .. }));

        let err = series.push(sample_bar(10, 99.0)).unwrap_err();
        assert!(matches!(err, SignalError::OutOfOrder { .. }));
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn tail_bounds() {
        let series =
            BarSeries::from_bars((0..5).map(|h| sample_bar(h, 100.0 + h as f64)).collect())
                .unwrap();
        assert_eq!(series.tail(3).len(), 3);
        assert_eq!(series.tail(3)[0].close, 102.0);
        assert_eq!(series.tail(100).len(), 5);
        assert!(BarSeries::new().tail(10).is_empty());
    }

    #[test]
    fn cache_insert_is_write_once() {
        let mut bar = sample_bar(9, 100.0);
        let key = IndicatorKey::Sma(5);
        bar.cache_insert(&key, IndicatorValue::Simple(1.0));
        bar.cache_insert(&key, IndicatorValue::Simple(2.0));
        assert_eq!(bar.indicator(&key).and_then(|v| v.simple()), Some(1.0));
        assert_eq!(bar.cached_len(), 1);
        assert!(bar.has_indicator(&key));
        assert!(!bar.has_indicator(&IndicatorKey::Ema(5)));
    }
}
