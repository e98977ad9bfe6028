//! RSI (Relative Strength Index) with Wilder's smoothing.
//!
//! - First average: simple mean of gains/losses over the first n price changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss)); 100 when avg_loss == 0.
//! The averages ride along in the cached value so the next bar can continue from them.
//! Undefined for the first n bars.

use crate::domain::bar::Bar;
use crate::domain::indicator::{previous, IndicatorKey, IndicatorValue};

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}

fn split_change(change: f64) -> (f64, f64) {
    (change.max(0.0), (-change).max(0.0))
}

pub fn rsi_at(bars: &[Bar], period: usize, key: &IndicatorKey) -> IndicatorValue {
    if period == 0 || bars.len() <= period {
        return IndicatorValue::Undefined;
    }
    let n = bars.len();

    let (avg_gain, avg_loss) = match previous(bars, key) {
        Some(IndicatorValue::Rsi {
            avg_gain, avg_loss, ..
        }) => {
            let (gain, loss) = split_change(bars[n - 1].close - bars[n - 2].close);
            let p = period as f64;
            (
                (avg_gain * (p - 1.0) + gain) / p,
                (avg_loss * (p - 1.0) + loss) / p,
            )
        }
        _ => {
            let (gains, losses) = bars[n - period - 1..]
                .windows(2)
                .map(|w| split_change(w[1].close - w[0].close))
                .fold((0.0, 0.0), |(g, l), (gain, loss)| (g + gain, l + loss));
            (gains / period as f64, losses / period as f64)
        }
    };

    IndicatorValue::Rsi {
        value: rsi_value(avg_gain, avg_loss),
        avg_gain,
        avg_loss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{make_series, values};
    use crate::domain::indicator::update_indicator;
    use approx::assert_relative_eq;

    fn rsi_values(prices: &[f64], period: usize) -> Vec<Option<f64>> {
        let mut series = make_series(prices);
        update_indicator(&mut series, &IndicatorKey::Rsi(period));
        values(&series, &IndicatorKey::Rsi(period))
    }

    #[test]
    fn rsi_warmup() {
        let v = rsi_values(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(v[..3].iter().all(Option::is_none));
        assert!(v[3].is_some());
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let v = rsi_values(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_relative_eq!(v[3].unwrap(), 100.0);
        assert_relative_eq!(v[4].unwrap(), 100.0);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let v = rsi_values(&[5.0, 4.0, 3.0, 2.0], 3);
        assert_relative_eq!(v[3].unwrap(), 0.0);
    }

    #[test]
    fn rsi_wilder_smoothing() {
        // changes: +2, -1, +1, -2
        let v = rsi_values(&[10.0, 12.0, 11.0, 12.0, 10.0], 3);
        let seed_gain = 3.0 / 3.0;
        let seed_loss = 1.0 / 3.0;
        assert_relative_eq!(v[3].unwrap(), 100.0 - 100.0 / (1.0 + seed_gain / seed_loss));

        let gain = (seed_gain * 2.0 + 0.0) / 3.0;
        let loss = (seed_loss * 2.0 + 2.0) / 3.0;
        assert_relative_eq!(
            v[4].unwrap(),
            100.0 - 100.0 / (1.0 + gain / loss),
            epsilon = 1e-12
        );
    }
}
