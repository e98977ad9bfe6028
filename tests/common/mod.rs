#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use possig::domain::bar::{Bar, BarSeries};
use possig::domain::evaluator::Kline;
use possig::domain::fractal::{Fractal, Mark};
use possig::domain::position::{Operate, OperateKind, Position, PositionBook};
use std::collections::HashMap;

pub const FREQ: &str = "60m";
pub const POS: &str = "trend";

/// Hourly timestamps from 2024-03-01 09:00; negative offsets are allowed.
pub fn t(i: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
        + Duration::hours(i)
}

pub fn make_bar(i: i64, low: f64, high: f64, close: f64) -> Bar {
    Bar::new(t(i), close, high, low, close, 1000.0, close * 1000.0)
}

/// Bars at consecutive hours starting at `t(start)`, with high and low equal to
/// the close.
pub fn bars_from(start: i64, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(start + i as i64, c, c, c))
        .collect()
}

pub fn kline_map(bars: Vec<Bar>, fractals: Vec<Fractal>) -> HashMap<String, Kline> {
    HashMap::from([(
        FREQ.to_string(),
        Kline::new(BarSeries::from_bars(bars).unwrap(), fractals),
    )])
}

pub fn make_fractal(mark: Mark, i: i64, high: f64, low: f64) -> Fractal {
    Fractal {
        mark,
        dt: t(i),
        fx: if mark == Mark::Top { high } else { low },
        high,
        low,
        index: 0,
    }
}

pub fn holding(op: OperateKind, i: i64, price: f64) -> PositionBook {
    let mut pos = Position::new(POS);
    pos.operates.push(Operate {
        op,
        dt: t(i),
        price,
    });
    PositionBook::new().with_position(pos)
}
