//! Stop loss on the fractals just before the open.
//!
//! Long: the lowest of the last `n` bottom fractals before the open is the
//! stop; the latest price below it gives `LongStop`. Short mirrors this with
//! top fractals and their highest point.

use crate::domain::error::SignalError;
use crate::domain::evaluator::{check_range, finish, neutral, SignalContext};
use crate::domain::fractal::{last_before, Mark};
use crate::domain::position::OperateKind;
use crate::domain::signal::{Outcome, Segment, Signal, SignalKey, Template, TemplateParams};

pub const DEFAULT_N: usize = 3;
pub const MAX_N: usize = 100;

pub const TEMPLATE: Template = Template {
    name: "pos_fx_stop",
    version: "StopLossV230414",
    slots: [
        &[Segment::Field("freq")],
        &[Segment::Field("pos_name"), Segment::Lit("N"), Segment::Field("n")],
        &[Segment::Version],
    ],
};

/// Outcomes shared by the fractal and bar stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Other,
    LongStop,
    ShortStop,
}

impl Outcome for StopOutcome {
    const ALL: &'static [Self] = &[StopOutcome::Other, StopOutcome::LongStop, StopOutcome::ShortStop];

    fn values(&self) -> &'static [&'static str] {
        match self {
            StopOutcome::Other => &["Other"],
            StopOutcome::LongStop => &["LongStop"],
            StopOutcome::ShortStop => &["ShortStop"],
        }
    }
}

/// Compare `price` against the lows (long) or highs (short) of a reference set.
/// An empty set never triggers.
pub(crate) fn stop_outcome(
    op: OperateKind,
    price: f64,
    lows: impl Iterator<Item = f64>,
    highs: impl Iterator<Item = f64>,
) -> StopOutcome {
    match op {
        OperateKind::LongOpen => match lows.reduce(f64::min) {
            Some(low) if price < low => StopOutcome::LongStop,
            _ => StopOutcome::Other,
        },
        OperateKind::ShortOpen => match highs.reduce(f64::max) {
            Some(high) if price > high => StopOutcome::ShortStop,
            _ => StopOutcome::Other,
        },
        OperateKind::LongExit | OperateKind::ShortExit => StopOutcome::Other,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FxStopConfig {
    pub pos_name: String,
    pub freq: String,
    pub n: usize,
}

impl FxStopConfig {
    pub fn new(pos_name: impl Into<String>, freq: impl Into<String>) -> Self {
        Self {
            pos_name: pos_name.into(),
            freq: freq.into(),
            n: DEFAULT_N,
        }
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        check_range("n", self.n, 1, MAX_N)
    }

    pub fn key(&self) -> Result<SignalKey, SignalError> {
        TEMPLATE.render(self)
    }
}

impl TemplateParams for FxStopConfig {
    fn param(&self, field: &str) -> Option<String> {
        match field {
            "pos_name" => Some(self.pos_name.clone()),
            "freq" => Some(self.freq.clone()),
            "n" => Some(self.n.to_string()),
            _ => None,
        }
    }
}

pub fn pos_fx_stop(ctx: &SignalContext<'_>, cfg: &FxStopConfig) -> Result<Signal, SignalError> {
    cfg.validate()?;
    let key = cfg.key()?;
    let kline = ctx.kline(&cfg.freq)?;

    let Some(op) = ctx.holding(&cfg.pos_name) else {
        return Ok(neutral(&key));
    };

    let mark = match op.op {
        OperateKind::ShortOpen => Mark::Top,
        _ => Mark::Bottom,
    };
    let fxs = last_before(&kline.fractals, mark, op.dt, cfg.n);
    let outcome = stop_outcome(
        op.op,
        ctx.latest_price,
        fxs.iter().map(|f| f.low),
        fxs.iter().map(|f| f.high),
    );
    Ok(finish(&key, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluator::test_support::*;

    fn cfg() -> FxStopConfig {
        FxStopConfig::new("pos", FREQ)
    }

    fn bottoms() -> Vec<crate::domain::fractal::Fractal> {
        vec![
            fractal(Mark::Bottom, 1, 95.0),
            fractal(Mark::Top, 2, 110.0),
            fractal(Mark::Bottom, 3, 97.0),
            fractal(Mark::Top, 4, 108.0),
            fractal(Mark::Bottom, 5, 98.0),
            fractal(Mark::Bottom, 7, 99.0),
        ]
    }

    #[test]
    fn key_from_template() {
        assert_eq!(cfg().key().unwrap().to_string(), "60m_posN3_StopLossV230414");
    }

    #[test]
    fn zero_n_is_error() {
        let mut c = cfg();
        c.n = 0;
        let mut k = klines(flat_bars(&[1.0]), vec![]);
        let ctx = SignalContext::new(&mut k, None, 1.0);
        assert!(matches!(
            pos_fx_stop(&ctx, &c),
            Err(SignalError::ParamOutOfRange { .. })
        ));
    }

    #[test]
    fn long_stop_below_lowest_bottom() {
        let book = book(OperateKind::LongOpen, 6, 100.0);
        let mut k = klines(flat_bars(&[100.0; 8]), bottoms());
        // bottoms before t6: 95, 97, 98; last three -> min 95
        let ctx = SignalContext::new(&mut k, Some(&book), 94.0);
        assert_eq!(pos_fx_stop(&ctx, &cfg()).unwrap().v1, "LongStop");

        let ctx = SignalContext::new(&mut k, Some(&book), 95.0);
        assert!(pos_fx_stop(&ctx, &cfg()).unwrap().is_neutral());
    }

    #[test]
    fn long_uses_only_last_n() {
        let book = book(OperateKind::LongOpen, 6, 100.0);
        let mut k = klines(flat_bars(&[100.0; 8]), bottoms());
        let mut c = cfg();
        c.n = 2;
        // last two bottoms before t6: 97, 98
        let ctx = SignalContext::new(&mut k, Some(&book), 96.0);
        assert_eq!(pos_fx_stop(&ctx, &c).unwrap().v1, "LongStop");
    }

    #[test]
    fn short_stop_above_highest_top() {
        let book = book(OperateKind::ShortOpen, 6, 100.0);
        let mut k = klines(flat_bars(&[100.0; 8]), bottoms());
        let ctx = SignalContext::new(&mut k, Some(&book), 110.5);
        assert_eq!(pos_fx_stop(&ctx, &cfg()).unwrap().v1, "ShortStop");

        let ctx = SignalContext::new(&mut k, Some(&book), 109.0);
        assert!(pos_fx_stop(&ctx, &cfg()).unwrap().is_neutral());
    }

    #[test]
    fn fewer_fractals_than_n_uses_available() {
        let fractals = vec![fractal(Mark::Bottom, 2, 97.0), fractal(Mark::Top, 3, 104.0)];
        let book = book(OperateKind::LongOpen, 5, 100.0);
        let mut k = klines(flat_bars(&[100.0; 8]), fractals);
        let ctx = SignalContext::new(&mut k, Some(&book), 96.0);
        assert_eq!(
            pos_fx_stop(&ctx, &cfg()).unwrap().to_string(),
            "60m_posN3_StopLossV230414_LongStop_Any_Any_0"
        );

        let ctx = SignalContext::new(&mut k, Some(&book), 97.5);
        assert!(pos_fx_stop(&ctx, &cfg()).unwrap().is_neutral());
    }

    #[test]
    fn no_fractals_before_open_is_neutral() {
        let book = book(OperateKind::LongOpen, 0, 100.0);
        let mut k = klines(flat_bars(&[100.0; 8]), bottoms());
        let ctx = SignalContext::new(&mut k, Some(&book), 1.0);
        assert!(pos_fx_stop(&ctx, &cfg()).unwrap().is_neutral());
    }

    #[test]
    fn stop_outcome_empty_set() {
        let out = stop_outcome(
            OperateKind::LongOpen,
            0.0,
            std::iter::empty(),
            std::iter::empty(),
        );
        assert_eq!(out, StopOutcome::Other);
    }
}
