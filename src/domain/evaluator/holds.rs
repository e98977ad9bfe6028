//! Trend check while holding.
//!
//! Once `n` bars have closed after the open, the return of the latest close
//! against the open price (in basis points, signed by direction) is compared
//! with `m`: below it the position is `Weak`, otherwise `Strong`.

use crate::domain::error::SignalError;
use crate::domain::evaluator::{check_range, finish, neutral, SignalContext, BAR_WINDOW};
use crate::domain::position::OperateKind;
use crate::domain::signal::{Outcome, Segment, Signal, SignalKey, Template, TemplateParams};

pub const DEFAULT_N: usize = 5;
pub const DEFAULT_M: i64 = 100;

pub const TEMPLATE: Template = Template {
    name: "pos_holds",
    version: "TrendCheckV230414",
    slots: [
        &[Segment::Field("pos_name")],
        &[
            Segment::Field("freq"),
            Segment::Lit("N"),
            Segment::Field("n"),
            Segment::Lit("M"),
            Segment::Field("m"),
        ],
        &[Segment::Version],
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldsOutcome {
    Other,
    LongWeak,
    LongStrong,
    ShortWeak,
    ShortStrong,
}

impl Outcome for HoldsOutcome {
    const ALL: &'static [Self] = &[
        HoldsOutcome::Other,
        HoldsOutcome::LongWeak,
        HoldsOutcome::LongStrong,
        HoldsOutcome::ShortWeak,
        HoldsOutcome::ShortStrong,
    ];

    fn values(&self) -> &'static [&'static str] {
        match self {
            HoldsOutcome::Other => &["Other"],
            HoldsOutcome::LongWeak => &["LongWeak"],
            HoldsOutcome::LongStrong => &["LongStrong"],
            HoldsOutcome::ShortWeak => &["ShortWeak"],
            HoldsOutcome::ShortStrong => &["ShortStrong"],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldsConfig {
    pub pos_name: String,
    pub freq: String,
    /// Bars that must have closed after the open before judging.
    pub n: usize,
    /// Return threshold in basis points.
    pub m: i64,
}

impl HoldsConfig {
    pub fn new(pos_name: impl Into<String>, freq: impl Into<String>) -> Self {
        Self {
            pos_name: pos_name.into(),
            freq: freq.into(),
            n: DEFAULT_N,
            m: DEFAULT_M,
        }
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        // n bars after the open must fit in the scan window
        check_range("n", self.n, 1, BAR_WINDOW)
    }

    pub fn key(&self) -> Result<SignalKey, SignalError> {
        TEMPLATE.render(self)
    }
}

impl TemplateParams for HoldsConfig {
    fn param(&self, field: &str) -> Option<String> {
        match field {
            "pos_name" => Some(self.pos_name.clone()),
            "freq" => Some(self.freq.clone()),
            "n" => Some(self.n.to_string()),
            "m" => Some(self.m.to_string()),
            _ => None,
        }
    }
}

/// Return of `close` against `open_price` in basis points; positive when the
/// position is in profit.
pub fn return_bp(op: OperateKind, open_price: f64, close: f64) -> f64 {
    let change = match op {
        OperateKind::ShortOpen | OperateKind::ShortExit => open_price - close,
        OperateKind::LongOpen | OperateKind::LongExit => close - open_price,
    };
    change / open_price * 10000.0
}

pub fn pos_holds(ctx: &SignalContext<'_>, cfg: &HoldsConfig) -> Result<Signal, SignalError> {
    cfg.validate()?;
    let key = cfg.key()?;
    let kline = ctx.kline(&cfg.freq)?;

    let Some(op) = ctx.holding(&cfg.pos_name) else {
        return Ok(neutral(&key));
    };
    if op.price <= 0.0 {
        return Ok(neutral(&key));
    }

    let (count, last) = kline
        .bars_after(op.dt)
        .fold((0usize, None), |(count, _), bar| (count + 1, Some(bar)));
    let Some(last) = last.filter(|_| count >= cfg.n) else {
        return Ok(neutral(&key));
    };

    let weak = return_bp(op.op, op.price, last.close) < cfg.m as f64;
    let outcome = match (op.op, weak) {
        (OperateKind::LongOpen, true) => HoldsOutcome::LongWeak,
        (OperateKind::LongOpen, false) => HoldsOutcome::LongStrong,
        (OperateKind::ShortOpen, true) => HoldsOutcome::ShortWeak,
        (OperateKind::ShortOpen, false) => HoldsOutcome::ShortStrong,
        _ => HoldsOutcome::Other,
    };
    Ok(finish(&key, outcome))
}
