//! Stop loss on the extremes of the `n` bars just before the open.

use crate::domain::error::SignalError;
use crate::domain::evaluator::fx_stop::stop_outcome;
use crate::domain::evaluator::{check_range, finish, neutral, SignalContext};
use crate::domain::signal::{Segment, Signal, SignalKey, Template, TemplateParams};

pub const DEFAULT_N: usize = 3;
pub const MIN_N: usize = 1;
pub const MAX_N: usize = 20;

pub const TEMPLATE: Template = Template {
    name: "pos_bar_stop",
    version: "StopLossV230524",
    slots: [
        &[Segment::Field("pos_name")],
        &[
            Segment::Field("freq"),
            Segment::Lit("N"),
            Segment::Field("n"),
            Segment::Lit("K"),
        ],
        &[Segment::Version],
    ],
};

#[derive(Debug, Clone, PartialEq)]
pub struct BarStopConfig {
    pub pos_name: String,
    pub freq: String,
    pub n: usize,
}

impl BarStopConfig {
    pub fn new(pos_name: impl Into<String>, freq: impl Into<String>) -> Self {
        Self {
            pos_name: pos_name.into(),
            freq: freq.into(),
            n: DEFAULT_N,
        }
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        check_range("n", self.n, MIN_N, MAX_N)
    }

    pub fn key(&self) -> Result<SignalKey, SignalError> {
        TEMPLATE.render(self)
    }
}

impl TemplateParams for BarStopConfig {
    fn param(&self, field: &str) -> Option<String> {
        match field {
            "pos_name" => Some(self.pos_name.clone()),
            "freq" => Some(self.freq.clone()),
            "n" => Some(self.n.to_string()),
            _ => None,
        }
    }
}

pub fn pos_bar_stop(ctx: &SignalContext<'_>, cfg: &BarStopConfig) -> Result<Signal, SignalError> {
    cfg.validate()?;
    let key = cfg.key()?;
    let kline = ctx.kline(&cfg.freq)?;

    let Some(op) = ctx.holding(&cfg.pos_name) else {
        return Ok(neutral(&key));
    };

    let bars = kline.bars_before(op.dt, cfg.n);
    let outcome = stop_outcome(
        op.op,
        ctx.latest_price,
        bars.iter().map(|b| b.low),
        bars.iter().map(|b| b.high),
    );
    Ok(finish(&key, outcome))
}
