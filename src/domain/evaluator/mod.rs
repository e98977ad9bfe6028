//! Position signal evaluators.
//!
//! Every evaluator follows the same shape:
//! 1. validate its configuration and render its signal key (errors are fatal)
//! 2. look up the kline for the configured frequency
//! 3. return the neutral signal unless the named position is holding
//! 4. scan at most the last `BAR_WINDOW` bars and classify
//!
//! Nothing past step 2 can fail: missing data always maps to `Other`.

pub mod bar_stop;
pub mod fx_stop;
pub mod holds;
pub mod ma_break;

use crate::domain::bar::{Bar, BarSeries};
use crate::domain::error::SignalError;
use crate::domain::fractal::Fractal;
use crate::domain::position::{Operate, PositionBook};
use crate::domain::signal::{Outcome, Signal, SignalKey, Template, OTHER};
use chrono::NaiveDateTime;
use std::collections::HashMap;

pub use bar_stop::{pos_bar_stop, BarStopConfig};
pub use fx_stop::{pos_fx_stop, FxStopConfig};
pub use holds::{pos_holds, HoldsConfig, HoldsOutcome};
pub use ma_break::{pos_ma, MaBreakConfig, MaBreakOutcome};

/// Most recent bars any evaluator looks at.
pub const BAR_WINDOW: usize = 100;

/// Bars and fractals of one frequency.
#[derive(Debug, Clone, Default)]
pub struct Kline {
    pub bars: BarSeries,
    pub fractals: Vec<Fractal>,
}

impl Kline {
    pub fn new(bars: BarSeries, fractals: Vec<Fractal>) -> Self {
        Self { bars, fractals }
    }

    /// Bars of the scan window.
    pub fn window(&self) -> &[Bar] {
        self.bars.tail(BAR_WINDOW)
    }

    /// Window bars strictly after `dt`, oldest first.
    pub fn bars_after(&self, dt: NaiveDateTime) -> impl Iterator<Item = &Bar> {
        self.window().iter().filter(move |b| b.dt > dt)
    }

    /// The last `n` window bars strictly before `dt`, oldest first.
    pub fn bars_before(&self, dt: NaiveDateTime, n: usize) -> &[Bar] {
        let window = self.window();
        let end = window.partition_point(|b| b.dt < dt);
        &window[end.saturating_sub(n)..end]
    }
}

/// Everything an evaluator reads for one call.
pub struct SignalContext<'a> {
    pub klines: &'a mut HashMap<String, Kline>,
    /// `None` when the caller does not track positions.
    pub positions: Option<&'a PositionBook>,
    /// Latest traded price, the reference for stop checks.
    pub latest_price: f64,
}

impl<'a> SignalContext<'a> {
    pub fn new(
        klines: &'a mut HashMap<String, Kline>,
        positions: Option<&'a PositionBook>,
        latest_price: f64,
    ) -> Self {
        Self {
            klines,
            positions,
            latest_price,
        }
    }

    pub fn kline(&self, freq: &str) -> Result<&Kline, SignalError> {
        self.klines
            .get(freq)
            .ok_or_else(|| SignalError::UnknownFrequency {
                freq: freq.to_string(),
            })
    }

    pub fn kline_mut(&mut self, freq: &str) -> Result<&mut Kline, SignalError> {
        self.klines
            .get_mut(freq)
            .ok_or_else(|| SignalError::UnknownFrequency {
                freq: freq.to_string(),
            })
    }

    /// Opening operate of `pos_name`, or `None` if there is no position book,
    /// no such position, or the position is flat.
    pub fn holding(&self, pos_name: &str) -> Option<&'a Operate> {
        self.positions?.get(pos_name)?.holding()
    }
}

pub(crate) fn neutral(key: &SignalKey) -> Signal {
    Signal::new(key, &[OTHER])
}

pub(crate) fn finish<O: Outcome + std::fmt::Debug>(key: &SignalKey, outcome: O) -> Signal {
    let signal = Signal::from_outcome(key, outcome);
    log::trace!("{} -> {:?}", key, outcome);
    signal
}

pub(crate) fn check_range(
    param: &str,
    value: usize,
    min: usize,
    max: usize,
) -> Result<(), SignalError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(SignalError::out_of_range(param, value, min, max))
    }
}

/// Any of the four evaluators with its configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalConfig {
    MaBreak(MaBreakConfig),
    FxStop(FxStopConfig),
    BarStop(BarStopConfig),
    Holds(HoldsConfig),
}

impl SignalConfig {
    pub fn kind(&self) -> &'static str {
        self.template().name
    }

    pub fn template(&self) -> &'static Template {
        match self {
            SignalConfig::MaBreak(_) => &ma_break::TEMPLATE,
            SignalConfig::FxStop(_) => &fx_stop::TEMPLATE,
            SignalConfig::BarStop(_) => &bar_stop::TEMPLATE,
            SignalConfig::Holds(_) => &holds::TEMPLATE,
        }
    }

    pub fn freq(&self) -> &str {
        match self {
            SignalConfig::MaBreak(c) => &c.freq,
            SignalConfig::FxStop(c) => &c.freq,
            SignalConfig::BarStop(c) => &c.freq,
            SignalConfig::Holds(c) => &c.freq,
        }
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        match self {
            SignalConfig::MaBreak(c) => c.validate(),
            SignalConfig::FxStop(c) => c.validate(),
            SignalConfig::BarStop(c) => c.validate(),
            SignalConfig::Holds(c) => c.validate(),
        }
    }

    pub fn key(&self) -> Result<SignalKey, SignalError> {
        match self {
            SignalConfig::MaBreak(c) => c.key(),
            SignalConfig::FxStop(c) => c.key(),
            SignalConfig::BarStop(c) => c.key(),
            SignalConfig::Holds(c) => c.key(),
        }
    }

    pub fn evaluate(&self, ctx: &mut SignalContext<'_>) -> Result<Signal, SignalError> {
        match self {
            SignalConfig::MaBreak(c) => pos_ma(ctx, c),
            SignalConfig::FxStop(c) => pos_fx_stop(ctx, c),
            SignalConfig::BarStop(c) => pos_bar_stop(ctx, c),
            SignalConfig::Holds(c) => pos_holds(ctx, c),
        }
    }
}

/// One evaluator as listed by the catalog.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub template: &'static Template,
    /// `v1_v2_v3` for each outcome, neutral first.
    pub outcomes: Vec<String>,
}

fn catalog_entry<O: Outcome>(template: &'static Template) -> CatalogEntry {
    let outcomes = O::ALL
        .iter()
        .map(|o| {
            let key = SignalKey {
                k1: String::new(),
                k2: String::new(),
                k3: String::new(),
            };
            let s = Signal::from_outcome(&key, *o);
            format!("{}_{}_{}", s.v1, s.v2, s.v3)
        })
        .collect();
    CatalogEntry { template, outcomes }
}

/// Templates and outcome sets of every evaluator.
pub fn catalog() -> Vec<CatalogEntry> {
    vec![
        catalog_entry::<MaBreakOutcome>(&ma_break::TEMPLATE),
        catalog_entry::<fx_stop::StopOutcome>(&fx_stop::TEMPLATE),
        catalog_entry::<fx_stop::StopOutcome>(&bar_stop::TEMPLATE),
        catalog_entry::<HoldsOutcome>(&holds::TEMPLATE),
    ]
}
