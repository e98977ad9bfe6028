//! Moving-average breakout after opening.
//!
//! Long: the first bar after the open whose close is above its MA gives
//! `Long_AboveMa`. Short: first close below the MA gives `Short_BelowMa`.

use crate::domain::bar::Bar;
use crate::domain::error::SignalError;
use crate::domain::evaluator::{finish, SignalContext};
use crate::domain::indicator::{ensure_indicator, IndicatorKey};
use crate::domain::position::OperateKind;
use crate::domain::signal::{Outcome, Segment, Signal, SignalKey, Template, TemplateParams};
use chrono::NaiveDateTime;

pub const DEFAULT_MA_KIND: &str = "SMA";
pub const DEFAULT_PERIOD: usize = 5;

pub const TEMPLATE: Template = Template {
    name: "pos_ma",
    version: "HoldStateV230414",
    slots: [
        &[Segment::Field("pos_name")],
        &[
            Segment::Field("freq"),
            Segment::Lit("#"),
            Segment::Field("ma_kind"),
            Segment::Lit("#"),
            Segment::Field("period"),
        ],
        &[Segment::Version],
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaBreakOutcome {
    Other,
    LongAboveMa,
    ShortBelowMa,
}

impl Outcome for MaBreakOutcome {
    const ALL: &'static [Self] = &[
        MaBreakOutcome::Other,
        MaBreakOutcome::LongAboveMa,
        MaBreakOutcome::ShortBelowMa,
    ];

    fn values(&self) -> &'static [&'static str] {
        match self {
            MaBreakOutcome::Other => &["Other"],
            MaBreakOutcome::LongAboveMa => &["Long", "AboveMa"],
            MaBreakOutcome::ShortBelowMa => &["Short", "BelowMa"],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaBreakConfig {
    pub pos_name: String,
    pub freq: String,
    pub ma_kind: String,
    pub period: usize,
}

impl MaBreakConfig {
    pub fn new(pos_name: impl Into<String>, freq: impl Into<String>) -> Self {
        Self {
            pos_name: pos_name.into(),
            freq: freq.into(),
            ma_kind: DEFAULT_MA_KIND.to_string(),
            period: DEFAULT_PERIOD,
        }
    }

    pub fn indicator(&self) -> Result<IndicatorKey, SignalError> {
        IndicatorKey::moving_average(&self.ma_kind, self.period)
    }

    pub fn validate(&self) -> Result<(), SignalError> {
        self.indicator().map(|_| ())
    }

    pub fn key(&self) -> Result<SignalKey, SignalError> {
        TEMPLATE.render(self)
    }
}

impl TemplateParams for MaBreakConfig {
    fn param(&self, field: &str) -> Option<String> {
        match field {
            "pos_name" => Some(self.pos_name.clone()),
            "freq" => Some(self.freq.clone()),
            "ma_kind" => Some(self.ma_kind.trim().to_uppercase()),
            "period" => Some(self.period.to_string()),
            _ => None,
        }
    }
}

pub fn pos_ma(ctx: &mut SignalContext<'_>, cfg: &MaBreakConfig) -> Result<Signal, SignalError> {
    let key = cfg.key()?;
    let hit = breakout_bar(ctx, cfg)?;

    let outcome = match (ctx.holding(&cfg.pos_name).map(|op| op.op), hit) {
        (Some(OperateKind::LongOpen), Some(_)) => MaBreakOutcome::LongAboveMa,
        (Some(OperateKind::ShortOpen), Some(_)) => MaBreakOutcome::ShortBelowMa,
        _ => MaBreakOutcome::Other,
    };
    Ok(finish(&key, outcome))
}

/// Time of the first bar after the open that closes beyond its MA, if any.
pub fn breakout_bar(
    ctx: &mut SignalContext<'_>,
    cfg: &MaBreakConfig,
) -> Result<Option<NaiveDateTime>, SignalError> {
    let ma = cfg.indicator()?;
    // The MA cache is kept current even when there is nothing to evaluate.
    let ma = ensure_indicator(&mut ctx.kline_mut(&cfg.freq)?.bars, ma);
    let Some(op) = ctx.holding(&cfg.pos_name) else {
        return Ok(None);
    };
    let long = op.op == OperateKind::LongOpen;
    let broke = |bar: &&Bar| match bar.indicator(&ma).and_then(|v| v.simple()) {
        Some(m) if long => bar.close > m,
        Some(m) => bar.close < m,
        None => false,
    };
    Ok(ctx.kline(&cfg.freq)?.bars_after(op.dt).find(broke).map(|b| b.dt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evaluator::test_support::*;
    use crate::domain::evaluator::Kline;
    use crate::domain::position::PositionBook;

    fn cfg() -> MaBreakConfig {
        MaBreakConfig::new("pos", FREQ)
    }

    #[test]
    fn key_from_template() {
        let mut c = cfg();
        c.ma_kind = "ema".into();
        c.period = 10;
        assert_eq!(c.key().unwrap().to_string(), "pos_60m#EMA#10_HoldStateV230414");
    }

    #[test]
    fn unknown_ma_kind_is_error() {
        let mut c = cfg();
        c.ma_kind = "HMA".into();
        let mut k = klines(flat_bars(&[1.0]), vec![]);
        let mut ctx = SignalContext::new(&mut k, None, 1.0);
        assert!(matches!(
            pos_ma(&mut ctx, &c),
            Err(SignalError::UnknownIndicator { .. })
        ));
    }

    #[test]
    fn no_book_is_neutral_but_cache_filled() {
        let mut k = klines(flat_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), vec![]);
        let mut ctx = SignalContext::new(&mut k, None, 6.0);
        let signal = pos_ma(&mut ctx, &cfg()).unwrap();
        assert!(signal.is_neutral());
        assert_eq!(signal.v2, "Any");
        let kline: &Kline = &k[FREQ];
        assert!(kline
            .bars
            .bars()
            .iter()
            .all(|b| b.has_indicator(&IndicatorKey::Sma(5))));
    }

    #[test]
    fn long_breaks_above() {
        // rising closes: close is above the trailing SMA once it is defined
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let book = book(OperateKind::LongOpen, 2, 102.0);
        let mut k = klines(flat_bars(&closes), vec![]);
        let mut ctx = SignalContext::new(&mut k, Some(&book), 109.0);
        let signal = pos_ma(&mut ctx, &cfg()).unwrap();
        assert_eq!((signal.v1.as_str(), signal.v2.as_str()), ("Long", "AboveMa"));
        assert_eq!(breakout_bar(&mut ctx, &cfg()).unwrap(), Some(t(4)));
    }

    #[test]
    fn short_breaks_below() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();
        let book = book(OperateKind::ShortOpen, 5, 95.0);
        let mut k = klines(flat_bars(&closes), vec![]);
        let mut ctx = SignalContext::new(&mut k, Some(&book), 91.0);
        let signal = pos_ma(&mut ctx, &cfg()).unwrap();
        assert_eq!(signal.to_string(), "pos_60m#SMA#5_HoldStateV230414_Short_BelowMa_Any_0");
    }

    #[test]
    fn long_without_breakout_is_neutral() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();
        let book = book(OperateKind::LongOpen, 5, 95.0);
        let mut k = klines(flat_bars(&closes), vec![]);
        let mut ctx = SignalContext::new(&mut k, Some(&book), 91.0);
        assert!(pos_ma(&mut ctx, &cfg()).unwrap().is_neutral());
    }

    #[test]
    fn missing_position_is_neutral() {
        let book = PositionBook::new();
        let mut k = klines(flat_bars(&[1.0, 2.0]), vec![]);
        let mut ctx = SignalContext::new(&mut k, Some(&book), 2.0);
        assert!(pos_ma(&mut ctx, &cfg()).unwrap().is_neutral());
    }
}
