//! Building and validating evaluator configurations from a `ConfigPort`.
//!
//! Each evaluator is one `[signal.<label>]` section:
//!
//! ```ini
//! [signal.trend_ma]
//! kind = pos_ma
//! pos_name = trend
//! freq = 60m
//! ma_kind = SMA
//! period = 5
//! ```

use crate::domain::error::SignalError;
use crate::domain::evaluator::{
    bar_stop, fx_stop, holds, ma_break, BarStopConfig, FxStopConfig, HoldsConfig, MaBreakConfig,
    SignalConfig,
};
use crate::ports::config_port::ConfigPort;

pub const SIGNAL_SECTION_PREFIX: &str = "signal.";

/// Sections holding evaluator configurations, in sorted order.
pub fn signal_sections(config: &dyn ConfigPort) -> Vec<String> {
    let mut sections: Vec<String> = config
        .sections()
        .into_iter()
        .filter(|s| s.starts_with(SIGNAL_SECTION_PREFIX))
        .collect();
    sections.sort();
    sections
}

/// Load and validate every `[signal.*]` section.
pub fn load_signal_configs(config: &dyn ConfigPort) -> Result<Vec<SignalConfig>, SignalError> {
    let sections = signal_sections(config);
    if sections.is_empty() {
        return Err(SignalError::ConfigMissing {
            section: format!("{}*", SIGNAL_SECTION_PREFIX),
            key: "kind".to_string(),
        });
    }
    sections
        .iter()
        .map(|section| load_signal_config(config, section))
        .collect()
}

pub fn load_signal_config(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<SignalConfig, SignalError> {
    let kind = require_string(config, section, "kind")?;
    let pos_name = require_string(config, section, "pos_name")?;
    let freq = require_string(config, section, "freq")?;

    let signal = match kind.as_str() {
        "pos_ma" => SignalConfig::MaBreak(MaBreakConfig {
            ma_kind: config
                .get_string(section, "ma_kind")
                .unwrap_or_else(|| ma_break::DEFAULT_MA_KIND.to_string()),
            period: get_count(config, section, "period", ma_break::DEFAULT_PERIOD)?,
            ..MaBreakConfig::new(pos_name, freq)
        }),
        "pos_fx_stop" => SignalConfig::FxStop(FxStopConfig {
            n: get_count(config, section, "n", fx_stop::DEFAULT_N)?,
            ..FxStopConfig::new(pos_name, freq)
        }),
        "pos_bar_stop" => SignalConfig::BarStop(BarStopConfig {
            n: get_count(config, section, "n", bar_stop::DEFAULT_N)?,
            ..BarStopConfig::new(pos_name, freq)
        }),
        "pos_holds" => SignalConfig::Holds(HoldsConfig {
            n: get_count(config, section, "n", holds::DEFAULT_N)?,
            m: get_integer(config, section, "m", holds::DEFAULT_M)?,
            ..HoldsConfig::new(pos_name, freq)
        }),
        other => {
            return Err(SignalError::ConfigInvalid {
                section: section.to_string(),
                key: "kind".to_string(),
                reason: format!("unknown signal kind {}", other),
            })
        }
    };

    signal.validate()?;
    signal.key()?;
    Ok(signal)
}

fn require_string(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SignalError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(SignalError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn get_count(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, SignalError> {
    let value = get_integer(config, section, key, default as i64)?;
    usize::try_from(value).map_err(|_| SignalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{} must be non-negative", key),
    })
}

/// Integer value of `key`; the default applies only when the key is absent.
fn get_integer(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, SignalError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(default);
    };
    raw.trim().parse().map_err(|_| SignalError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("{:?} is not an integer", raw),
    })
}
