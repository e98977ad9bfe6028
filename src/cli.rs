//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::bar::Bar;
use crate::domain::config_validation::load_signal_configs;
use crate::domain::error::SignalError;
use crate::domain::evaluator::{catalog, Kline, SignalConfig, SignalContext};
use crate::domain::fractal::Fractal;
use crate::domain::position::PositionBook;
use crate::domain::signal::Signal;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{DataPort, OperateRecord};

pub const REPLAY_SECTION: &str = "replay";
const OUTPUT_DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Parser, Debug)]
#[command(name = "possig", about = "Position-aware trading signal evaluation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay bars through the configured signals
    Replay {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        bars: PathBuf,
        #[arg(short, long)]
        fractals: Option<PathBuf>,
        #[arg(short, long)]
        operates: Option<PathBuf>,
        /// Frequency label of the bars file
        #[arg(long)]
        freq: Option<String>,
    },
    /// Validate signal configurations
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List evaluator templates and outcomes
    Catalog,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Replay {
            config,
            bars,
            fractals,
            operates,
            freq,
        } => run_replay(
            &config,
            &bars,
            fractals.as_deref(),
            operates.as_deref(),
            freq.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
        Command::Catalog => run_catalog(),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SignalError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Frequency of the replayed bars: the override, then `[replay] freq`, then
/// the first signal's frequency.
pub fn resolve_freq(
    freq_override: Option<&str>,
    config: &dyn ConfigPort,
    signals: &[SignalConfig],
) -> Option<String> {
    freq_override
        .map(str::to_string)
        .or_else(|| config.get_string(REPLAY_SECTION, "freq"))
        .filter(|f| !f.trim().is_empty())
        .or_else(|| signals.first().map(|s| s.freq().to_string()))
}

/// Feed `bars` one at a time into a single kline and evaluate every signal
/// after each bar, with the bar's close as the reference price.
///
/// Fractals and operates become visible once their `dt` is at or before the
/// current bar.
pub fn replay(
    signals: &[SignalConfig],
    freq: &str,
    bars: Vec<Bar>,
    fractals: Vec<Fractal>,
    operates: Vec<OperateRecord>,
) -> Result<Vec<(NaiveDateTime, Vec<Signal>)>, SignalError> {
    let watched: HashSet<&str> = signals.iter().map(signal_pos_name).collect();
    let mut klines = HashMap::from([(freq.to_string(), Kline::default())]);
    let mut book = PositionBook::new();
    let mut fractals = fractals.into_iter().peekable();
    let mut operates = operates.into_iter().peekable();
    let mut rows = Vec::with_capacity(bars.len());

    for bar in bars {
        let (dt, close) = (bar.dt, bar.close);
        let kline = klines
            .get_mut(freq)
            .ok_or_else(|| SignalError::UnknownFrequency {
                freq: freq.to_string(),
            })?;
        kline.bars.push(bar)?;
        while let Some(fx) = fractals.next_if(|f| f.dt <= dt) {
            kline.fractals.push(fx);
        }
        while let Some(record) = operates.next_if(|r| r.operate.dt <= dt) {
            if !watched.contains(record.pos_name.as_str()) {
                log::warn!(
                    "operate {} at {} for unwatched position {}",
                    record.operate.op,
                    record.operate.dt,
                    record.pos_name
                );
            }
            book.record(&record.pos_name, record.operate);
        }

        let mut ctx = SignalContext::new(&mut klines, Some(&book), close);
        let row = signals
            .iter()
            .map(|s| s.evaluate(&mut ctx))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push((dt, row));
    }

    if !book.is_empty() {
        log::debug!("{} positions recorded over {} bars", book.len(), rows.len());
    }
    Ok(rows)
}

fn signal_pos_name(signal: &SignalConfig) -> &str {
    match signal {
        SignalConfig::MaBreak(c) => &c.pos_name,
        SignalConfig::FxStop(c) => &c.pos_name,
        SignalConfig::BarStop(c) => &c.pos_name,
        SignalConfig::Holds(c) => &c.pos_name,
    }
}

fn run_replay(
    config_path: &Path,
    bars_path: &Path,
    fractals_path: Option<&Path>,
    operates_path: Option<&Path>,
    freq_override: Option<&str>,
) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let signals = match load_signal_configs(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let Some(freq) = resolve_freq(freq_override, &adapter, &signals) else {
        let err = SignalError::ConfigMissing {
            section: REPLAY_SECTION.to_string(),
            key: "freq".to_string(),
        };
        eprintln!("error: {err}");
        return (&err).into();
    };

    let data = CsvAdapter::new(PathBuf::from("."));
    let loaded = data.load_bars(bars_path).and_then(|bars| {
        let fractals = match fractals_path {
            Some(p) => data.load_fractals(p)?,
            None => Vec::new(),
        };
        let operates = match operates_path {
            Some(p) => data.load_operates(p)?,
            None => Vec::new(),
        };
        Ok((bars, fractals, operates))
    });
    let (bars, fractals, operates) = match loaded {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    log::info!(
        "replaying {} bars ({}) through {} signals",
        bars.len(),
        freq,
        signals.len()
    );

    match replay(&signals, &freq, bars, fractals, operates) {
        Ok(rows) => {
            for (dt, row) in rows {
                let dt = dt.format(OUTPUT_DT_FORMAT);
                for signal in row {
                    println!("{dt},{signal}");
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating signals: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let signals = match load_signal_configs(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    for signal in &signals {
        match signal.key() {
            Ok(key) => eprintln!("  {:<14} {}", signal.kind(), key),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    eprintln!("\n{} signal configuration(s) valid.", signals.len());
    ExitCode::SUCCESS
}

fn run_catalog() -> ExitCode {
    for entry in catalog() {
        println!("{}\t{}", entry.template.name, entry.template);
        for outcome in &entry.outcomes {
            println!("  {}", outcome);
        }
    }
    ExitCode::SUCCESS
}
