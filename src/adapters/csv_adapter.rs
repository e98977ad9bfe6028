//! CSV file data adapter.
//!
//! Expected headers:
//! - bars: `dt,open,high,low,close,vol,amount`
//! - fractals: `dt,mark,fx,high,low`
//! - operates: `pos_name,dt,op,price`
//!
//! Timestamps are `%Y-%m-%d %H:%M:%S` or a bare `%Y-%m-%d` (midnight).

use crate::domain::bar::Bar;
use crate::domain::error::SignalError;
use crate::domain::fractal::{Fractal, Mark};
use crate::domain::position::{Operate, OperateKind};
use crate::ports::data_port::{DataPort, OperateRecord};
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    /// Relative paths passed to the loaders resolve against `base_path`.
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.base_path.join(path)
    }

    fn read_records(&self, path: &Path) -> Result<(String, Vec<StringRecord>), SignalError> {
        let path = self.resolve(path);
        let source = path.display().to_string();
        let content = fs::read_to_string(&path).map_err(|e| SignalError::DataLoad {
            source_name: source.clone(),
            reason: format!("failed to read: {}", e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let records = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SignalError::DataLoad {
                source_name: source.clone(),
                reason: format!("CSV parse error: {}", e),
            })?;
        Ok((source, records))
    }
}

pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn column<'r>(
    record: &'r StringRecord,
    idx: usize,
    name: &str,
    source: &str,
) -> Result<&'r str, SignalError> {
    record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SignalError::DataLoad {
            source_name: source.to_string(),
            reason: format!("missing {} column", name),
        })
}

fn parse_column<T>(
    record: &StringRecord,
    idx: usize,
    name: &str,
    source: &str,
) -> Result<T, SignalError>
where
    T: FromStr,
    T::Err: Display,
{
    column(record, idx, name, source)?
        .parse()
        .map_err(|e| SignalError::DataLoad {
            source_name: source.to_string(),
            reason: format!("invalid {} value: {}", name, e),
        })
}

fn dt_column(record: &StringRecord, source: &str, idx: usize) -> Result<NaiveDateTime, SignalError> {
    let raw = column(record, idx, "dt", source)?;
    parse_datetime(raw).ok_or_else(|| SignalError::DataLoad {
        source_name: source.to_string(),
        reason: format!("invalid dt value: {}", raw),
    })
}

impl DataPort for CsvAdapter {
    fn load_bars(&self, path: &Path) -> Result<Vec<Bar>, SignalError> {
        let (source, records) = self.read_records(path)?;
        let mut bars = records
            .iter()
            .map(|record| {
                Ok(Bar::new(
                    dt_column(record, &source, 0)?,
                    parse_column(record, 1, "open", &source)?,
                    parse_column(record, 2, "high", &source)?,
                    parse_column(record, 3, "low", &source)?,
                    parse_column(record, 4, "close", &source)?,
                    parse_column(record, 5, "vol", &source)?,
                    parse_column(record, 6, "amount", &source)?,
                ))
            })
            .collect::<Result<Vec<_>, SignalError>>()?;

        if bars.is_empty() {
            log::warn!("{} holds no bars", source);
        }
        bars.sort_by_key(|b| b.dt);
        Ok(bars)
    }

    fn load_fractals(&self, path: &Path) -> Result<Vec<Fractal>, SignalError> {
        let (source, records) = self.read_records(path)?;
        let mut fractals = records
            .iter()
            .map(|record| {
                let fractal = Fractal {
                    dt: dt_column(record, &source, 0)?,
                    mark: parse_column::<Mark>(record, 1, "mark", &source)?,
                    fx: parse_column(record, 2, "fx", &source)?,
                    high: parse_column(record, 3, "high", &source)?,
                    low: parse_column(record, 4, "low", &source)?,
                    index: 0,
                };
                if !(fractal.low..=fractal.high).contains(&fractal.fx) {
                    return Err(SignalError::DataLoad {
                        source_name: source.clone(),
                        reason: format!(
                            "{} fractal at {}: fx {} outside [{}, {}]",
                            fractal.mark, fractal.dt, fractal.fx, fractal.low, fractal.high
                        ),
                    });
                }
                Ok(fractal)
            })
            .collect::<Result<Vec<_>, SignalError>>()?;

        fractals.sort_by_key(|f| f.dt);
        for (i, fx) in fractals.iter_mut().enumerate() {
            fx.index = i;
        }
        Ok(fractals)
    }

    fn load_operates(&self, path: &Path) -> Result<Vec<OperateRecord>, SignalError> {
        let (source, records) = self.read_records(path)?;
        let mut operates = records
            .iter()
            .map(|record| {
                Ok(OperateRecord {
                    pos_name: column(record, 0, "pos_name", &source)?.to_string(),
                    operate: Operate {
                        dt: dt_column(record, &source, 1)?,
                        op: parse_column::<OperateKind>(record, 2, "op", &source)?,
                        price: parse_column(record, 3, "price", &source)?,
                    },
                })
            })
            .collect::<Result<Vec<_>, SignalError>>()?;

        // stable: same-time operates keep file order
        operates.sort_by_key(|r| r.operate.dt);
        Ok(operates)
    }
}
