//! Confirmed fractal turning points, as produced by the upstream structure detector.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Top,
    Bottom,
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::Top => write!(f, "top"),
            Mark::Bottom => write!(f, "bottom"),
        }
    }
}

impl FromStr for Mark {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" | "g" => Ok(Mark::Top),
            "bottom" | "d" => Ok(Mark::Bottom),
            other => Err(format!("unknown fractal mark: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fractal {
    pub mark: Mark,
    pub dt: NaiveDateTime,
    /// Extreme price: the high of a top, the low of a bottom.
    pub fx: f64,
    pub high: f64,
    pub low: f64,
    /// Position of the fractal in the detector's output.
    pub index: usize,
}

/// The last `n` fractals of `mark` strictly before `dt`, oldest first.
pub fn last_before(fractals: &[Fractal], mark: Mark, dt: NaiveDateTime, n: usize) -> Vec<&Fractal> {
    let matching: Vec<&Fractal> = fractals
        .iter()
        .filter(|f| f.mark == mark && f.dt < dt)
        .collect();
    let start = matching.len().saturating_sub(n);
    matching[start..].to_vec()
}
