//! Position operate logs.
//!
//! Positions are owned by the execution engine; this crate only reads the
//! last operate to decide whether a position is holding and in which direction.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperateKind {
    LongOpen,
    LongExit,
    ShortOpen,
    ShortExit,
}

impl OperateKind {
    pub fn is_open(&self) -> bool {
        matches!(self, OperateKind::LongOpen | OperateKind::ShortOpen)
    }

    pub fn code(&self) -> &'static str {
        match self {
            OperateKind::LongOpen => "LO",
            OperateKind::LongExit => "LE",
            OperateKind::ShortOpen => "SO",
            OperateKind::ShortExit => "SE",
        }
    }
}

impl fmt::Display for OperateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OperateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LO" => Ok(OperateKind::LongOpen),
            "LE" => Ok(OperateKind::LongExit),
            "SO" => Ok(OperateKind::ShortOpen),
            "SE" => Ok(OperateKind::ShortExit),
            other => Err(format!("unknown operate: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operate {
    pub op: OperateKind,
    pub dt: NaiveDateTime,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct Position {
    pub name: String,
    pub operates: Vec<Operate>,
}

impl Position {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operates: Vec::new(),
        }
    }

    pub fn last_operate(&self) -> Option<&Operate> {
        self.operates.last()
    }

    /// The opening operate if the position is currently holding.
    pub fn holding(&self) -> Option<&Operate> {
        self.last_operate().filter(|op| op.op.is_open())
    }
}

/// All positions of a trading session, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct PositionBook {
    positions: HashMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.insert(position);
        self
    }

    pub fn insert(&mut self, position: Position) {
        self.positions.insert(position.name.clone(), position);
    }

    pub fn get(&self, name: &str) -> Option<&Position> {
        self.positions.get(name)
    }

    /// Append an operate to a named position, creating it on first use.
    pub fn record(&mut self, name: &str, operate: Operate) {
        self.positions
            .entry(name.to_string())
            .or_insert_with(|| Position::new(name))
            .operates
            .push(operate);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
