//! Data access port trait.
//!
//! Loads what the upstream producers hand to the evaluators: bars, the
//! fractal list and the operate log.

use crate::domain::bar::Bar;
use crate::domain::error::SignalError;
use crate::domain::fractal::Fractal;
use crate::domain::position::Operate;
use std::path::Path;

/// An operate tagged with the position it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct OperateRecord {
    pub pos_name: String,
    pub operate: Operate,
}

pub trait DataPort {
    /// Bars sorted by time.
    fn load_bars(&self, path: &Path) -> Result<Vec<Bar>, SignalError>;

    /// Fractals sorted by time, with `index` set to their order.
    fn load_fractals(&self, path: &Path) -> Result<Vec<Fractal>, SignalError>;

    /// Operates sorted by time.
    fn load_operates(&self, path: &Path) -> Result<Vec<OperateRecord>, SignalError>;
}
