//! Core domain types and logic.

pub mod bar;
pub mod config_validation;
pub mod error;
pub mod evaluator;
pub mod fractal;
pub mod indicator;
pub mod position;
pub mod signal;
