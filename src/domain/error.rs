//! Domain error types.
//!
//! Only configuration mistakes and harness data problems are errors. Missing
//! positions, flat positions and short lookbacks are ordinary states that
//! evaluators map to the neutral outcome.

/// Top-level error type for possig.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("unknown indicator kind: {kind}")]
    UnknownIndicator { kind: String },

    #[error("parameter {param}={value} out of range [{min}, {max}]")]
    ParamOutOfRange {
        param: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("no kline data for frequency {freq}")]
    UnknownFrequency { freq: String },

    #[error("template field {field} not provided by configuration")]
    TemplateField { field: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to load {source_name}: {reason}")]
    DataLoad { source_name: String, reason: String },

    #[error("bar at {dt} is not after the last bar at {last}")]
    OutOfOrder { dt: String, last: String },

    #[error("invalid signal string: {input}")]
    InvalidSignal { input: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignalError {
    pub(crate) fn out_of_range(param: &str, value: usize, min: usize, max: usize) -> Self {
        SignalError::ParamOutOfRange {
            param: param.to_string(),
            value: value as i64,
            min: min as i64,
            max: max as i64,
        }
    }
}

impl From<&SignalError> for std::process::ExitCode {
    fn from(err: &SignalError) -> Self {
        let code: u8 = match err {
            SignalError::Io(_) => 1,
            SignalError::ConfigParse { .. }
            | SignalError::ConfigMissing { .. }
            | SignalError::ConfigInvalid { .. } => 2,
            SignalError::DataLoad { .. } | SignalError::OutOfOrder { .. } => 3,
            SignalError::UnknownIndicator { .. }
            | SignalError::ParamOutOfRange { .. }
            | SignalError::UnknownFrequency { .. }
            | SignalError::TemplateField { .. }
            | SignalError::InvalidSignal { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
