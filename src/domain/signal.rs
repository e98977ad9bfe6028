//! Signals and the naming protocol that builds them.
//!
//! A signal is `k1_k2_k3_v1_v2_v3_score`. The key parts come from an
//! evaluator's configuration through its `Template`; the value parts come
//! from the evaluator's outcome, padded with `Any`.

use crate::domain::error::SignalError;
use std::fmt;
use std::str::FromStr;

/// Placeholder for value fields an outcome does not use.
pub const ANY: &str = "Any";
/// Neutral outcome: no condition met or not enough data.
pub const OTHER: &str = "Other";

const SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// A configuration value looked up by field name.
    Field(&'static str),
    Lit(&'static str),
    /// The template's version tag.
    Version,
}

/// Provides configuration values to `Template::render`.
pub trait TemplateParams {
    fn param(&self, field: &str) -> Option<String>;
}

/// Declared key layout of one evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub version: &'static str,
    pub slots: [&'static [Segment]; 3],
}

impl Template {
    pub fn render(&self, params: &dyn TemplateParams) -> Result<SignalKey, SignalError> {
        let mut parts: [String; 3] = Default::default();
        for (part, slot) in parts.iter_mut().zip(self.slots.iter()) {
            for segment in slot.iter() {
                match segment {
                    Segment::Field(field) => {
                        let value =
                            params
                                .param(field)
                                .ok_or_else(|| SignalError::TemplateField {
                                    field: field.to_string(),
                                })?;
                        if value.is_empty() || value.contains(SEPARATOR) {
                            return Err(SignalError::ConfigInvalid {
                                section: self.name.to_string(),
                                key: field.to_string(),
                                reason: format!(
                                    "value {:?} must be non-empty and free of '{}'",
                                    value, SEPARATOR
                                ),
                            });
                        }
                        part.push_str(&value);
                    }
                    Segment::Lit(text) => part.push_str(text),
                    Segment::Version => part.push_str(self.version),
                }
            }
        }
        let [k1, k2, k3] = parts;
        Ok(SignalKey { k1, k2, k3 })
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR)?;
            }
            for segment in slot.iter() {
                match segment {
                    Segment::Field(field) => write!(f, "{{{}}}", field)?,
                    Segment::Lit(text) => f.write_str(text)?,
                    Segment::Version => f.write_str(self.version)?,
                }
            }
        }
        Ok(())
    }
}

/// Outcome enumeration of one evaluator.
pub trait Outcome: Copy + 'static {
    /// Every member, neutral first.
    const ALL: &'static [Self];

    /// Value fields v1.. for this outcome; missing trailing fields become `Any`.
    fn values(&self) -> &'static [&'static str];
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub k1: String,
    pub k2: String,
    pub k3: String,
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.k1, self.k2, self.k3)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signal {
    pub k1: String,
    pub k2: String,
    pub k3: String,
    pub v1: String,
    pub v2: String,
    pub v3: String,
    pub score: i32,
}

impl Signal {
    /// Build a signal; `values` beyond the third are ignored, missing ones are `Any`.
    pub fn new(key: &SignalKey, values: &[&str]) -> Self {
        let v = |i: usize| values.get(i).copied().unwrap_or(ANY).to_string();
        Self {
            k1: key.k1.clone(),
            k2: key.k2.clone(),
            k3: key.k3.clone(),
            v1: v(0),
            v2: v(1),
            v3: v(2),
            score: 0,
        }
    }

    pub fn from_outcome<O: Outcome>(key: &SignalKey, outcome: O) -> Self {
        Self::new(key, outcome.values())
    }

    pub fn signal_key(&self) -> SignalKey {
        SignalKey {
            k1: self.k1.clone(),
            k2: self.k2.clone(),
            k3: self.k3.clone(),
        }
    }

    /// `k1_k2_k3`
    pub fn key(&self) -> String {
        self.signal_key().to_string()
    }

    /// `v1_v2_v3_score`
    pub fn value(&self) -> String {
        format!("{}_{}_{}_{}", self.v1, self.v2, self.v3, self.score)
    }

    pub fn is_neutral(&self) -> bool {
        self.v1 == OTHER
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.key(), self.value())
    }
}

impl FromStr for Signal {
    type Err = SignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SignalError::InvalidSignal {
            input: s.to_string(),
        };
        let parts: Vec<&str> = s.split(SEPARATOR).collect();
        let [k1, k2, k3, v1, v2, v3, score] = parts[..] else {
            return Err(invalid());
        };
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        Ok(Self {
            k1: k1.to_string(),
            k2: k2.to_string(),
            k3: k3.to_string(),
            v1: v1.to_string(),
            v2: v2.to_string(),
            v3: v3.to_string(),
            score: score.parse().map_err(|_| invalid())?,
        })
    }
}
