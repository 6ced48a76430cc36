//! Column-name and identifier operations.
//!
//! [`NameOp`] is the building block of the finance label cleanup: an ordered
//! list of them is applied to every column name that survives pruning.

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};

/// A single rewrite applied to a column name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NameOp {
    /// Remove every occurrence of a literal token
    Remove { token: String },

    /// Replace every occurrence of a literal string
    Replace { from: String, to: String },

    /// Replace using regex pattern
    Pattern {
        pattern: String,
        #[serde(default)]
        value: String,
    },

    /// Remove leading and trailing whitespace
    Trim,
}

impl NameOp {
    pub fn remove(token: &str) -> Self {
        NameOp::Remove {
            token: token.to_string(),
        }
    }

    pub fn replace(from: &str, to: &str) -> Self {
        NameOp::Replace {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Apply this operation to a name
    pub fn apply(&self, name: &str) -> String {
        match self {
            NameOp::Remove { token } if token.is_empty() => name.to_string(),
            NameOp::Remove { token } => name.replace(token.as_str(), ""),
            NameOp::Replace { from, .. } if from.is_empty() => name.to_string(),
            NameOp::Replace { from, to } => name.replace(from.as_str(), to),
            NameOp::Pattern { pattern, value } => regex::Regex::new(pattern)
                .map(|re| re.replace_all(name, value.as_str()).to_string())
                .unwrap_or_else(|_| name.to_string()),
            NameOp::Trim => name.trim().to_string(),
        }
    }

    /// Check that a regex pattern compiles.
    pub fn validate(&self) -> SchemaResult<()> {
        if let NameOp::Pattern { pattern, .. } = self {
            regex::Regex::new(pattern).map_err(|e| SchemaError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

/// Apply an ordered list of operations to a name.
pub fn apply_all(ops: &[NameOp], name: &str) -> String {
    ops.iter()
        .fold(name.to_string(), |acc, op| op.apply(&acc))
}

/// Left-pad with zeros to `width` characters. Longer values are kept whole.
pub fn zero_pad(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len >= width {
        value.to_string()
    } else {
        let mut padded = "0".repeat(width - len);
        padded.push_str(value);
        padded
    }
}

/// How the finance `District` key is normalized.
///
/// The raw PEIMS export stores district numbers as text with a leading
/// marker character (`'001902`), which is why a plain zero-fill is not
/// enough on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistrictPolicy {
    /// Drop one leading non-digit marker if present, then zero-pad.
    #[default]
    StripMarker,
    /// Zero-pad, then drop the first character whatever it is.
    PadThenStripFirst,
    /// Zero-pad only.
    PadOnly,
}

impl DistrictPolicy {
    pub fn apply(self, raw: &str, width: usize) -> String {
        let raw = raw.trim();
        match self {
            DistrictPolicy::StripMarker => {
                let digits = match raw.chars().next() {
                    Some(c) if !c.is_ascii_digit() => &raw[c.len_utf8()..],
                    _ => raw,
                };
                zero_pad(digits, width)
            }
            DistrictPolicy::PadThenStripFirst => {
                zero_pad(raw, width).chars().skip(1).collect()
            }
            DistrictPolicy::PadOnly => zero_pad(raw, width),
        }
    }
}
