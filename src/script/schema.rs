//! Script schema definitions.
//!
//! A script file has a `[hacenada]` preamble table and an ordered `[[step]]`
//! array. The raw tables are kept verbatim; the normalized `overlay` is derived
//! from them.

use std::fmt;

use serde::{Deserialize, Serialize};
use toml::Table;

use super::parser::normalize;
use crate::error::HacenadaResult;

/// The structured form of a script, exactly as it appears in the source.
///
/// This is also the snapshot stored alongside a session's answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredScript {
    /// Free-form preamble metadata (name, description, ...)
    pub hacenada: Table,

    /// Untransformed step definitions, in order
    pub step: Vec<Table>,
}

/// Kinds of step a script can contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    /// Free text that becomes the session description
    Description,
    /// An instruction the operator acknowledges
    #[default]
    Message,
    /// A yes/no question
    Confirm,
    /// Multi-line text collected in an external editor
    Editor,
}

impl StepType {
    /// The tag used in script files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Message => "message",
            Self::Confirm => "confirm",
            Self::Editor => "editor",
        }
    }

    /// Parse a tag from a script file.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "description" => Some(Self::Description),
            "message" => Some(Self::Message),
            "confirm" => Some(Self::Confirm),
            "editor" => Some(Self::Editor),
            _ => None,
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized step in the overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    /// Step type
    #[serde(rename = "type")]
    pub step_type: StepType,

    /// Text shown to the operator
    pub message: String,

    /// Unique label within the script
    pub label: String,

    /// Whether the invocation ends after this step is answered
    pub stop: bool,

    /// Any other fields from the raw step, unchanged
    #[serde(flatten)]
    pub extra: Table,
}

impl Step {
    /// Look up a pass-through string field such as `default`.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(toml::Value::as_str)
    }
}

/// A loaded script: preamble, raw steps and the derived overlay.
#[derive(Debug, Clone)]
pub struct Script {
    preamble: Table,
    raw_steps: Vec<Table>,
    overlay: Vec<Step>,
}

impl Script {
    /// Build a script from its structured form, deriving the overlay.
    pub fn from_structured(structured: StructuredScript) -> HacenadaResult<Self> {
        let overlay = normalize(&structured.step)?;
        Ok(Self { preamble: structured.hacenada, raw_steps: structured.step, overlay })
    }

    /// The structured form of the script.
    pub fn to_structured(&self) -> StructuredScript {
        StructuredScript { hacenada: self.preamble.clone(), step: self.raw_steps.clone() }
    }

    /// Whether `snapshot` describes this same script.
    pub fn matches(&self, snapshot: &StructuredScript) -> bool {
        self.preamble == snapshot.hacenada && self.raw_steps == snapshot.step
    }

    /// Preamble metadata.
    pub fn preamble(&self) -> &Table {
        &self.preamble
    }

    /// Raw step definitions.
    pub fn raw_steps(&self) -> &[Table] {
        &self.raw_steps
    }

    /// Normalized steps.
    pub fn overlay(&self) -> &[Step] {
        &self.overlay
    }

    /// Number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.overlay.len()
    }

    /// The `name` from the preamble.
    pub fn name(&self) -> Option<&str> {
        self.preamble.get("name").and_then(toml::Value::as_str).filter(|n| !n.is_empty())
    }

    /// The `description` from the preamble.
    pub fn description(&self) -> Option<&str> {
        self.preamble.get("description").and_then(toml::Value::as_str)
    }
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.preamble == other.preamble && self.raw_steps == other.raw_steps
    }
}
