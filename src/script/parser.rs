//! Script parser.
//!
//! Parses TOML (or YAML) script files into [`Script`]s and derives the
//! normalized step overlay.

use std::collections::HashSet;
use std::path::Path;

use toml::{Table, Value};

use super::{Script, Step, StepType, StructuredScript};
use crate::error::{HacenadaError, HacenadaResult};

/// Keys that normalization interprets; everything else passes through.
const STEP_KEYS: [&str; 4] = ["type", "message", "label", "stop"];

/// Load a script from a file.
///
/// Files ending in `.yaml` or `.yml` are read as YAML, anything else as TOML.
pub fn load_script(path: &Path) -> HacenadaResult<Script> {
    if !path.is_file() {
        return Err(HacenadaError::ScriptNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let script = if is_yaml(path) { parse_script_yaml_str(&content) } else { parse_script_str(&content) };

    script.map_err(|e| match e {
        HacenadaError::Parse(msg) => HacenadaError::Parse(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Parse a script from TOML text.
pub fn parse_script_str(content: &str) -> HacenadaResult<Script> {
    let structured: StructuredScript =
        toml::from_str(content).map_err(|e| HacenadaError::Parse(e.to_string()))?;
    validate_script(&structured)?;
    Script::from_structured(structured)
}

/// Parse a script from YAML text.
pub fn parse_script_yaml_str(content: &str) -> HacenadaResult<Script> {
    let structured: StructuredScript =
        serde_yaml::from_str(content).map_err(|e| HacenadaError::Parse(e.to_string()))?;
    validate_script(&structured)?;
    Script::from_structured(structured)
}

/// Serialize a script back to TOML.
pub fn to_toml_string(script: &Script) -> HacenadaResult<String> {
    toml::to_string(&script.to_structured()).map_err(|e| HacenadaError::Serialize(e.to_string()))
}

/// The label given to a step that has none.
pub fn autolabel(step_type: StepType, index: usize) -> String {
    format!("{step_type}-{index}")
}

/// Fill in step defaults, preserving order.
///
/// `type` defaults to `message`, `stop` to `true`, and `label` to
/// `"{type}-{index}"` using the step's position in `raw_steps`.
pub fn normalize(raw_steps: &[Table]) -> HacenadaResult<Vec<Step>> {
    let mut seen = HashSet::new();
    let mut overlay = Vec::with_capacity(raw_steps.len());

    for (index, raw) in raw_steps.iter().enumerate() {
        let step_type = match raw.get("type") {
            None => StepType::default(),
            Some(Value::String(tag)) => StepType::from_tag(tag).ok_or_else(|| {
                HacenadaError::Parse(format!("Step {} has unknown type '{tag}'", index + 1))
            })?,
            Some(other) => {
                return Err(HacenadaError::Parse(format!(
                    "Step {} has a non-string type: {other}",
                    index + 1
                )))
            }
        };

        let message = match raw.get("message") {
            Some(Value::String(message)) if !message.trim().is_empty() => message.clone(),
            _ => return Err(HacenadaError::Parse(format!("Step {} has no message", index + 1))),
        };

        let label = match raw.get("label") {
            None => autolabel(step_type, index),
            Some(Value::String(label)) if !label.is_empty() => label.clone(),
            Some(_) => {
                return Err(HacenadaError::Parse(format!(
                    "Step {} label must be a non-empty string",
                    index + 1
                )))
            }
        };

        let stop = match raw.get("stop") {
            None => true,
            Some(Value::Boolean(stop)) => *stop,
            Some(_) => {
                return Err(HacenadaError::Parse(format!("Step '{label}' stop must be a boolean")))
            }
        };

        if !seen.insert(label.clone()) {
            return Err(HacenadaError::Parse(format!("Duplicate step label '{label}'")));
        }

        let extra: Table = raw
            .iter()
            .filter(|(key, _)| !STEP_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        overlay.push(Step { step_type, message, label, stop, extra });
    }

    Ok(overlay)
}

/// Validate the parts of a script that normalization does not look at.
fn validate_script(structured: &StructuredScript) -> HacenadaResult<()> {
    if structured.step.is_empty() {
        return Err(HacenadaError::Parse("Script must have at least one step".to_string()));
    }

    if let Some(name) = structured.hacenada.get("name") {
        if !name.is_str() {
            return Err(HacenadaError::Parse("Preamble name must be a string".to_string()));
        }
    } else {
        tracing::warn!("Script preamble has no name");
    }

    for (key, value) in &structured.hacenada {
        check_finite(value, &format!("hacenada.{key}"))?;
    }
    for (index, step) in structured.step.iter().enumerate() {
        for (key, value) in step {
            check_finite(value, &format!("step[{index}].{key}"))?;
        }
    }

    Ok(())
}

/// Session stores are JSON, which has no NaN or infinity.
fn check_finite(value: &Value, path: &str) -> HacenadaResult<()> {
    match value {
        Value::Float(f) if !f.is_finite() => {
            Err(HacenadaError::Parse(format!("{path} must be a finite number, got {f}")))
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check_finite(item, &format!("{path}[{i}]"))),
        Value::Table(table) => {
            table.iter().try_for_each(|(key, item)| check_finite(item, &format!("{path}.{key}")))
        }
        _ => Ok(()),
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "yaml" || e == "yml")
}
