//! Rendering a script and its answers for people and tools.
//!
//! `print` shows these documents on stdout; the [`LogFinalizer`] writes the
//! markdown and JSON forms to disk when a session completes.

mod finalize;

use chrono::Local;
use serde::Serialize;
use toml::Table;

pub use finalize::{CompletionLog, LogFinalizer};

use crate::error::{HacenadaError, HacenadaResult};
use crate::script::Script;
use crate::store::{Answer, AnswerValue, SessionMeta, SessionRecord};

/// Rule printed after every step that ends an invocation.
const STOP_RULE: &str = "------";

/// Output format for `print`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// The script as TOML, answers and metadata as extra tables
    #[default]
    Toml,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
    /// A human-readable transcript
    Markdown,
}

/// Structured form shared by the TOML, JSON and YAML outputs.
#[derive(Debug, Serialize)]
struct PrintDocument<'a> {
    hacenada: &'a Table,
    step: &'a [Table],
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<&'a [Answer]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<&'a SessionMeta>,
}

impl<'a> PrintDocument<'a> {
    fn new(script: &'a Script, record: Option<&'a SessionRecord>) -> Self {
        Self {
            hacenada: script.preamble(),
            step: script.raw_steps(),
            answer: record.map(|r| r.answers.as_slice()),
            meta: record.map(|r| &r.meta),
        }
    }
}

/// Render `script`, and the answers in `record` when given, as `format`.
pub fn render(
    script: &Script,
    record: Option<&SessionRecord>,
    format: OutputFormat,
) -> HacenadaResult<String> {
    let document = PrintDocument::new(script, record);
    let serialize = |e: &dyn std::fmt::Display| HacenadaError::Serialize(e.to_string());

    match format {
        OutputFormat::Toml => toml::to_string(&document).map_err(|e| serialize(&e)),
        OutputFormat::Json => serde_json::to_string_pretty(&document).map_err(|e| serialize(&e)),
        OutputFormat::Yaml => serde_yaml::to_string(&document).map_err(|e| serialize(&e)),
        OutputFormat::Markdown => Ok(to_markdown(script, record)),
    }
}

/// A markdown transcript of the script, with answers when `record` is given.
pub fn to_markdown(script: &Script, record: Option<&SessionRecord>) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", title(script, record)));
    if let Some(description) = script.description().filter(|d| !d.trim().is_empty()) {
        out.push_str(&format!("{}\n\n", description.trim()));
    }

    if let Some(current) = record.map(|r| r.meta.description.trim()).filter(|d| !d.is_empty()) {
        out.push_str(&format!("### Current: **{}**\n\n", current.replace('\n', " ")));
    }

    out.push_str("## Steps\n\n");
    for step in script.overlay() {
        out.push_str(&format!("[{}]  {}\n\n", step.label, step.message.trim()));

        let answer = record.and_then(|r| r.answers.iter().find(|a| a.label == step.label));
        if let Some(answer) = answer {
            out.push_str(&format!(
                "**>> {} <<** ({})\n\n",
                display_value(&answer.value),
                answer.when.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            ));
        }

        if step.stop {
            out.push_str(STOP_RULE);
            out.push_str("\n\n");
        }
    }

    out
}

/// Lowercase, alphanumeric runs joined by `-`.
pub fn slugify(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn title(script: &Script, record: Option<&SessionRecord>) -> String {
    script
        .name()
        .map(str::to_string)
        .or_else(|| {
            record
                .and_then(|r| r.meta.script_path.as_deref())
                .and_then(|p| p.file_stem())
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| crate::APP_NAME.to_string())
}

fn display_value(value: &AnswerValue) -> String {
    match value {
        AnswerValue::String(text) => text.trim().to_string(),
        AnswerValue::Bool(true) => "yes".to_string(),
        AnswerValue::Bool(false) => "no".to_string(),
        other => other.to_string(),
    }
}
