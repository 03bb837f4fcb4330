//! Answer storage for sessions.
//!
//! A store holds one session's answers, its description, the script path it
//! belongs to and a snapshot of the script the answers were collected against.
//! [`FileStore`] persists to a JSON file under a [`StoreHome`]; [`MemoryStore`]
//! keeps everything in memory.

mod file;
mod memory;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use file::{normalize_path, FileStore, StoreHandle, StoreHome};
pub use memory::MemoryStore;

use crate::error::HacenadaResult;
use crate::script::StructuredScript;

/// The value collected for a step.
pub type AnswerValue = serde_json::Value;

/// Current on-disk record version.
pub const RECORD_VERSION: u32 = 1;

/// A persisted answer to one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Label of the answered step
    pub label: String,
    /// The answer
    pub value: AnswerValue,
    /// When the answer was saved
    pub when: DateTime<Utc>,
}

/// Session metadata kept next to the answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Operator-supplied description of this run
    #[serde(default)]
    pub description: String,

    /// The script this session belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_path: Option<PathBuf>,
}

/// Everything a store persists for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Version for future migrations
    #[serde(default)]
    pub version: u32,

    /// Session metadata
    #[serde(default)]
    pub meta: SessionMeta,

    /// Answers in the order they were first saved
    #[serde(default)]
    pub answers: Vec<Answer>,

    /// Snapshot of the script the answers belong to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<StructuredScript>,
}

impl SessionRecord {
    /// A fresh record for the script at `script_path`.
    pub fn new(script_path: Option<PathBuf>) -> Self {
        Self {
            version: RECORD_VERSION,
            meta: SessionMeta { description: String::new(), script_path },
            answers: Vec::new(),
            script: None,
        }
    }

    /// Insert an answer, replacing any earlier answer with the same label in place.
    pub fn upsert_answer(&mut self, label: &str, value: AnswerValue, when: DateTime<Utc>) {
        let answer = Answer { label: label.to_string(), value, when };
        match self.answers.iter_mut().find(|a| a.label == label) {
            Some(existing) => *existing = answer,
            None => self.answers.push(answer),
        }
    }

    /// Forget answers, description and snapshot; keep the script path.
    pub fn reset(&mut self) {
        *self = Self::new(self.meta.script_path.take());
    }
}

/// Access to a session's durable state.
///
/// Every mutating call must be durable before it returns.
pub trait AnswerStore {
    /// The current record.
    fn record(&self) -> &SessionRecord;

    /// Save (upsert) the answer for `label`, stamped with the current time,
    /// and apply `effect` to the record in the same durable write.
    ///
    /// When `effect` fails nothing is saved.
    fn save_answer_with(
        &mut self,
        label: &str,
        value: AnswerValue,
        effect: &mut dyn FnMut(&mut SessionRecord) -> HacenadaResult<()>,
    ) -> HacenadaResult<()>;

    /// Save (upsert) the answer for `label`, stamped with the current time.
    fn save_answer(&mut self, label: &str, value: AnswerValue) -> HacenadaResult<()> {
        self.save_answer_with(label, value, &mut |_| Ok(()))
    }

    /// Set the session description.
    fn set_description(&mut self, description: &str) -> HacenadaResult<()>;

    /// Record the script snapshot the answers are collected against.
    fn set_script_snapshot(&mut self, snapshot: StructuredScript) -> HacenadaResult<()>;

    /// Irreversibly clear answers and metadata, returning to an unstarted state.
    fn clear(&mut self) -> HacenadaResult<()>;

    /// Look up one answer by label.
    fn get_answer(&self, label: &str) -> Option<&Answer> {
        self.record().answers.iter().find(|a| a.label == label)
    }

    /// All answers, in store order.
    fn answers(&self) -> &[Answer] {
        &self.record().answers
    }

    /// The session description (empty when unset).
    fn description(&self) -> &str {
        &self.record().meta.description
    }

    /// The script path this session was created for.
    fn script_path(&self) -> Option<&Path> {
        self.record().meta.script_path.as_deref()
    }

    /// The recorded script snapshot.
    fn script_snapshot(&self) -> Option<&StructuredScript> {
        self.record().script.as_ref()
    }

    /// Whether any answer has been collected.
    fn started(&self) -> bool {
        !self.record().answers.is_empty()
    }
}
