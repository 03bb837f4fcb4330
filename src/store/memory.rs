//! In-memory session storage, used by tests and read-only commands.

use std::path::PathBuf;

use chrono::Utc;

use super::{AnswerStore, AnswerValue, SessionRecord};
use crate::error::HacenadaResult;
use crate::script::StructuredScript;

/// A store that never touches the filesystem.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    record: SessionRecord,
    /// Number of answers saved since creation
    saves: usize,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store for the script at `script_path`.
    pub fn for_script(script_path: impl Into<PathBuf>) -> Self {
        Self { record: SessionRecord::new(Some(script_path.into())), saves: 0 }
    }

    /// A store holding a copy of `record`.
    pub fn from_record(record: SessionRecord) -> Self {
        Self { record, saves: 0 }
    }

    /// How many answers have been written.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl AnswerStore for MemoryStore {
    fn record(&self) -> &SessionRecord {
        &self.record
    }

    fn save_answer_with(
        &mut self,
        label: &str,
        value: AnswerValue,
        effect: &mut dyn FnMut(&mut SessionRecord) -> HacenadaResult<()>,
    ) -> HacenadaResult<()> {
        let mut next = self.record.clone();
        next.upsert_answer(label, value, Utc::now());
        effect(&mut next)?;
        self.record = next;
        self.saves += 1;
        Ok(())
    }

    fn set_description(&mut self, description: &str) -> HacenadaResult<()> {
        self.record.meta.description = description.to_string();
        Ok(())
    }

    fn set_script_snapshot(&mut self, snapshot: StructuredScript) -> HacenadaResult<()> {
        self.record.script = Some(snapshot);
        Ok(())
    }

    fn clear(&mut self) -> HacenadaResult<()> {
        self.record.reset();
        Ok(())
    }
}
