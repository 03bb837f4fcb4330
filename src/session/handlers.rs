//! Side effects that run after a step of a given type is answered.

use std::collections::HashMap;
use std::fmt;

use crate::error::HacenadaResult;
use crate::script::StepType;
use crate::store::{AnswerValue, SessionRecord};

/// The answer a post-handler reacts to.
#[derive(Debug, Clone, Copy)]
pub struct PostEvent<'a> {
    /// Label of the answered step
    pub label: &'a str,
    /// Type of the answered step
    pub step_type: StepType,
    /// The saved answer
    pub value: &'a AnswerValue,
}

/// A post-handler. Its changes to the record are saved together with the answer.
pub type PostHandler = Box<dyn Fn(&mut SessionRecord, &PostEvent<'_>) -> HacenadaResult<()>>;

/// Table of post-handlers by step type. Types without an entry do nothing.
pub struct PostHandlers {
    handlers: HashMap<StepType, PostHandler>,
}

impl PostHandlers {
    /// A table with no handlers.
    pub fn empty() -> Self {
        Self { handlers: HashMap::new() }
    }

    /// Set the handler for `step_type`, replacing any existing one.
    pub fn register(
        &mut self,
        step_type: StepType,
        handler: impl Fn(&mut SessionRecord, &PostEvent<'_>) -> HacenadaResult<()> + 'static,
    ) {
        self.handlers.insert(step_type, Box::new(handler));
    }

    /// Whether `step_type` has a handler.
    pub fn handles(&self, step_type: StepType) -> bool {
        self.handlers.contains_key(&step_type)
    }

    /// Run the handler for the event's step type, if any.
    pub fn dispatch(&self, record: &mut SessionRecord, event: &PostEvent<'_>) -> HacenadaResult<()> {
        match self.handlers.get(&event.step_type) {
            Some(handler) => handler(record, event),
            None => Ok(()),
        }
    }
}

impl Default for PostHandlers {
    /// `description` answers become the session description.
    fn default() -> Self {
        let mut handlers = Self::empty();
        handlers.register(StepType::Description, set_description);
        handlers
    }
}

impl fmt::Debug for PostHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<StepType> = self.handlers.keys().copied().collect();
        f.debug_struct("PostHandlers").field("types", &types).finish()
    }
}

fn set_description(record: &mut SessionRecord, event: &PostEvent<'_>) -> HacenadaResult<()> {
    record.meta.description = match event.value {
        AnswerValue::String(text) => text.clone(),
        other => other.to_string(),
    };
    Ok(())
}
