//! Session engine.
//!
//! A [`Session`] pairs a script with the answers already stored for it. Each
//! invocation resumes at the first unanswered step (`index == answers.len()`),
//! renders steps in order, persists every answer before moving on and stops at
//! the first step whose `stop` flag is set.

mod handlers;

use std::path::PathBuf;

pub use handlers::{PostEvent, PostHandler, PostHandlers};

use crate::error::{HacenadaError, HacenadaResult};
use crate::render::{RenderContext, Renderer};
use crate::script::{Script, Step};
use crate::store::AnswerStore;

/// How one pass over the remaining steps ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// A `stop` step was answered; the session continues next invocation.
    Paused {
        /// Label of the last answered step
        label: String,
    },

    /// The operator declined a step; nothing was saved for it.
    Canceled {
        /// Label of the declined step
        label: String,
    },

    /// Every step has an answer and the session should be finalized.
    Finished,
}

/// Where a session stands between invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No answers yet
    Uninitialized,
    /// Some answers collected; `index` is the next step to render
    Resumable {
        /// Index of the next step
        index: usize,
    },
    /// All steps answered
    Finished,
}

/// A script and its stored answers, ready to step.
#[derive(Debug)]
pub struct Session<S, R> {
    script: Script,
    store: S,
    renderer: R,
    handlers: PostHandlers,
}

impl<S: AnswerStore, R: Renderer> Session<S, R> {
    /// Pair `script` with `store`.
    ///
    /// A store without a snapshot adopts `script`. A store whose snapshot
    /// differs from `script`, or whose answers do not line up with the
    /// script's steps, is refused with [`HacenadaError::StaleScript`] or
    /// [`HacenadaError::Storage`].
    pub fn open(script: Script, mut store: S, renderer: R) -> HacenadaResult<Self> {
        check_consistency(&script, &mut store)?;
        Ok(Self { script, store, renderer, handlers: PostHandlers::default() })
    }

    /// Replace the post-handler table.
    #[must_use]
    pub fn with_handlers(mut self, handlers: PostHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// The post-handler table.
    pub fn handlers_mut(&mut self) -> &mut PostHandlers {
        &mut self.handlers
    }

    /// The script.
    pub fn script(&self) -> &Script {
        &self.script
    }

    /// The store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The store, mutably.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Take the session apart.
    pub fn into_parts(self) -> (Script, S, R) {
        (self.script, self.store, self.renderer)
    }

    /// Index of the next step to render.
    pub fn index(&self) -> usize {
        self.store.answers().len()
    }

    /// Whether any answer has been collected.
    pub fn started(&self) -> bool {
        self.store.started()
    }

    /// Steps not yet answered.
    pub fn remaining(&self) -> &[Step] {
        let overlay = self.script.overlay();
        &overlay[self.index().min(overlay.len())..]
    }

    /// Whether every step has an answer.
    pub fn is_exhausted(&self) -> bool {
        self.index() >= self.script.step_count()
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        match self.index() {
            0 if self.script.step_count() > 0 => SessionState::Uninitialized,
            index if index >= self.script.step_count() => SessionState::Finished,
            index => SessionState::Resumable { index },
        }
    }

    /// Render remaining steps until a `stop` step is answered, a step is
    /// declined, or the script runs out.
    ///
    /// Returns [`Advance::Finished`] only when the loop runs past the last
    /// step without stopping, or when there was nothing left to render.
    pub fn advance(&mut self) -> HacenadaResult<Advance> {
        let index = self.index();
        let total = self.script.step_count();
        if index >= total {
            tracing::debug!(index, total, "No steps remaining");
            return Ok(Advance::Finished);
        }

        for position in index..total {
            let step = &self.script.overlay()[position];

            let rendered = {
                let context = RenderContext {
                    script_name: display_name(&self.script, &self.store),
                    description: self.store.description(),
                    answers: self.store.answers(),
                    position,
                    total,
                };
                self.renderer.render(step, &context)
            };

            let value = match rendered {
                Ok(value) => value,
                Err(HacenadaError::Unanswered(_)) => {
                    tracing::info!(label = step.label, "Step canceled");
                    return Ok(Advance::Canceled { label: step.label.clone() });
                }
                Err(e) => return Err(e),
            };

            let handlers = &self.handlers;
            let event = PostEvent { label: &step.label, step_type: step.step_type, value: &value };
            self.store.save_answer_with(&step.label, value.clone(), &mut |record| {
                handlers.dispatch(record, &event)
            })?;

            if step.stop {
                tracing::info!(label = step.label, position, "Paused after stop step");
                return Ok(Advance::Paused { label: step.label.clone() });
            }
        }

        tracing::info!(total, "Ran past the last step");
        Ok(Advance::Finished)
    }

    /// One invocation's worth of stepping.
    ///
    /// Like [`Session::advance`], except that when the step just answered was
    /// the last one, the follow-up pass that finds nothing remaining runs
    /// immediately, so the caller sees [`Advance::Finished`].
    pub fn step(&mut self) -> HacenadaResult<Advance> {
        let outcome = self.advance()?;
        if matches!(outcome, Advance::Paused { .. }) && self.is_exhausted() {
            return self.advance();
        }
        Ok(outcome)
    }
}

/// Name shown to the operator: preamble name, else the script file name.
fn display_name<'a>(script: &'a Script, store: &'a impl AnswerStore) -> &'a str {
    script
        .name()
        .or_else(|| store.script_path().and_then(|p| p.file_name()).and_then(|n| n.to_str()))
        .unwrap_or(crate::APP_NAME)
}

fn stale_error(script: &Script, store: &impl AnswerStore) -> HacenadaError {
    let path = store
        .script_path()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(script.name().unwrap_or("script")));
    HacenadaError::StaleScript(path)
}

fn check_consistency(script: &Script, store: &mut impl AnswerStore) -> HacenadaResult<()> {
    match store.script_snapshot().map(|snapshot| script.matches(snapshot)) {
        Some(false) => {
            tracing::warn!(answers = store.answers().len(), "Script changed since session started");
            return Err(stale_error(script, &*store));
        }
        Some(true) => {}
        None if store.started() => {
            tracing::warn!("Session has answers but no script snapshot");
            return Err(stale_error(script, &*store));
        }
        None => store.set_script_snapshot(script.to_structured())?,
    }

    let answers = store.answers();
    if answers.len() > script.step_count() {
        return Err(HacenadaError::Storage(format!(
            "{} answers stored for a script with {} steps",
            answers.len(),
            script.step_count()
        )));
    }

    for (answer, step) in answers.iter().zip(script.overlay()) {
        if answer.label != step.label {
            return Err(HacenadaError::Storage(format!(
                "answer '{}' is stored where step '{}' was expected",
                answer.label, step.label
            )));
        }
    }

    Ok(())
}
