//! Rendering steps to the operator.
//!
//! A [`Renderer`] shows one step and returns the operator's answer, or
//! [`HacenadaError::Unanswered`] when they leave without answering.

mod console;

use std::collections::VecDeque;

pub use console::ConsoleRenderer;

use crate::error::{HacenadaError, HacenadaResult};
use crate::script::Step;
use crate::store::{Answer, AnswerValue};

/// What a renderer may know about the session while showing a step.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Display name of the script
    pub script_name: &'a str,
    /// Current session description (empty when unset)
    pub description: &'a str,
    /// Answers collected so far
    pub answers: &'a [Answer],
    /// Zero-based index of the step being shown
    pub position: usize,
    /// Total number of steps
    pub total: usize,
}

impl<'a> RenderContext<'a> {
    /// Prompt title: the description when set, else the script name.
    pub fn title(&self) -> &'a str {
        if self.description.trim().is_empty() {
            self.script_name
        } else {
            self.description
        }
    }

    /// A previously saved answer for `label`.
    pub fn previous(&self, label: &str) -> Option<&'a Answer> {
        self.answers.iter().find(|a| a.label == label)
    }
}

/// Shows a step and collects its answer.
pub trait Renderer {
    /// Render `step` and block until it is answered or declined.
    fn render(&mut self, step: &Step, context: &RenderContext<'_>) -> HacenadaResult<AnswerValue>;
}

impl<T: Renderer + ?Sized> Renderer for &mut T {
    fn render(&mut self, step: &Step, context: &RenderContext<'_>) -> HacenadaResult<AnswerValue> {
        (**self).render(step, context)
    }
}

impl<T: Renderer + ?Sized> Renderer for Box<T> {
    fn render(&mut self, step: &Step, context: &RenderContext<'_>) -> HacenadaResult<AnswerValue> {
        (**self).render(step, context)
    }
}

/// A renderer that replays canned answers; `None` declines the step.
///
/// Running out of answers also declines.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRenderer {
    replies: VecDeque<Option<AnswerValue>>,
    rendered: Vec<String>,
}

impl ScriptedRenderer {
    /// Replay `replies` in order.
    pub fn new(replies: impl IntoIterator<Item = Option<AnswerValue>>) -> Self {
        Self { replies: replies.into_iter().collect(), rendered: Vec::new() }
    }

    /// Labels of every step shown so far.
    pub fn rendered(&self) -> &[String] {
        &self.rendered
    }
}

impl Renderer for ScriptedRenderer {
    fn render(&mut self, step: &Step, _context: &RenderContext<'_>) -> HacenadaResult<AnswerValue> {
        self.rendered.push(step.label.clone());
        self.replies.pop_front().flatten().ok_or_else(|| HacenadaError::Unanswered(step.label.clone()))
    }
}
