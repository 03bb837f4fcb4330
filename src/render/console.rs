//! Line-oriented terminal renderer.

use std::env;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process::Command;

use crossterm::style::Stylize;

use super::{RenderContext, Renderer};
use crate::error::{HacenadaError, HacenadaResult};
use crate::script::{Step, StepType};
use crate::store::AnswerValue;

const SEPARATOR: &str = "---------------";

/// Renders steps as plain prompts on a terminal (or any reader/writer pair).
///
/// End of input (Ctrl-D) declines the current step.
#[derive(Debug)]
pub struct ConsoleRenderer<R, W> {
    input: R,
    output: W,
    editor: Option<String>,
    color: bool,
}

impl ConsoleRenderer<io::StdinLock<'static>, io::Stdout> {
    /// Render on stdin/stdout. Color is only used when stdout is a terminal.
    pub fn stdio(editor: Option<String>, color: bool) -> Self {
        let color = color && io::stdout().is_terminal();
        Self::new(io::stdin().lock(), io::stdout()).with_editor(editor).with_color(color)
    }
}

impl<R: BufRead, W: Write> ConsoleRenderer<R, W> {
    /// Render using `input` and `output`, without color.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output, editor: None, color: false }
    }

    /// Override the editor command used for `editor` steps.
    #[must_use]
    pub fn with_editor(mut self, editor: Option<String>) -> Self {
        self.editor = editor.filter(|e| !e.trim().is_empty());
        self
    }

    /// Enable or disable styled output.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Give back the writer (tests inspect what was shown).
    pub fn into_output(self) -> W {
        self.output
    }

    /// The editor command: explicit override, then `$VISUAL`, `$EDITOR`, `vi`.
    pub fn editor_command(&self) -> String {
        self.editor
            .clone()
            .or_else(|| env::var("VISUAL").ok().filter(|e| !e.trim().is_empty()))
            .or_else(|| env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
            .unwrap_or_else(|| "vi".to_string())
    }

    fn header(&mut self, step: &Step, context: &RenderContext<'_>) -> io::Result<()> {
        let progress = format!("[{}/{}]", context.position + 1, context.total);
        let label = format!("[{}]", step.label);

        writeln!(self.output, "{SEPARATOR}")?;
        if self.color {
            writeln!(self.output, "{} {}", progress.dim(), context.title().bold())?;
            writeln!(self.output, "{}  {}", label.cyan(), step.message.trim())?;
        } else {
            writeln!(self.output, "{progress} {}", context.title())?;
            writeln!(self.output, "{label}  {}", step.message.trim())?;
        }
        Ok(())
    }

    fn prompt(&mut self, text: &str) -> io::Result<()> {
        if self.color {
            write!(self.output, "{} ", text.bold())?;
        } else {
            write!(self.output, "{text} ")?;
        }
        self.output.flush()
    }

    /// One line of input without its line ending; `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn ask_text(&mut self, step: &Step, default: &str) -> HacenadaResult<AnswerValue> {
        if default.is_empty() {
            self.prompt(">")?;
        } else {
            self.prompt(&format!("[{}] >", default.trim()))?;
        }

        let line = self.read_line()?.ok_or_else(|| unanswered(step))?;
        let text = if line.trim().is_empty() { default.to_string() } else { line };
        Ok(AnswerValue::String(text))
    }

    fn ask_confirm(&mut self, step: &Step, default: bool) -> HacenadaResult<AnswerValue> {
        let choices = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            self.prompt(choices)?;
            let line = self.read_line()?.ok_or_else(|| unanswered(step))?;
            match parse_yes_no(&line, default) {
                Some(answer) => return Ok(AnswerValue::Bool(answer)),
                None => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    fn ask_editor(&mut self, step: &Step, initial: &str) -> HacenadaResult<AnswerValue> {
        let command = self.editor_command();
        self.prompt(&format!("Press enter to open {command} (Ctrl-D to skip)"))?;
        self.read_line()?.ok_or_else(|| unanswered(step))?;

        match self.edit(&command, initial)? {
            Some(text) => Ok(AnswerValue::String(text)),
            None => Err(unanswered(step)),
        }
    }

    /// Run `command` on a temp file holding `initial`; `None` if the editor fails.
    fn edit(&self, command: &str, initial: &str) -> HacenadaResult<Option<String>> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| HacenadaError::Editor("empty editor command".to_string()))?;

        let mut file = tempfile::Builder::new().prefix("hacenada-").suffix(".md").tempfile()?;
        file.write_all(initial.as_bytes())?;
        file.flush()?;

        let status = Command::new(program)
            .args(parts)
            .arg(file.path())
            .status()
            .map_err(|e| HacenadaError::Editor(format!("could not run '{command}': {e}")))?;

        if !status.success() {
            tracing::warn!(editor = command, code = ?status.code(), "Editor exited unsuccessfully");
            return Ok(None);
        }

        Ok(Some(fs::read_to_string(file.path())?))
    }
}

impl<R: BufRead, W: Write> Renderer for ConsoleRenderer<R, W> {
    fn render(&mut self, step: &Step, context: &RenderContext<'_>) -> HacenadaResult<AnswerValue> {
        self.header(step, context)?;

        let previous = context.previous(&step.label).and_then(|a| a.value.as_str());
        match step.step_type {
            StepType::Description => {
                let default = previous.unwrap_or(context.description);
                self.ask_text(step, default)
            }
            StepType::Message => self.ask_confirm(step, true),
            StepType::Confirm => self.ask_confirm(step, false),
            StepType::Editor => {
                let initial = previous.or_else(|| step.extra_str("default")).unwrap_or("");
                self.ask_editor(step, initial)
            }
        }
    }
}

fn unanswered(step: &Step) -> HacenadaError {
    HacenadaError::Unanswered(step.label.clone())
}

/// Interpret a yes/no reply; empty input takes `default`.
fn parse_yes_no(reply: &str, default: bool) -> Option<bool> {
    match reply.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
