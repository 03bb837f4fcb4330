//! Error types shared by the script, store, render and session layers.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for hacenada operations.
pub type HacenadaResult<T> = Result<T, HacenadaError>;

/// Errors that can occur while loading, stepping or finishing a session.
#[derive(Debug, Error)]
pub enum HacenadaError {
    /// The script file does not exist.
    #[error("** {} does not exist :(", .0.display())]
    ScriptNotFound(PathBuf),

    /// The script is not well-formed or misses a required section.
    #[error("Failed to parse script: {0}")]
    Parse(String),

    /// The operator left a prompt without answering it.
    #[error("Step '{0}' was not answered")]
    Unanswered(String),

    /// More than one session could be resumed from the working directory.
    #[error("Multiple possible sessions found: {}", format_paths(.0))]
    AmbiguousSession(Vec<PathBuf>),

    /// No session could be resumed.
    #[error("No possible session found corresponding to {0}")]
    NoSessionFound(String),

    /// The script changed since the session recorded its snapshot.
    #[error(
        "** {} changed since this session started; use `start --start-over` to discard the saved answers",
        .0.display()
    )]
    StaleScript(PathBuf),

    /// `start` was asked to overwrite a session that already has answers.
    #[error(
        "** {} already contains some answers, will not overwrite an ongoing session without --start-over",
        .0.display()
    )]
    AlreadyStarted(PathBuf),

    /// The persisted session is unreadable or inconsistent.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A script, session or transcript could not be serialized.
    #[error("Failed to serialize: {0}")]
    Serialize(String),

    /// The external editor could not be run.
    #[error("Editor error: {0}")]
    Editor(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HacenadaError {
    /// Whether this error is the operator declining a prompt.
    pub fn is_unanswered(&self) -> bool {
        matches!(self, Self::Unanswered(_))
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    format!("[{}]", names.join(", "))
}
