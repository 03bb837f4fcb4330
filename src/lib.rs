//! # hacenada
//!
//! Do-nothing scripts for your terminal.
//!
//! A script is a TOML (or YAML) file with a `[hacenada]` preamble and an
//! ordered list of `[[step]]` tables. Each invocation of the CLI renders the
//! next unanswered steps, saves every answer as soon as it is given, and
//! pauses after any step marked `stop`. When the last step is answered the
//! session is written out as a markdown and a JSON log and its store is
//! removed.
//!
//! ## Quick Start
//!
//! ```bash
//! # Begin a runbook
//! hacenada start deploy.toml
//!
//! # Pick it up again later, from anywhere under its directory
//! hacenada next
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::derivable_impls)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::format_push_string)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app;
pub mod config;
pub mod error;
pub mod render;
pub mod report;
pub mod script;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use app::{App, RunOutcome};
pub use config::Config;
pub use error::{HacenadaError, HacenadaResult};
pub use script::{load_script, Script, Step, StepType};
pub use session::{Advance, Session, SessionState};
pub use store::{AnswerStore, FileStore, MemoryStore, StoreHome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "hacenada";
