//! Application entry points.
//!
//! The `App` ties the store home, the completion logs and the configuration
//! together and implements the `start`, `next` and `print` commands on top of
//! the session engine.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{HacenadaError, HacenadaResult};
use crate::render::Renderer;
use crate::report::{self, CompletionLog, LogFinalizer, OutputFormat};
use crate::script::{load_script, Script};
use crate::session::{Advance, Session};
use crate::store::{AnswerStore, FileStore, StoreHome};

/// What one `start` or `next` invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A `stop` step was answered; run `next` to continue.
    Paused {
        /// The script being run
        script: PathBuf,
        /// Label of the last answered step
        label: String,
    },

    /// The operator declined a step.
    Canceled {
        /// The script being run
        script: PathBuf,
        /// Label of the declined step
        label: String,
    },

    /// Every step was answered; the logs are written and the store is gone.
    Finished {
        /// The script that was run
        script: PathBuf,
        /// The completion logs
        log: CompletionLog,
    },
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    config: Config,
    home: StoreHome,
}

impl App {
    /// Create an app from `config`; `home` overrides the configured store home.
    pub fn new(config: Config, home: Option<PathBuf>) -> anyhow::Result<Self> {
        let root = match home {
            Some(home) => home,
            None => config.store_home()?,
        };
        tracing::debug!(home = %root.display(), "Using store home");
        Ok(Self::with_home(config, StoreHome::new(root)))
    }

    /// Create an app with an explicit store home.
    pub fn with_home(config: Config, home: StoreHome) -> Self {
        Self { config, home }
    }

    /// The configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The store home.
    pub fn home(&self) -> &StoreHome {
        &self.home
    }

    /// Begin a session for the script at `path` and run its first steps.
    ///
    /// A session that already has answers is refused unless `start_over` is
    /// set, in which case its transcript is archived as incomplete and the
    /// session is dropped first.
    pub fn start<R: Renderer>(
        &self,
        path: &Path,
        start_over: bool,
        renderer: R,
    ) -> HacenadaResult<RunOutcome> {
        let script = load_script(path)?;
        let handle = self.home.resolve(path)?;

        let existing = match self.home.open_existing(&handle) {
            Err(HacenadaError::Storage(reason)) if start_over => {
                tracing::warn!(%reason, "Discarding unreadable session store");
                self.home.drop_session(&handle)?;
                None
            }
            other => other?,
        };

        if let Some(mut existing) = existing {
            if existing.started() {
                if !start_over {
                    return Err(HacenadaError::AlreadyStarted(path.to_path_buf()));
                }

                // the answers belong to the snapshot, which may predate edits
                let answered = existing
                    .script_snapshot()
                    .and_then(|snapshot| Script::from_structured(snapshot.clone()).ok())
                    .unwrap_or_else(|| script.clone());
                let log = self
                    .finalizer_for(handle.script_path())?
                    .archive_incomplete(&answered, &mut existing)?;
                tracing::info!(log = %log.human.display(), "Starting over");
            }
            self.home.drop_session(&handle)?;
        }

        let store = self.home.open_or_create(&handle)?;
        self.run(script, handle.script_path(), store, renderer)
    }

    /// Resume the session for `path`, or the only session under `cwd`.
    pub fn next<R: Renderer>(
        &self,
        path: Option<&Path>,
        cwd: &Path,
        renderer: R,
    ) -> HacenadaResult<RunOutcome> {
        let (script_path, store) = self.find_session(path, cwd)?;
        let script = load_script(&script_path)?;
        self.run(script, &script_path, store, renderer)
    }

    /// Format a script, with its session's answers when `with_answers` is set.
    ///
    /// Never modifies the session.
    pub fn print(
        &self,
        path: Option<&Path>,
        cwd: &Path,
        format: OutputFormat,
        with_answers: bool,
    ) -> HacenadaResult<String> {
        let (script_path, record) = match path {
            Some(path) => {
                let handle = self.home.resolve(path)?;
                let record = self.home.open_existing(&handle)?.map(|s| s.record().clone());
                (path.to_path_buf(), record)
            }
            None => {
                let (script_path, store) = self.find_session(None, cwd)?;
                (script_path, Some(store.record().clone()))
            }
        };

        let script = load_script(&script_path)?;
        let record = record.filter(|_| with_answers);
        report::render(&script, record.as_ref(), format)
    }

    fn find_session(&self, path: Option<&Path>, cwd: &Path) -> HacenadaResult<(PathBuf, FileStore)> {
        match path {
            Some(path) => {
                let handle = self.home.resolve(path)?;
                match self.home.open_existing(&handle)? {
                    Some(store) => Ok((handle.script_path().to_path_buf(), store)),
                    None => Err(HacenadaError::NoSessionFound(path.display().to_string())),
                }
            }
            None => {
                let store = self.home.find_by_working_directory(cwd)?;
                let script_path = store.script_path().map(Path::to_path_buf).ok_or_else(|| {
                    HacenadaError::Storage(format!("{} has no script path", store.path().display()))
                })?;
                Ok((script_path, store))
            }
        }
    }

    fn run<R: Renderer>(
        &self,
        script: Script,
        script_path: &Path,
        store: FileStore,
        renderer: R,
    ) -> HacenadaResult<RunOutcome> {
        let mut session = Session::open(script, store, renderer)?;
        let script_path = script_path.to_path_buf();

        match session.step()? {
            Advance::Paused { label } => Ok(RunOutcome::Paused { script: script_path, label }),
            Advance::Canceled { label } => Ok(RunOutcome::Canceled { script: script_path, label }),
            Advance::Finished => {
                let (script, mut store, _) = session.into_parts();
                let log = self.finalizer_for(&script_path)?.finalize(&script, &mut store)?;
                Ok(RunOutcome::Finished { script: script_path, log })
            }
        }
    }

    fn finalizer_for(&self, script_path: &Path) -> HacenadaResult<LogFinalizer> {
        let dir = self
            .config
            .log_dir_for(script_path)
            .map_err(|e| HacenadaError::Storage(format!("log directory: {e}")))?;
        Ok(LogFinalizer::new(dir))
    }
}
