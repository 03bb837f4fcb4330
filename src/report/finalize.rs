//! Completion logs.
//!
//! A finished session leaves two files in the log directory, a markdown
//! transcript and a JSON record, both named
//! `<YYYY-MM-DD>-<NN>-<slug>`. The session store is cleared only after both
//! are on disk, so a session is finalized at most once.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use toml::Table;

use super::{slugify, to_markdown};
use crate::error::HacenadaResult;
use crate::script::Script;
use crate::store::{Answer, AnswerStore, SessionMeta, SessionRecord};

const MAX_SLUG_LEN: usize = 48;

/// Paths of the files written for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionLog {
    /// Markdown transcript
    pub human: PathBuf,
    /// JSON record
    pub machine: PathBuf,
}

#[derive(Debug, Serialize)]
struct Transcript<'a> {
    hacenada: &'a Table,
    step: &'a [Table],
    answer: &'a [Answer],
    meta: &'a SessionMeta,
    completed: bool,
    finished_at: DateTime<Utc>,
}

/// Writes completion logs into one directory.
#[derive(Debug, Clone)]
pub struct LogFinalizer {
    log_dir: PathBuf,
}

impl LogFinalizer {
    /// Write logs into `log_dir`, created on first use.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self { log_dir: log_dir.into() }
    }

    /// The log directory.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Write the logs for a completed session, then clear its store.
    pub fn finalize(&self, script: &Script, store: &mut dyn AnswerStore) -> HacenadaResult<CompletionLog> {
        let log = self.write_logs(script, store.record(), Local::now().date_naive(), true)?;
        store.clear()?;
        tracing::info!(log = %log.human.display(), "Session finalized");
        Ok(log)
    }

    /// Write the logs for a session abandoned part way, then clear its store.
    pub fn archive_incomplete(
        &self,
        script: &Script,
        store: &mut dyn AnswerStore,
    ) -> HacenadaResult<CompletionLog> {
        let log = self.write_logs(script, store.record(), Local::now().date_naive(), false)?;
        store.clear()?;
        tracing::info!(log = %log.human.display(), "Archived incomplete session");
        Ok(log)
    }

    /// Write both log files for `record`, dated `date`.
    pub fn write_logs(
        &self,
        script: &Script,
        record: &SessionRecord,
        date: NaiveDate,
        completed: bool,
    ) -> HacenadaResult<CompletionLog> {
        fs::create_dir_all(&self.log_dir)?;

        let mut human_text = to_markdown(script, Some(record));
        if !completed {
            human_text.push_str(&format!(
                "_Incomplete: {} of {} steps answered._\n",
                record.answers.len(),
                script.step_count()
            ));
        }

        let transcript = Transcript {
            hacenada: script.preamble(),
            step: script.raw_steps(),
            answer: &record.answers,
            meta: &record.meta,
            completed,
            finished_at: Utc::now(),
        };
        let machine_text = serde_json::to_string_pretty(&transcript)?;

        let slug = log_slug(script, record);
        let mut sequence = next_sequence(&self.log_dir, date)?;

        loop {
            let stem = format!("{date}-{sequence:02}-{slug}");
            let human = self.log_dir.join(format!("{stem}.md"));

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&human) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %human.display(), "Log name taken, trying the next one");
                    sequence += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            file.write_all(human_text.as_bytes())?;
            file.sync_all()?;

            let machine = self.log_dir.join(format!("{stem}.json"));
            fs::write(&machine, machine_text.as_bytes())?;

            return Ok(CompletionLog { human, machine });
        }
    }
}

fn log_slug(script: &Script, record: &SessionRecord) -> String {
    let source = Some(record.meta.description.as_str())
        .filter(|d| !d.trim().is_empty())
        .or_else(|| script.name())
        .unwrap_or("session");

    let mut slug: String = slugify(source).chars().take(MAX_SLUG_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "session".to_string()
    } else {
        slug
    }
}

/// One past the highest counter used on `date`, or 1.
fn next_sequence(dir: &Path, date: NaiveDate) -> HacenadaResult<u32> {
    let prefix = format!("{date}-");
    let mut highest = 0;

    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(rest) = name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
            continue;
        };
        if let Some(counter) = rest.split('-').next().and_then(|c| c.parse::<u32>().ok()) {
            highest = highest.max(counter);
        }
    }

    Ok(highest + 1)
}
