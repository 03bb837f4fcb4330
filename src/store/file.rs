//! File-backed session storage.
//!
//! Each script gets one JSON file under the store home, named after the
//! script's absolute path. Writes go through a temp file and an atomic rename.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;

use super::{AnswerStore, AnswerValue, SessionRecord, RECORD_VERSION};
use crate::error::{HacenadaError, HacenadaResult};
use crate::script::StructuredScript;

const STORE_SUFFIX: &str = ".json";

/// Produce a legal file name from `path`.
///
/// Separators become `__`; `%` and `_` are percent-escaped so distinct paths
/// never share a name. Leading and trailing separators are dropped, and
/// `suffix` is appended to the full name when given.
pub fn normalize_path(path: &Path, suffix: Option<&str>) -> String {
    let text = path.to_string_lossy();
    let mut normal = String::with_capacity(text.len());

    for c in text.trim_matches(std::path::is_separator).chars() {
        match c {
            '%' => normal.push_str("%25"),
            '_' => normal.push_str("%5F"),
            ':' => normal.push_str("%3A"),
            c if std::path::is_separator(c) => normal.push_str("__"),
            c => normal.push(c),
        }
    }

    if let Some(suffix) = suffix {
        normal.push_str(suffix);
    }
    normal
}

/// The absolute location of `path`, with symlinks resolved when it exists.
fn resolve_location(path: &Path) -> HacenadaResult<PathBuf> {
    match fs::canonicalize(path) {
        Ok(resolved) => Ok(resolved),
        Err(_) => Ok(std::path::absolute(path)?),
    }
}

/// Identity of the store that belongs to one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHandle {
    script_path: PathBuf,
    store_path: PathBuf,
}

impl StoreHandle {
    /// Absolute path of the script.
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    /// Path of the JSON store file.
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }
}

/// The directory that holds every session store.
#[derive(Debug, Clone)]
pub struct StoreHome {
    root: PathBuf,
}

impl StoreHome {
    /// Use `root` as the store directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a script location to its store.
    pub fn resolve(&self, script_path: &Path) -> HacenadaResult<StoreHandle> {
        let script_path = resolve_location(script_path)?;
        let store_path = self.root.join(normalize_path(&script_path, Some(STORE_SUFFIX)));
        Ok(StoreHandle { script_path, store_path })
    }

    /// Whether a session exists for `handle`.
    pub fn exists(&self, handle: &StoreHandle) -> bool {
        handle.store_path.is_file()
    }

    /// Open the store for `handle`, creating it when missing.
    pub fn open_or_create(&self, handle: &StoreHandle) -> HacenadaResult<FileStore> {
        if let Some(store) = self.open_existing(handle)? {
            return Ok(store);
        }

        let store = FileStore {
            path: handle.store_path.clone(),
            record: SessionRecord::new(Some(handle.script_path.clone())),
        };
        store.persist()?;
        tracing::debug!(store = %handle.store_path.display(), "Created session store");
        Ok(store)
    }

    /// Open the store for `handle` if it exists.
    pub fn open_existing(&self, handle: &StoreHandle) -> HacenadaResult<Option<FileStore>> {
        match FileStore::load(&handle.store_path) {
            Ok(store) => Ok(Some(store)),
            Err(HacenadaError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Find the single session whose script lives under `cwd`.
    pub fn find_by_working_directory(&self, cwd: &Path) -> HacenadaResult<FileStore> {
        let cwd = resolve_location(cwd)?;
        let not_found = || HacenadaError::NoSessionFound(cwd.display().to_string());

        let normal = normalize_path(&cwd, None);
        let prefix = if normal.is_empty() { normal } else { format!("{normal}__") };

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                entry.file_name().to_str().map_or(false, |name| {
                    name.starts_with(&prefix) && name.ends_with(STORE_SUFFIX)
                })
            })
            .map(|entry| entry.path())
            .collect();
        candidates.sort();

        match candidates.len() {
            0 => Err(not_found()),
            1 => match FileStore::load(&candidates[0]) {
                Err(HacenadaError::Io(e)) if e.kind() == ErrorKind::NotFound => Err(not_found()),
                other => other,
            },
            _ => Err(HacenadaError::AmbiguousSession(candidates)),
        }
    }

    /// Delete the session for `handle`.
    pub fn drop_session(&self, handle: &StoreHandle) -> HacenadaResult<()> {
        remove_if_present(&handle.store_path)?;
        tracing::info!(store = %handle.store_path.display(), "Dropped session store");
        Ok(())
    }
}

/// A session store persisted as one JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    record: SessionRecord,
}

impl FileStore {
    /// Load the store at `path`.
    pub fn load(path: &Path) -> HacenadaResult<Self> {
        let content = fs::read_to_string(path)?;
        let record: SessionRecord = serde_json::from_str(&content)
            .map_err(|e| HacenadaError::Storage(format!("{}: {e}", path.display())))?;

        if record.version > RECORD_VERSION {
            return Err(HacenadaError::Storage(format!(
                "{} was written by a newer version (record version {})",
                path.display(),
                record.version
            )));
        }

        Ok(Self { path: path.to_path_buf(), record })
    }

    /// Path of the JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the record to disk atomically.
    fn persist(&self) -> HacenadaResult<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let content = serde_json::to_vec_pretty(&self.record)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&content)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| HacenadaError::Io(e.error))?;
        Ok(())
    }

    /// Apply `change` and persist it, leaving the record untouched on failure.
    fn update(
        &mut self,
        change: impl FnOnce(&mut SessionRecord) -> HacenadaResult<()>,
    ) -> HacenadaResult<()> {
        let previous = self.record.clone();
        let result = change(&mut self.record).and_then(|()| self.persist());
        if result.is_err() {
            self.record = previous;
        }
        result
    }
}

impl AnswerStore for FileStore {
    fn record(&self) -> &SessionRecord {
        &self.record
    }

    fn save_answer_with(
        &mut self,
        label: &str,
        value: AnswerValue,
        effect: &mut dyn FnMut(&mut SessionRecord) -> HacenadaResult<()>,
    ) -> HacenadaResult<()> {
        self.update(|record| {
            record.upsert_answer(label, value, Utc::now());
            effect(record)
        })?;
        tracing::debug!(label, store = %self.path.display(), "Saved answer");
        Ok(())
    }

    fn set_description(&mut self, description: &str) -> HacenadaResult<()> {
        self.update(|record| {
            record.meta.description = description.to_string();
            Ok(())
        })
    }

    fn set_script_snapshot(&mut self, snapshot: StructuredScript) -> HacenadaResult<()> {
        self.update(|record| {
            record.script = Some(snapshot);
            Ok(())
        })
    }

    fn clear(&mut self) -> HacenadaResult<()> {
        remove_if_present(&self.path)?;
        self.record.reset();
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> HacenadaResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// A store home plus a project directory containing `project.toml`.
    fn fixture() -> (tempfile::TempDir, StoreHome, PathBuf) {
        let dir = tempdir().unwrap();
        let home = StoreHome::new(dir.path().join("home"));
        let project = dir.path().join("project");
        fs::create_dir_all(&project).unwrap();
        let script = project.join("project.toml");
        fs::write(&script, "[hacenada]\nname = \"hola\"\n").unwrap();
        (dir, home, script)
    }

    #[test]
    fn test_normalize_path() {
        let cases = [
            ("hellO", None, "hellO"),
            ("/is/it/me/youre/looking/for/", None, "is__it__me__youre__looking__for"),
            (
                "/i/can/see/it/in/your/smile.toml",
                Some(".json"),
                "i__can__see__it__in__your__smile.toml.json",
            ),
            ("/srv/my_dir/50%.toml", None, "srv__my%5Fdir__50%25.toml"),
        ];

        for (input, suffix, expected) in cases {
            assert_eq!(normalize_path(Path::new(input), suffix), expected);
        }
    }

    #[test]
    fn test_normalize_path_keeps_distinct_paths_distinct() {
        let a = normalize_path(Path::new("/a/b.toml"), None);
        let b = normalize_path(Path::new("/a__b.toml"), None);
        let c = normalize_path(Path::new("/a/b.yaml"), None);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_resolve_is_stable() {
        let (_dir, home, script) = fixture();
        let first = home.resolve(&script).unwrap();
        let second = home.resolve(&script).unwrap();
        assert_eq!(first, second);
        assert!(first.store_path().starts_with(home.root()));
        assert!(first.script_path().is_absolute());
    }

    #[test]
    fn test_open_or_create_is_idempotent() {
        let (_dir, home, script) = fixture();
        let handle = home.resolve(&script).unwrap();

        let mut store = home.open_or_create(&handle).unwrap();
        assert!(home.exists(&handle));
        store.save_answer("q1", "a1".into()).unwrap();

        let again = home.open_or_create(&handle).unwrap();
        assert_eq!(again.answers().len(), 1);
        assert_eq!(again.script_path(), Some(handle.script_path()));
    }

    #[test]
    fn test_save_get_answer() {
        let (_dir, home, script) = fixture();
        let handle = home.resolve(&script).unwrap();
        let mut store = home.open_or_create(&handle).unwrap();

        store.save_answer("q1", "a1".into()).unwrap();
        assert_eq!(store.answers().len(), 1);

        let answer = store.get_answer("q1").unwrap();
        assert_eq!(answer.label, "q1");
        assert_eq!(answer.value, "a1");
        assert!(store.get_answer("q2").is_none());
    }

    #[test]
    fn test_every_mutation_is_on_disk() {
        let (_dir, home, script) = fixture();
        let handle = home.resolve(&script).unwrap();
        let mut store = home.open_or_create(&handle).unwrap();

        store.save_answer("q1", "a1".into()).unwrap();
        store.save_answer("q2", true.into()).unwrap();
        store.set_description("hello there").unwrap();

        let reloaded = FileStore::load(handle.store_path()).unwrap();
        assert_eq!(reloaded.record(), store.record());
        assert_eq!(reloaded.description(), "hello there");
        assert_eq!(reloaded.answers()[1].value, true);
    }

    #[test]
    fn test_failed_effect_leaves_disk_untouched() {
        let (_dir, home, script) = fixture();
        let handle = home.resolve(&script).unwrap();
        let mut store = home.open_or_create(&handle).unwrap();
        store.save_answer("q1", "a1".into()).unwrap();
        let before = fs::read_to_string(handle.store_path()).unwrap();

        let result = store.save_answer_with("q2", "a2".into(), &mut |record| {
            record.meta.description = "half written".into();
            Err(HacenadaError::Storage("handler failed".into()))
        });

        assert!(matches!(result, Err(HacenadaError::Storage(_))));
        assert_eq!(store.answers().len(), 1);
        assert!(store.description().is_empty());
        assert_eq!(fs::read_to_string(handle.store_path()).unwrap(), before);
    }

    #[test]
    fn test_answer_and_effect_share_one_write() {
        let (_dir, home, script) = fixture();
        let handle = home.resolve(&script).unwrap();
        let mut store = home.open_or_create(&handle).unwrap();

        store
            .save_answer_with("q1", "deploy 1.2".into(), &mut |record| {
                record.meta.description = "deploy 1.2".into();
                Ok(())
            })
            .unwrap();

        let reloaded = FileStore::load(handle.store_path()).unwrap();
        assert_eq!(reloaded.answers().len(), 1);
        assert_eq!(reloaded.description(), "deploy 1.2");
    }

    #[test]
    fn test_snapshot_keeps_toml_values() {
        let (_dir, home, script_path) = fixture();
        let text = r#"
[hacenada]
name = "typed"
released = 1979-05-27T07:32:00Z
ratio = 0.25

[hacenada.owner]
team = "ops"
window = { start = 07:30:00, days = [1, 2, 3] }

[[step]]
message = "check"
threshold = 99.5
when = 2024-01-02
"#;
        let script = crate::script::parse_script_str(text).unwrap();
        let handle = home.resolve(&script_path).unwrap();
        let mut store = home.open_or_create(&handle).unwrap();
        store.set_script_snapshot(script.to_structured()).unwrap();

        let reloaded = FileStore::load(handle.store_path()).unwrap();
        let snapshot = reloaded.script_snapshot().unwrap();
        assert!(script.matches(snapshot));
    }

    #[test]
    fn test_drop_session() {
        let (_dir, home, script) = fixture();
        let handle = home.resolve(&script).unwrap();
        let mut store = home.open_or_create(&handle).unwrap();
        store.save_answer("q1", "a1".into()).unwrap();
        store.set_description("hello there").unwrap();

        home.drop_session(&handle).unwrap();
        assert!(!home.exists(&handle));

        let fresh = home.open_or_create(&handle).unwrap();
        assert!(fresh.answers().is_empty());
        assert!(fresh.description().is_empty());

        // dropping twice is fine
        home.drop_session(&handle).unwrap();
        home.drop_session(&handle).unwrap();
    }

    #[test]
    fn test_clear_removes_file() {
        let (_dir, home, script) = fixture();
        let handle = home.resolve(&script).unwrap();
        let mut store = home.open_or_create(&handle).unwrap();
        store.save_answer("q1", "a1".into()).unwrap();

        store.clear().unwrap();
        assert!(!home.exists(&handle));
        assert!(!store.started());
        assert_eq!(store.script_path(), Some(handle.script_path()));
    }

    #[test]
    fn test_find_by_working_directory() {
        let (_dir, home, script) = fixture();
        let project = script.parent().unwrap();

        // nothing stored yet
        assert!(matches!(
            home.find_by_working_directory(project),
            Err(HacenadaError::NoSessionFound(_))
        ));

        let handle = home.resolve(&script).unwrap();
        home.open_or_create(&handle).unwrap();

        let found = home.find_by_working_directory(project).unwrap();
        assert_eq!(found.script_path(), Some(handle.script_path()));

        // a second script in the same directory makes the lookup ambiguous
        let other = project.join("project2.toml");
        fs::write(&other, "").unwrap();
        home.open_or_create(&home.resolve(&other).unwrap()).unwrap();
        assert!(matches!(
            home.find_by_working_directory(project),
            Err(HacenadaError::AmbiguousSession(paths)) if paths.len() == 2
        ));
    }

    #[test]
    fn test_find_matches_whole_path_components() {
        let (dir, home, script) = fixture();
        home.open_or_create(&home.resolve(&script).unwrap()).unwrap();

        // "project-other" shares a string prefix with "project" but is a sibling
        let sibling = dir.path().join("project-other");
        fs::create_dir_all(&sibling).unwrap();
        assert!(matches!(
            home.find_by_working_directory(&sibling),
            Err(HacenadaError::NoSessionFound(_))
        ));

        // a parent directory still sees the session
        assert!(home.find_by_working_directory(dir.path()).is_ok());
    }

    #[test]
    fn test_find_ignores_foreign_files() {
        let (_dir, home, script) = fixture();
        let handle = home.resolve(&script).unwrap();
        home.open_or_create(&handle).unwrap();

        // leftovers from an interrupted write are not sessions
        fs::write(home.root().join(".tmpAbc123"), "{").unwrap();
        let project = script.parent().unwrap();
        assert!(home.find_by_working_directory(project).is_ok());
    }

    #[test]
    fn test_corrupt_store_is_a_storage_error() {
        let (_dir, home, script) = fixture();
        let handle = home.resolve(&script).unwrap();
        fs::create_dir_all(home.root()).unwrap();
        fs::write(handle.store_path(), "not json").unwrap();

        assert!(matches!(home.open_or_create(&handle), Err(HacenadaError::Storage(_))));
    }

    #[test]
    fn test_missing_home_is_no_session() {
        let dir = tempdir().unwrap();
        let home = StoreHome::new(dir.path().join("never-created"));
        assert!(matches!(
            home.find_by_working_directory(dir.path()),
            Err(HacenadaError::NoSessionFound(_))
        ));
    }
}
