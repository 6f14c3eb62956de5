//! Artifact Storage - Revisioned Read/Write
//!
//! Writes carry the revision the caller last saw. A store rejects the write
//! with [`StorageError::Conflict`] when that revision is no longer current.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::hashing::sha256_hex;

/// Opaque marker identifying one stored version of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub String);

impl Revision {
    pub fn of(content: &str) -> Self {
        Self::of_bytes(content.as_bytes())
    }

    pub fn of_bytes(data: &[u8]) -> Self {
        Self(sha256_hex(data))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub content: String,
    pub revision: Revision,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Conflicting write to {path}: expected revision {expected}, found {actual}")]
    Conflict {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact path: {0}")]
    InvalidPath(String),
}

pub trait ArtifactStore {
    /// `Ok(None)` means nothing is stored at `path` yet
    fn read(&self, path: &str) -> Result<Option<Artifact>, StorageError>;

    /// Store `content`, returning the new revision. `prior` must match the
    /// current revision, or be `None` when nothing is stored yet.
    fn write(
        &mut self,
        path: &str,
        content: &str,
        message: &str,
        prior: Option<&Revision>,
    ) -> Result<Revision, StorageError>;
}

fn describe(revision: Option<&Revision>) -> String {
    revision.map_or_else(|| "<none>".to_string(), |r| r.to_string())
}

fn check_prior(
    path: &str,
    current: Option<&Revision>,
    prior: Option<&Revision>,
) -> Result<(), StorageError> {
    if current == prior {
        Ok(())
    } else {
        Err(StorageError::Conflict {
            path: path.to_string(),
            expected: describe(prior),
            actual: describe(current),
        })
    }
}

/// One accepted write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    pub path: String,
    pub revision: Revision,
    pub message: String,
}

/// In-memory store, mostly for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    artifacts: BTreeMap<String, Artifact>,
    writes: Vec<WriteRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an artifact without recording a write
    pub fn with_artifact(mut self, path: &str, content: &str) -> Self {
        self.artifacts.insert(
            path.to_string(),
            Artifact {
                content: content.to_string(),
                revision: Revision::of(content),
            },
        );
        self
    }

    pub fn writes(&self) -> &[WriteRecord] {
        &self.writes
    }
}

impl ArtifactStore for MemoryStore {
    fn read(&self, path: &str) -> Result<Option<Artifact>, StorageError> {
        Ok(self.artifacts.get(path).cloned())
    }

    fn write(
        &mut self,
        path: &str,
        content: &str,
        message: &str,
        prior: Option<&Revision>,
    ) -> Result<Revision, StorageError> {
        let current = self.artifacts.get(path).map(|a| &a.revision);
        check_prior(path, current, prior)?;

        let revision = Revision::of(content);
        self.artifacts.insert(
            path.to_string(),
            Artifact {
                content: content.to_string(),
                revision: revision.clone(),
            },
        );
        self.writes.push(WriteRecord {
            path: path.to_string(),
            revision: revision.clone(),
            message: message.to_string(),
        });
        Ok(revision)
    }
}

/// Name of the append-only publish log kept in the store root
pub const PUBLISH_LOG: &str = ".wall-publish.jsonl";

/// Filesystem store rooted at a directory. Revisions are hashes of the bytes on
/// disk, so a file changed behind the store's back is detected as a conflict.
///
/// Artifacts are replaced by renaming a sibling temp file over them. The
/// publish log is best effort: once the artifact is in place the write counts
/// as done.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn append_log(&self, record: &WriteRecord) -> std::io::Result<()> {
        let event = serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "path": record.path,
            "revision": record.revision,
            "message": record.message,
        });
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(PUBLISH_LOG))?;
        writeln!(file, "{}", event)
    }
}

impl ArtifactStore for FsStore {
    fn read(&self, path: &str) -> Result<Option<Artifact>, StorageError> {
        let full = self.resolve(path)?;
        match fs::read(&full) {
            Ok(bytes) => Ok(Some(Artifact {
                revision: Revision::of_bytes(&bytes),
                content: String::from_utf8_lossy(&bytes).into_owned(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                path: path.to_string(),
                source,
            }),
        }
    }

    fn write(
        &mut self,
        path: &str,
        content: &str,
        message: &str,
        prior: Option<&Revision>,
    ) -> Result<Revision, StorageError> {
        let full = self.resolve(path)?;
        let current = self.read(path)?.map(|a| a.revision);
        check_prior(path, current.as_ref(), prior)?;

        let write_err = |source| StorageError::Write {
            path: path.to_string(),
            source,
        };
        let parent = full.parent().unwrap_or(self.root.as_path());
        fs::create_dir_all(parent).map_err(write_err)?;

        let mut staged = NamedTempFile::new_in(parent).map_err(write_err)?;
        staged.write_all(content.as_bytes()).map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged.persist(&full).map_err(|e| write_err(e.error))?;

        let record = WriteRecord {
            path: path.to_string(),
            revision: Revision::of(content),
            message: message.to_string(),
        };
        if let Err(e) = self.append_log(&record) {
            tracing::warn!(path, error = %e, "artifact written but publish log not updated");
        }
        Ok(record.revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_conflict_on_stale_revision() {
        let mut store = MemoryStore::new().with_artifact("wall.svg", "<old/>");
        let stale = Revision::of("<older/>");

        let err = store.write("wall.svg", "<new/>", "update", Some(&stale)).unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_memory_store_conflict_when_prior_missing() {
        let mut store = MemoryStore::new().with_artifact("wall.svg", "<old/>");
        assert!(store.write("wall.svg", "<new/>", "update", None).is_err());
    }

    #[test]
    fn test_memory_store_write_then_read() {
        let mut store = MemoryStore::new();
        let revision = store.write("wall.svg", "<svg/>", "create", None).unwrap();

        let artifact = store.read("wall.svg").unwrap().unwrap();
        assert_eq!(artifact.content, "<svg/>");
        assert_eq!(artifact.revision, revision);
        assert_eq!(store.writes()[0].message, "create");
    }

    #[test]
    fn test_fs_store_absent_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert_eq!(store.read("missing.svg").unwrap(), None);
    }

    #[test]
    fn test_fs_store_write_creates_dirs_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::new(dir.path());

        let first = store.write("assets/wall.svg", "<a/>", "create", None).unwrap();
        let second = store.write("assets/wall.svg", "<b/>", "update", Some(&first)).unwrap();

        assert_eq!(fs::read_to_string(dir.path().join("assets/wall.svg")).unwrap(), "<b/>");
        assert_eq!(second, Revision::of("<b/>"));

        let log = fs::read_to_string(dir.path().join(PUBLISH_LOG)).unwrap();
        let lines: Vec<serde_json::Value> = log
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["message"], "update");
        assert_eq!(lines[1]["revision"], second.as_str());
    }

    #[test]
    fn test_fs_store_detects_external_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::new(dir.path());
        let revision = store.write("wall.svg", "<a/>", "create", None).unwrap();

        fs::write(dir.path().join("wall.svg"), "<edited/>").unwrap();

        let err = store.write("wall.svg", "<b/>", "update", Some(&revision)).unwrap_err();
        assert!(err.to_string().contains("Conflicting write"));
    }

    #[test]
    fn test_fs_store_unwritable_log_keeps_write() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(PUBLISH_LOG)).unwrap();
        let mut store = FsStore::new(dir.path());

        let revision = store.write("wall.svg", "<new/>", "msg", None).unwrap();

        assert_eq!(revision, Revision::of("<new/>"));
        assert_eq!(fs::read_to_string(dir.path().join("wall.svg")).unwrap(), "<new/>");
    }

    #[test]
    fn test_fs_store_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsStore::new(dir.path());
        let first = store.write("wall.svg", "<a/>", "create", None).unwrap();
        store.write("wall.svg", "<b/>", "update", Some(&first)).unwrap();

        let mut names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec![PUBLISH_LOG.to_string(), "wall.svg".to_string()]);
    }

    #[test]
    fn test_fs_store_reads_invalid_utf8_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = [0xff, 0xfe, 0x00];
        fs::write(dir.path().join("wall.svg"), bytes).unwrap();
        let mut store = FsStore::new(dir.path());

        let artifact = store.read("wall.svg").unwrap().unwrap();
        assert_eq!(artifact.revision, Revision::of_bytes(&bytes));
        assert_eq!(artifact.content, "\u{fffd}\u{fffd}\u{0}");

        store.write("wall.svg", "<svg/>", "fix", Some(&artifact.revision)).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("wall.svg")).unwrap(), "<svg/>");
    }

    #[test]
    fn test_fs_store_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        assert!(matches!(store.read("../etc/passwd"), Err(StorageError::InvalidPath(_))));
        assert!(matches!(store.read("/etc/passwd"), Err(StorageError::InvalidPath(_))));
    }
}
