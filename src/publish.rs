//! Publish Gate - Write Only on Change

use serde::{Deserialize, Serialize};

use crate::storage::{ArtifactStore, Revision, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "revision")]
pub enum PublishOutcome {
    /// Stored content already matches; nothing was written
    Skipped,
    Written(Revision),
}

impl PublishOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written(_))
    }
}

/// Write `content` to `path` unless the stored artifact is byte-identical.
///
/// The prior revision, when there is one, is passed along so the store can
/// reject a concurrent update. Conflicts are returned, not retried.
pub fn publish_if_changed(
    store: &mut dyn ArtifactStore,
    path: &str,
    content: &str,
    message: &str,
) -> Result<PublishOutcome, StorageError> {
    let prior = store.read(path)?;

    if let Some(artifact) = &prior {
        if artifact.content == content {
            tracing::debug!(path, revision = %artifact.revision, "content unchanged");
            return Ok(PublishOutcome::Skipped);
        }
    }

    let prior_revision = prior.as_ref().map(|a| &a.revision);
    let revision = store.write(path, content, message, prior_revision)?;
    Ok(PublishOutcome::Written(revision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Artifact, MemoryStore};

    /// Store that records calls and can be told to fail
    #[derive(Default)]
    struct ScriptedStore {
        prior: Option<Artifact>,
        fail_write: bool,
        writes: Vec<Option<Revision>>,
    }

    impl ArtifactStore for ScriptedStore {
        fn read(&self, _path: &str) -> Result<Option<Artifact>, StorageError> {
            Ok(self.prior.clone())
        }

        fn write(
            &mut self,
            path: &str,
            content: &str,
            _message: &str,
            prior: Option<&Revision>,
        ) -> Result<Revision, StorageError> {
            self.writes.push(prior.cloned());
            if self.fail_write {
                return Err(StorageError::Conflict {
                    path: path.to_string(),
                    expected: "x".to_string(),
                    actual: "y".to_string(),
                });
            }
            Ok(Revision::of(content))
        }
    }

    #[test]
    fn test_equal_content_skips_write() {
        let mut store = ScriptedStore {
            prior: Some(Artifact {
                content: "<svg/>".to_string(),
                revision: Revision("r1".to_string()),
            }),
            ..Default::default()
        };

        let outcome = publish_if_changed(&mut store, "wall.svg", "<svg/>", "msg").unwrap();
        assert_eq!(outcome, PublishOutcome::Skipped);
        assert!(store.writes.is_empty());
    }

    #[test]
    fn test_absent_prior_writes_without_revision() {
        let mut store = ScriptedStore::default();

        let outcome = publish_if_changed(&mut store, "wall.svg", "<svg/>", "msg").unwrap();
        assert_eq!(outcome, PublishOutcome::Written(Revision::of("<svg/>")));
        assert_eq!(store.writes, vec![None]);
    }

    #[test]
    fn test_changed_content_passes_prior_revision() {
        let mut store = ScriptedStore {
            prior: Some(Artifact {
                content: "<old/>".to_string(),
                revision: Revision("r1".to_string()),
            }),
            ..Default::default()
        };

        let outcome = publish_if_changed(&mut store, "wall.svg", "<new/>", "msg").unwrap();
        assert!(outcome.is_written());
        assert_eq!(store.writes, vec![Some(Revision("r1".to_string()))]);
    }

    #[test]
    fn test_conflict_is_surfaced_once() {
        let mut store = ScriptedStore {
            fail_write: true,
            ..Default::default()
        };

        let err = publish_if_changed(&mut store, "wall.svg", "<svg/>", "msg").unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
        assert_eq!(store.writes.len(), 1);
    }

    #[test]
    fn test_second_publish_is_a_no_op() {
        let mut store = MemoryStore::new();

        let first = publish_if_changed(&mut store, "wall.svg", "<svg/>", "msg").unwrap();
        let second = publish_if_changed(&mut store, "wall.svg", "<svg/>", "msg").unwrap();

        assert!(first.is_written());
        assert_eq!(second, PublishOutcome::Skipped);
        assert_eq!(store.writes().len(), 1);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&PublishOutcome::Written(Revision("abc".to_string()))).unwrap();
        assert_eq!(json, r#"{"status":"written","revision":"abc"}"#);
        let json = serde_json::to_string(&PublishOutcome::Skipped).unwrap();
        assert_eq!(json, r#"{"status":"skipped"}"#);
    }
}
