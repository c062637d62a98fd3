//! Captured ProductBoard sessions, newest last in key order.

use crate::SimpleStorage;
use crate::define_simple_storage;
use crate::simple_storage::time_key;
use anyhow::Result;
use pblink_models::{AuthBundle, CapturedSession, CapturedSessionSummary};
use tracing::debug;

define_simple_storage! {
    /// Auth bundles keyed by capture time.
    pub struct AuthSessionStorage { table: "auth_sessions" }
}

impl AuthSessionStorage {
    pub fn save(&self, bundle: AuthBundle, source: impl Into<String>) -> Result<CapturedSession> {
        let session = CapturedSession::new(bundle, source);
        let key = time_key(session.captured_at_ms, &session.id);
        self.put_raw(&key, &serde_json::to_vec(&session)?)?;
        debug!(
            id = %session.id,
            cookies = session.bundle.cookies.len(),
            "Stored captured session"
        );
        Ok(session)
    }

    /// Most recently captured session.
    pub fn latest(&self) -> Result<Option<CapturedSession>> {
        self.last_raw()?
            .map(|(_, data)| serde_json::from_slice(&data).map_err(anyhow::Error::from))
            .transpose()
    }

    /// Metadata of every stored session, newest first.
    pub fn list(&self) -> Result<Vec<CapturedSessionSummary>> {
        self.list_recent_raw(usize::MAX)?
            .into_iter()
            .map(|(_, data)| {
                let session: CapturedSession = serde_json::from_slice(&data)?;
                Ok(session.summary())
            })
            .collect()
    }

    /// Keep only the `keep` newest sessions.
    pub fn prune(&self, keep: usize) -> Result<usize> {
        let removed = self.retain_recent(keep)?;
        if removed > 0 {
            debug!(removed, keep, "Pruned captured sessions");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pblink_models::CookieRecord;
    use redb::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn bundle(value: &str) -> AuthBundle {
        AuthBundle {
            cookies: vec![CookieRecord::new("pb_session", value, ".productboard.com")],
            ..AuthBundle::default()
        }
    }

    #[test]
    fn latest_returns_the_newest_capture() {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let storage = AuthSessionStorage::new(db).unwrap();

        assert!(storage.latest().unwrap().is_none());

        storage.save(bundle("old"), "import").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let newest = storage.save(bundle("new"), "capture").unwrap();

        let latest = storage.latest().unwrap().unwrap();
        assert_eq!(latest.id, newest.id);
        assert_eq!(latest.bundle.cookies[0].value, "new");
        assert_eq!(latest.source, "capture");
    }

    #[test]
    fn list_exposes_counts_only_and_prune_keeps_newest() {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let storage = AuthSessionStorage::new(db).unwrap();

        for value in ["a", "b", "c"] {
            storage.save(bundle(value), "import").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(5));
        }

        let summaries = storage.list().unwrap();
        assert_eq!(summaries.len(), 3);
        assert!(summaries[0].captured_at_ms >= summaries[2].captured_at_ms);
        assert_eq!(summaries[0].cookie_count, 1);

        assert_eq!(storage.prune(1).unwrap(), 2);
        assert_eq!(storage.count().unwrap(), 1);
        assert_eq!(
            storage.latest().unwrap().unwrap().bundle.cookies[0].value,
            "c"
        );
    }
}
