//! History of finished link runs. Requests and outcomes only, never auth data.

use crate::SimpleStorage;
use crate::define_simple_storage;
use crate::simple_storage::time_key;
use anyhow::Result;
use chrono::Utc;
use tracing::debug;
use pblink_models::{LinkRequest, LinkRunRecord, WorkflowOutcome};
use uuid::Uuid;

/// Runs kept when no other retention is configured.
pub const DEFAULT_KEEP_RUNS: usize = 500;

define_simple_storage! {
    pub struct LinkHistoryStorage { table: "link_runs" }
}

impl LinkHistoryStorage {
    pub fn record(
        &self,
        request: &LinkRequest,
        outcome: &WorkflowOutcome,
        started_at_ms: i64,
    ) -> Result<LinkRunRecord> {
        let record = LinkRunRecord {
            id: Uuid::new_v4().to_string(),
            started_at_ms,
            finished_at_ms: Utc::now().timestamp_millis(),
            request: request.clone(),
            outcome: outcome.clone(),
        };
        let key = time_key(record.started_at_ms, &record.id);
        self.put_raw(&key, &serde_json::to_vec(&record)?)?;
        Ok(record)
    }

    /// Up to `limit` runs, newest first.
    pub fn list(&self, limit: usize) -> Result<Vec<LinkRunRecord>> {
        self.list_recent_raw(limit)?
            .into_iter()
            .map(|(_, data)| Ok(serde_json::from_slice(&data)?))
            .collect()
    }

    /// Keep only the `keep` newest runs.
    pub fn prune(&self, keep: usize) -> Result<usize> {
        let removed = self.retain_recent(keep)?;
        if removed > 0 {
            debug!(removed, keep, "Pruned link history");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redb::Database;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn runs_are_listed_newest_first() {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let storage = LinkHistoryStorage::new(db).unwrap();
        let request = LinkRequest::new("https://acme.productboard.com/detail/1", "Platform", "1");

        storage
            .record(&request, &WorkflowOutcome::succeeded("linked"), 1_000)
            .unwrap();
        storage
            .record(
                &request,
                &WorkflowOutcome::failed("Push Button", "all 3 strategies failed"),
                2_000,
            )
            .unwrap();

        let runs = storage.list(10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].started_at_ms, 2_000);
        assert_eq!(runs[0].outcome.failed_step.as_deref(), Some("Push Button"));
        assert!(runs[1].outcome.success);

        assert_eq!(storage.list(1).unwrap().len(), 1);
    }

    #[test]
    fn prune_keeps_the_newest_runs() {
        let temp_dir = tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        let storage = LinkHistoryStorage::new(db).unwrap();
        let request = LinkRequest::new("https://acme.productboard.com/detail/1", "Platform", "1");

        for started_at_ms in [1_000, 2_000, 3_000] {
            storage
                .record(&request, &WorkflowOutcome::succeeded("linked"), started_at_ms)
                .unwrap();
        }

        assert_eq!(storage.prune(2).unwrap(), 1);
        let runs = storage.list(10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].started_at_ms, 2_000);
        assert_eq!(storage.prune(5).unwrap(), 0);
    }
}
