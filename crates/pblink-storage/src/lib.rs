//! Persistence for the story linker, backed by an embedded redb database.
//!
//! # Tables
//!
//! - `auth_sessions` - captured ProductBoard sessions
//! - `link_runs` - finished link runs with their outcomes
//!
//! Keys are `<zero-padded millis>:<uuid>` so that key order is time order.

pub mod auth_session;
pub mod link_history;
pub mod paths;
mod simple_storage;

use anyhow::Result;
use redb::Database;
use std::path::Path;
use std::sync::Arc;

pub use auth_session::AuthSessionStorage;
pub use link_history::{DEFAULT_KEEP_RUNS, LinkHistoryStorage};
pub use simple_storage::SimpleStorage;

#[derive(Clone)]
pub struct Storage {
    pub auth_sessions: AuthSessionStorage,
    pub link_runs: LinkHistoryStorage,
}

impl Storage {
    /// Open or create the database at `path` and make sure all tables exist.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let db = Arc::new(Database::create(path.as_ref())?);

        let auth_sessions = AuthSessionStorage::new(db.clone())?;
        let link_runs = LinkHistoryStorage::new(db)?;

        Ok(Self {
            auth_sessions,
            link_runs,
        })
    }
}
