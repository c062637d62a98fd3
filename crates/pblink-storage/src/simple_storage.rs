use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::sync::Arc;

/// Byte-level key-value table with ordered keys.
///
/// Implementors only supply the table definition and the database handle.
/// Keys are expected to sort chronologically so that `last_raw` and
/// `list_recent_raw` return the newest entries.
pub trait SimpleStorage: Send + Sync {
    const TABLE: TableDefinition<'static, &'static str, &'static [u8]>;

    fn db(&self) -> &Arc<Database>;

    fn put_raw(&self, key: &str, data: &[u8]) -> Result<()> {
        let write_txn = self.db().begin_write()?;
        {
            let mut table = write_txn.open_table(Self::TABLE)?;
            table.insert(key, data)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;

        if let Some(value) = table.get(key)? {
            Ok(Some(value.value().to_vec()))
        } else {
            Ok(None)
        }
    }

    /// Entry with the greatest key.
    fn last_raw(&self) -> Result<Option<(String, Vec<u8>)>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;

        Ok(table
            .last()?
            .map(|(key, value)| (key.value().to_string(), value.value().to_vec())))
    }

    /// Up to `limit` entries, greatest key first.
    fn list_recent_raw(&self, limit: usize) -> Result<Vec<(String, Vec<u8>)>> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;

        let mut items = Vec::new();
        for item in table.iter()?.rev().take(limit) {
            let (key, value) = item?;
            items.push((key.value().to_string(), value.value().to_vec()));
        }

        Ok(items)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let write_txn = self.db().begin_write()?;
        let existed = {
            let mut table = write_txn.open_table(Self::TABLE)?;
            table.remove(key)?.is_some()
        };
        write_txn.commit()?;
        Ok(existed)
    }

    /// Remove all but the `keep` greatest keys. Returns how many were removed.
    fn retain_recent(&self, keep: usize) -> Result<usize> {
        let write_txn = self.db().begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(Self::TABLE)?;
            let stale: Vec<String> = table
                .iter()?
                .rev()
                .skip(keep)
                .map(|item| item.map(|(key, _)| key.value().to_string()))
                .collect::<Result<_, _>>()?;
            for key in &stale {
                table.remove(key.as_str())?;
            }
            stale.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn count(&self) -> Result<usize> {
        let read_txn = self.db().begin_read()?;
        let table = read_txn.open_table(Self::TABLE)?;
        Ok(table.len()? as usize)
    }
}

/// Generate a storage struct bound to one table.
#[macro_export]
macro_rules! define_simple_storage {
    ( $(#[$meta:meta])* $vis:vis struct $name:ident { table: $table_name:literal } ) => {
        const TABLE: redb::TableDefinition<'static, &'static str, &'static [u8]> =
            redb::TableDefinition::new($table_name);

        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            db: std::sync::Arc<redb::Database>,
        }

        impl $name {
            pub fn new(db: std::sync::Arc<redb::Database>) -> anyhow::Result<Self> {
                let write_txn = db.begin_write()?;
                write_txn.open_table(TABLE)?;
                write_txn.commit()?;

                Ok(Self { db })
            }

            pub fn count(&self) -> anyhow::Result<usize> {
                <Self as $crate::SimpleStorage>::count(self)
            }
        }

        impl $crate::SimpleStorage for $name {
            const TABLE: redb::TableDefinition<'static, &'static str, &'static [u8]> = TABLE;

            fn db(&self) -> &std::sync::Arc<redb::Database> {
                &self.db
            }
        }
    };
}

/// Chronologically sortable key: zero-padded milliseconds, then the id.
pub fn time_key(timestamp_ms: i64, id: &str) -> String {
    format!("{:020}:{}", timestamp_ms.max(0), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    define_simple_storage! {
        struct TestStorage { table: "test_entries" }
    }

    fn store() -> (TestStorage, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::create(temp_dir.path().join("test.db")).unwrap());
        (TestStorage::new(db).unwrap(), temp_dir)
    }

    #[test]
    fn time_keys_sort_numerically() {
        assert!(time_key(999, "b") < time_key(1000, "a"));
        assert_eq!(time_key(-5, "x"), time_key(0, "x"));
    }

    #[test]
    fn recent_entries_come_newest_first() {
        let (storage, _dir) = store();
        for (ms, id) in [(30, "c"), (10, "a"), (20, "b")] {
            storage.put_raw(&time_key(ms, id), id.as_bytes()).unwrap();
        }

        let recent = storage.list_recent_raw(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].1, b"c");
        assert_eq!(recent[1].1, b"b");
        assert_eq!(storage.last_raw().unwrap().unwrap().1, b"c");
    }

    #[test]
    fn retain_recent_drops_the_oldest() {
        let (storage, _dir) = store();
        for ms in 1..=5 {
            storage.put_raw(&time_key(ms, "x"), b"v").unwrap();
        }

        assert_eq!(storage.retain_recent(2).unwrap(), 3);
        assert_eq!(storage.count().unwrap(), 2);
        assert!(storage.get_raw(&time_key(5, "x")).unwrap().is_some());
        assert!(storage.get_raw(&time_key(1, "x")).unwrap().is_none());
        assert!(storage.delete(&time_key(4, "x")).unwrap());
    }
}
