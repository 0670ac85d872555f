use anyhow::Result;
use async_trait::async_trait;
use defectlog_shared::DefectRecord;

use crate::db::{Database, ListOrder, StoredDefect};

/// Append-only defect log. Rows are never updated or deleted.
#[async_trait]
pub trait DefectStore: Send + Sync {
    async fn append(&self, record: &DefectRecord) -> Result<i64>;
    async fn count(&self) -> Result<u64>;
    async fn list(&self, order: ListOrder) -> Result<Vec<StoredDefect>>;
}

pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DefectStore for SqliteStore {
    async fn append(&self, record: &DefectRecord) -> Result<i64> {
        self.db.insert_defect(record).await
    }

    async fn count(&self) -> Result<u64> {
        self.db.count_defects().await
    }

    async fn list(&self, order: ListOrder) -> Result<Vec<StoredDefect>> {
        self.db.list_defects(order).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::db::tests::record;

    /// Store whose every call fails, for exercising error paths.
    pub(crate) struct BrokenStore;

    #[async_trait]
    impl DefectStore for BrokenStore {
        async fn append(&self, _record: &DefectRecord) -> Result<i64> {
            Err(anyhow!("disk I/O error"))
        }

        async fn count(&self) -> Result<u64> {
            Err(anyhow!("disk I/O error"))
        }

        async fn list(&self, _order: ListOrder) -> Result<Vec<StoredDefect>> {
            Err(anyhow!("disk I/O error"))
        }
    }

    #[tokio::test]
    async fn sqlite_store_appends_and_counts() {
        let store = SqliteStore::new(Database::open_in_memory().unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
        let id = store.append(&record("Mismatch", 4)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let rows = store.list(ListOrder::NewestFirst).await.unwrap();
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].record.scrap, "Mismatch");
    }
}
