use std::{
    convert::TryFrom,
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use defectlog_shared::DefectRecord;
use log::{error, info};
use rusqlite::{params, Connection, Row};
use tokio::sync::oneshot;

mod migrations;

use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListOrder {
    NewestFirst,
    Insertion,
}

impl ListOrder {
    fn sql(self) -> &'static str {
        match self {
            ListOrder::NewestFirst => "ORDER BY ID DESC",
            ListOrder::Insertion => "ORDER BY ID",
        }
    }
}

/// A persisted row: the record plus the columns SQLite fills in.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredDefect {
    pub id: i64,
    pub test_id: Option<i64>,
    pub record: DefectRecord,
    pub created_at: Option<String>,
}

const SELECT_COLUMNS: &str = "ID, TEST_ID, Entry_Date, Batch_Number, Date_Code, Product, Scrap, \
     Quantity, Signature, Notes, Casting_Clock, Pinhole_Level, Exact_Time, \
     Casting_Cavity_Number, Core_Cavity_Number, Core_Clock, Shift_Class, Location, Created_At";

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

// Rows written by older tools may carry NULLs; they read back as empty values.
fn text(row: &Row<'_>, index: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(index)?.unwrap_or_default())
}

fn integer(row: &Row<'_>, index: usize) -> rusqlite::Result<i64> {
    Ok(row.get::<_, Option<i64>>(index)?.unwrap_or_default())
}

fn stored_from_row(row: &Row<'_>) -> rusqlite::Result<StoredDefect> {
    Ok(StoredDefect {
        id: row.get(0)?,
        test_id: row.get(1)?,
        record: DefectRecord {
            entry_date: text(row, 2)?,
            batch_number: text(row, 3)?,
            date_code: text(row, 4)?,
            product: text(row, 5)?,
            scrap: text(row, 6)?,
            quantity: integer(row, 7)?,
            signature: text(row, 8)?,
            notes: text(row, 9)?,
            casting_clock: integer(row, 10)?,
            pinhole_level: integer(row, 11)?,
            exact_time: text(row, 12)?,
            casting_cavity_number: text(row, 13)?,
            core_cavity_number: text(row, 14)?,
            core_clock: text(row, 15)?,
            shift_class: integer(row, 16)?,
            location: text(row, 17)?,
        },
        created_at: row.get(18)?,
    })
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let path_for_thread = db_path.clone();
        let database = Self::spawn(db_path, move || {
            let conn = Connection::open(&path_for_thread)?;
            if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                error!("Failed to enable WAL mode: {err}");
            }
            Ok(conn)
        })?;

        info!("Database initialized at {}", database.path().display());
        Ok(database)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::spawn(PathBuf::from(":memory:"), Connection::open_in_memory)
    }

    fn spawn<F>(db_path: PathBuf, open: F) -> Result<Self>
    where
        F: FnOnce() -> rusqlite::Result<Connection> + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("defectlog-db".into())
            .spawn(move || {
                let mut conn = match open() {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_defect(&self, record: &DefectRecord) -> Result<i64> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO PA_InternalScrap
                 (Entry_Date, Batch_Number, Date_Code, Product, Scrap, Quantity, Signature, Notes,
                  Casting_Clock, Pinhole_Level, Exact_Time, Casting_Cavity_Number,
                  Core_Cavity_Number, Core_Clock, Shift_Class, Location)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    record.entry_date,
                    record.batch_number,
                    record.date_code,
                    record.product,
                    record.scrap,
                    record.quantity,
                    record.signature,
                    record.notes,
                    record.casting_clock,
                    record.pinhole_level,
                    record.exact_time,
                    record.casting_cavity_number,
                    record.core_cavity_number,
                    record.core_clock,
                    record.shift_class,
                    record.location,
                ],
            )
            .with_context(|| "failed to insert defect record")?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn count_defects(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM PA_InternalScrap", [], |row| row.get(0))
                .with_context(|| "failed to count defect records")?;
            to_u64(count)
        })
        .await
    }

    pub async fn list_defects(&self, order: ListOrder) -> Result<Vec<StoredDefect>> {
        self.execute(move |conn| {
            let sql = format!("SELECT {SELECT_COLUMNS} FROM PA_InternalScrap {}", order.sql());
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], stored_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .with_context(|| "failed to read defect records")?;
            Ok(rows)
        })
        .await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use defectlog_shared::{ClickResult, SessionContext};

    use super::*;

    pub(crate) fn record(defect: &str, segment: u32) -> DefectRecord {
        let click = ClickResult {
            defect: defect.into(),
            segment,
            distance: 118,
            timestamp: "2026-10-14T08:30:00.000Z".into(),
            cavity: "3".into(),
            ring: "Inner".into(),
            angle: 172,
            option: "Inboard".into(),
        };
        let session = SessionContext {
            inspection_date: "2026-10-14".into(),
            part_number: "19.N222.03".into(),
            batch_number: "B-0042".into(),
            date_code: "D41".into(),
            notes: String::new(),
        };
        DefectRecord::from_click(&click, &session).unwrap()
    }

    #[tokio::test]
    async fn inserted_rows_read_back_with_ids() {
        let db = Database::open_in_memory().unwrap();
        let first = db.insert_defect(&record("Cracks", 6)).await.unwrap();
        let second = db.insert_defect(&record("Burns", 7)).await.unwrap();
        assert!(second > first);
        assert_eq!(db.count_defects().await.unwrap(), 2);

        let rows = db.list_defects(ListOrder::Insertion).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, first);
        assert_eq!(rows[0].record, record("Cracks", 6));
        assert_eq!(rows[0].test_id, None);
        assert!(rows[0].created_at.is_some());
    }

    #[tokio::test]
    async fn newest_first_reverses_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        for segment in 1..=3 {
            db.insert_defect(&record("Stains", segment)).await.unwrap();
        }
        let clocks: Vec<i64> = db
            .list_defects(ListOrder::NewestFirst)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.record.casting_clock)
            .collect();
        assert_eq!(clocks, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn null_columns_read_as_empty_values() {
        let db = Database::open_in_memory().unwrap();
        db.execute(|conn| {
            conn.execute("INSERT INTO PA_InternalScrap (Scrap) VALUES ('Damage')", [])?;
            Ok(())
        })
        .await
        .unwrap();
        let rows = db.list_defects(ListOrder::Insertion).await.unwrap();
        assert_eq!(rows[0].record.scrap, "Damage");
        assert_eq!(rows[0].record.notes, "");
        assert_eq!(rows[0].record.casting_clock, 0);
    }

    #[tokio::test]
    async fn file_database_persists_between_opens() {
        let dir = std::env::temp_dir().join(format!("defectlog-{}", uuid::Uuid::new_v4()));
        let path = dir.join("defect_logs.db");
        {
            let db = Database::new(path.clone()).unwrap();
            db.insert_defect(&record("Crush", 2)).await.unwrap();
        }
        let db = Database::new(path).unwrap();
        assert_eq!(db.count_defects().await.unwrap(), 1);
        drop(db);
        let _ = std::fs::remove_dir_all(dir);
    }
}
