use std::path::{Path, PathBuf};

use disk_bench_model::{ResultRecord, RunSummary, TrialSpec, TrialStatus};
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection, Row};

use crate::error::StoreError;
use crate::sink::{HistoryFilter, HistoryStore, QueryResult, ResultSink, StoredResult, StoredRun};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS benchmarks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
        mode TEXT,
        filesize TEXT,
        runtime INTEGER,
        test_type TEXT,
        block_size TEXT,
        read_iops REAL,
        write_iops REAL,
        read_bw REAL,
        write_bw REAL,
        read_latency_us REAL,
        write_latency_us REAL,
        cpu TEXT,
        status TEXT,
        io_time_sec REAL,
        wall_time_sec REAL,
        metadata TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_timestamp ON benchmarks(timestamp);
    CREATE INDEX IF NOT EXISTS idx_test_type ON benchmarks(test_type);
";

/// Columns added after the first release. Adding a column that already exists fails, which is
/// expected for databases that are already up to date.
const MIGRATIONS: [&str; 4] = [
    "ALTER TABLE benchmarks ADD COLUMN io_time_sec REAL DEFAULT 0",
    "ALTER TABLE benchmarks ADD COLUMN wall_time_sec REAL DEFAULT 0",
    "ALTER TABLE benchmarks ADD COLUMN run_id TEXT",
    // Only succeeds for databases that still have the old column name.
    "UPDATE benchmarks SET io_time_sec = runtime_sec WHERE io_time_sec IS NULL OR io_time_sec = 0",
];

const SELECT_RESULTS: &str = "
    SELECT id, timestamp, run_id, mode, filesize, runtime, test_type, block_size,
           read_iops, write_iops, read_bw, write_bw, read_latency_us, write_latency_us,
           cpu, status, io_time_sec, wall_time_sec
    FROM benchmarks";

/// Stores every trial of every run as one row of the `benchmarks` table.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database, bringing older schemas up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::io(parent))?;
        }

        let conn = Connection::open(path)?;
        Self::initialize(&conn)?;

        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory database, mostly useful for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn initialize(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(SCHEMA)?;
        for migration in MIGRATIONS {
            if let Err(e) = conn.execute(migration, []) {
                log::trace!("Skipped migration '{migration}': {e}");
            }
        }
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_run_id ON benchmarks(run_id)",
            [],
        )?;
        Ok(())
    }

    fn select(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredResult>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, RawRow::read)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawRow::into_stored).collect()
    }
}

/// Format a unix timestamp the way SQLite's `CURRENT_TIMESTAMP` does.
fn sqlite_timestamp(unix_secs: i64) -> String {
    chrono::DateTime::from_timestamp(unix_secs, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

impl ResultSink for SqliteStore {
    fn save(&self, run: &RunSummary, records: &[ResultRecord]) -> Result<(), StoreError> {
        let timestamp = sqlite_timestamp(run.started_at);
        let config = &run.config;

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO benchmarks (
                    timestamp, run_id, mode, filesize, runtime, test_type, block_size,
                    read_iops, write_iops, read_bw, write_bw,
                    read_latency_us, write_latency_us, cpu, status,
                    io_time_sec, wall_time_sec, metadata
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            )?;
            for record in records {
                stmt.execute(params![
                    timestamp,
                    run.run_id,
                    config.mode.as_str(),
                    config.file_size,
                    config.runtime_seconds as i64,
                    record.workload_type.as_str(),
                    record.block_size.as_str(),
                    record.read_iops,
                    record.write_iops,
                    record.read_bw as f64,
                    record.write_bw as f64,
                    record.read_latency_us,
                    record.write_latency_us,
                    record.cpu,
                    record.status.to_string(),
                    record.io_time_sec,
                    record.wall_time_sec,
                    serde_json::to_string(record)?,
                ])?;
            }
        }
        tx.commit()?;

        log::debug!(
            "Saved {} results for run {} to {}",
            records.len(),
            run.run_id,
            self.path.display()
        );
        Ok(())
    }
}

impl HistoryStore for SqliteStore {
    fn history(&self, limit: usize) -> Result<Vec<StoredResult>, StoreError> {
        self.select(
            &format!("{SELECT_RESULTS} ORDER BY timestamp DESC, id DESC LIMIT ?1"),
            params![limit as i64],
        )
    }

    fn query(&self, filter: &HistoryFilter) -> Result<Vec<StoredResult>, StoreError> {
        let mut sql = format!("{SELECT_RESULTS} WHERE 1=1");
        let mut values: Vec<String> = Vec::new();

        if let Some(after) = &filter.after {
            sql.push_str(" AND timestamp >= ?");
            values.push(after.clone());
        }
        if let Some(before) = &filter.before {
            sql.push_str(" AND timestamp <= ?");
            values.push(before.clone());
        }
        if !filter.workload_types.is_empty() {
            sql.push_str(&format!(
                " AND test_type IN ({})",
                placeholders(filter.workload_types.len())
            ));
            values.extend(filter.workload_types.iter().map(|w| w.to_string()));
        }
        if !filter.block_sizes.is_empty() {
            sql.push_str(&format!(
                " AND block_size IN ({})",
                placeholders(filter.block_sizes.len())
            ));
            values.extend(filter.block_sizes.iter().map(|b| b.to_string()));
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        self.select(&sql, params_from_iter(values))
    }

    fn custom_query(&self, sql: &str) -> Result<QueryResult, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let columns = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(json_value))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QueryResult { columns, rows })
    }

    fn runs(&self, limit: usize) -> Result<Vec<StoredRun>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT run_id, MIN(timestamp), mode, filesize, runtime, COUNT(*),
                    SUM(CASE WHEN status = 'OK' THEN 0 ELSE 1 END)
             FROM benchmarks
             WHERE run_id IS NOT NULL
             GROUP BY run_id
             ORDER BY MIN(timestamp) DESC, MAX(id) DESC
             LIMIT ?1",
        )?;

        let runs = stmt
            .query_map(params![limit as i64], |row| {
                Ok(StoredRun {
                    run_id: row.get(0)?,
                    timestamp: row.get(1)?,
                    mode: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    file_size: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    runtime_seconds: row.get::<_, Option<i64>>(4)?.unwrap_or_default(),
                    trial_count: row.get::<_, i64>(5)? as usize,
                    failed_count: row.get::<_, i64>(6)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    fn run_records(&self, run_id: &str) -> Result<Vec<StoredResult>, StoreError> {
        let results = self.select(
            &format!("{SELECT_RESULTS} WHERE run_id = ?1 ORDER BY id ASC"),
            params![run_id],
        )?;
        if results.is_empty() {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        Ok(results)
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned().into(),
        ValueRef::Blob(blob) => format!("<{} bytes>", blob.len()).into(),
    }
}

/// A row as stored, before the text columns are parsed.
struct RawRow {
    id: i64,
    timestamp: Option<String>,
    run_id: Option<String>,
    mode: Option<String>,
    file_size: Option<String>,
    runtime_seconds: Option<i64>,
    workload_type: Option<String>,
    block_size: Option<String>,
    read_iops: Option<f64>,
    write_iops: Option<f64>,
    read_bw: Option<f64>,
    write_bw: Option<f64>,
    read_latency_us: Option<f64>,
    write_latency_us: Option<f64>,
    cpu: Option<String>,
    status: Option<String>,
    io_time_sec: Option<f64>,
    wall_time_sec: Option<f64>,
}

impl RawRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            timestamp: row.get("timestamp")?,
            run_id: row.get("run_id")?,
            mode: row.get("mode")?,
            file_size: row.get("filesize")?,
            runtime_seconds: row.get("runtime")?,
            workload_type: row.get("test_type")?,
            block_size: row.get("block_size")?,
            read_iops: row.get("read_iops")?,
            write_iops: row.get("write_iops")?,
            read_bw: row.get("read_bw")?,
            write_bw: row.get("write_bw")?,
            read_latency_us: row.get("read_latency_us")?,
            write_latency_us: row.get("write_latency_us")?,
            cpu: row.get("cpu")?,
            status: row.get("status")?,
            io_time_sec: row.get("io_time_sec")?,
            wall_time_sec: row.get("wall_time_sec")?,
        })
    }

    fn into_stored(self) -> Result<StoredResult, StoreError> {
        let id = self.id;
        let invalid = |reason: String| StoreError::InvalidRow { id, reason };

        let workload_type = self
            .workload_type
            .unwrap_or_default()
            .parse()
            .map_err(|e| invalid(format!("{e}")))?;
        let block_size = self
            .block_size
            .unwrap_or_default()
            .parse()
            .map_err(|e| invalid(format!("{e}")))?;
        let status = self
            .status
            .map(|s| s.parse::<TrialStatus>().unwrap_or_else(|never| match never {}))
            .unwrap_or_else(|| TrialStatus::Failed(String::new()));

        let mut record = ResultRecord::zeroed(
            TrialSpec::new(workload_type, block_size),
            status,
        );
        record.read_iops = self.read_iops.unwrap_or_default();
        record.write_iops = self.write_iops.unwrap_or_default();
        record.read_bw = self.read_bw.unwrap_or_default().max(0.0) as u64;
        record.write_bw = self.write_bw.unwrap_or_default().max(0.0) as u64;
        record.read_latency_us = self.read_latency_us.unwrap_or_default();
        record.write_latency_us = self.write_latency_us.unwrap_or_default();
        if let Some(cpu) = self.cpu.filter(|c| !c.is_empty()) {
            record.cpu = cpu;
        }
        record.io_time_sec = self.io_time_sec.unwrap_or_default();
        record.wall_time_sec = self.wall_time_sec.unwrap_or_default();

        Ok(StoredResult {
            id,
            timestamp: self.timestamp.unwrap_or_default(),
            run_id: self.run_id,
            mode: self.mode.unwrap_or_default(),
            file_size: self.file_size.unwrap_or_default(),
            runtime_seconds: self.runtime_seconds.unwrap_or_default(),
            record,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disk_bench_model::{BenchmarkConfig, BlockSize, Mode, WorkloadType};
    use pretty_assertions::assert_eq;

    fn run(run_id: &str, started_at: i64) -> RunSummary {
        RunSummary::new(
            run_id.to_string(),
            started_at,
            BenchmarkConfig {
                mode: Mode::Test,
                runtime_seconds: 15,
                file_size: "1G".to_string(),
                ..Default::default()
            },
            2,
            None,
            "0.3.0".to_string(),
        )
    }

    fn records(read_iops: f64) -> Vec<ResultRecord> {
        let mut ok = ResultRecord::zeroed(
            TrialSpec::new(WorkloadType::Randread, BlockSize::K4),
            TrialStatus::Ok,
        );
        ok.read_iops = read_iops;
        ok.read_bw = 41943040;
        ok.cpu = "usr=5.5%, sys=2.3%".to_string();
        ok.io_time_sec = 15.0;
        ok.wall_time_sec = 15.5;

        vec![
            ok,
            ResultRecord::timed_out(TrialSpec::new(WorkloadType::Read, BlockSize::M1)),
        ]
    }

    #[test]
    fn history_is_newest_first() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(&run("first", 1_700_000_000), &records(100.0)).unwrap();
        store.save(&run("second", 1_700_000_100), &records(200.0)).unwrap();

        let history = store.history(3).unwrap();

        assert_eq!(history.len(), 3);
        assert_eq!(history[0].run_id.as_deref(), Some("second"));
        assert_eq!(history[0].record.workload_type, WorkloadType::Read);
        assert_eq!(history[1].record.read_iops, 200.0);
        assert_eq!(history[2].run_id.as_deref(), Some("first"));
        assert_eq!(history[0].timestamp, "2023-11-14 22:15:00");
    }

    #[test]
    fn records_survive_the_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let saved = records(100.0);
        store.save(&run("only", 1_700_000_000), &saved).unwrap();

        let loaded = store
            .run_records("only")
            .unwrap()
            .into_iter()
            .map(|r| r.record)
            .collect::<Vec<_>>();

        assert_eq!(loaded, saved);
    }

    #[test]
    fn query_filters_by_workload_and_block_size() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(&run("first", 1_700_000_000), &records(100.0)).unwrap();

        let filter = HistoryFilter {
            workload_types: vec![WorkloadType::Read, WorkloadType::Write],
            ..Default::default()
        };
        let results = store.query(&filter).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.status, TrialStatus::TimedOut);

        let filter = HistoryFilter {
            block_sizes: vec![BlockSize::K64],
            ..Default::default()
        };
        assert!(store.query(&filter).unwrap().is_empty());

        let filter = HistoryFilter {
            after: Some("2023-11-15 00:00:00".to_string()),
            ..Default::default()
        };
        assert!(store.query(&filter).unwrap().is_empty());
    }

    #[test]
    fn runs_are_summarized() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(&run("first", 1_700_000_000), &records(100.0)).unwrap();
        store.save(&run("second", 1_700_000_100), &records(200.0)).unwrap();

        let runs = store.runs(10).unwrap();

        assert_eq!(
            runs.iter().map(|r| r.run_id.as_str()).collect::<Vec<_>>(),
            vec!["second", "first"]
        );
        assert_eq!(runs[0].trial_count, 2);
        assert_eq!(runs[0].failed_count, 1);
        assert_eq!(runs[0].mode, "test");
        assert_eq!(runs[0].file_size, "1G");
        assert_eq!(runs[0].runtime_seconds, 15);
    }

    #[test]
    fn unknown_run_is_an_error() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.run_records("missing"),
            Err(StoreError::RunNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn custom_query_returns_columns_and_values() {
        let store = SqliteStore::in_memory().unwrap();
        store.save(&run("first", 1_700_000_000), &records(100.0)).unwrap();

        let result = store
            .custom_query(
                "SELECT test_type, block_size, read_iops, runtime FROM benchmarks ORDER BY id",
            )
            .unwrap();

        assert_eq!(
            result.columns,
            vec!["test_type", "block_size", "read_iops", "runtime"]
        );
        assert_eq!(
            result.rows[0],
            vec![
                serde_json::json!("randread"),
                serde_json::json!("4k"),
                serde_json::json!(100.0),
                serde_json::json!(15)
            ]
        );
        assert!(store.custom_query("SELECT * FROM nowhere").is_err());
    }

    #[test]
    fn migrates_databases_from_older_releases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("benchmark_history.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE benchmarks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                    mode TEXT, filesize TEXT, runtime INTEGER,
                    test_type TEXT, block_size TEXT,
                    read_iops REAL, write_iops REAL, read_bw REAL, write_bw REAL,
                    read_latency_us REAL, write_latency_us REAL,
                    cpu TEXT, status TEXT, runtime_sec REAL, metadata TEXT
                );
                INSERT INTO benchmarks (mode, filesize, runtime, test_type, block_size,
                    read_iops, write_iops, read_bw, write_bw, read_latency_us, write_latency_us,
                    cpu, status, runtime_sec, metadata)
                VALUES ('lean', '10G', 300, 'write', '64k', 0, 55.5, 0, 3637248, 0, 17.9,
                    'usr=1.0%, sys=2.0%', 'OK', 300.1, '{}');",
            )
            .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let history = store.history(10).unwrap();

        assert_eq!(history.len(), 1);
        let old = &history[0];
        assert_eq!(old.run_id, None);
        assert_eq!(old.record.io_time_sec, 300.1);
        assert_eq!(old.record.wall_time_sec, 0.0);
        assert_eq!(old.record.write_bw, 3637248);
        assert!(store.runs(10).unwrap().is_empty());

        // A second open must not fail on the migrations that already ran.
        drop(store);
        SqliteStore::open(&path).unwrap();
    }
}
