use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::util::env::{env_flag, env_parse, warehouse_path};

pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub path: PathBuf,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout: Duration,
    /// Trade durability for load speed (`synchronous=OFF`, in-memory temp store).
    pub fast_ingest: bool,
}

impl WarehouseConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            fast_ingest: false,
        }
    }

    /// WAREHOUSE_DB / DATABASE_URL, WAREHOUSE_BUSY_TIMEOUT_MS, FAST_INGEST.
    pub fn from_env() -> Self {
        Self {
            path: warehouse_path(),
            busy_timeout: Duration::from_millis(env_parse(
                "WAREHOUSE_BUSY_TIMEOUT_MS",
                DEFAULT_BUSY_TIMEOUT_MS,
            )),
            fast_ingest: env_flag("FAST_INGEST", false),
        }
    }

    /// Apply a CLI `--db` override on top of the environment.
    pub fn with_path_override(mut self, path: Option<&Path>) -> Self {
        if let Some(p) = path {
            self.path = p.to_path_buf();
        }
        self
    }
}

/// Handle to the star-schema database. Cheap to clone; every caller acquires
/// its own connection through [`Warehouse::connect`] and drops it when done.
#[derive(Debug, Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
}

impl Warehouse {
    pub fn new(config: WarehouseConfig) -> Self {
        Self { config }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    #[instrument(skip(self), fields(path = %self.config.path.display()))]
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.config.path)
            .with_context(|| format!("open warehouse at {}", self.config.path.display()))?;
        configure(&conn, &self.config)?;
        debug!("warehouse connection opened");
        Ok(conn)
    }
}

/// Private in-memory database with the same session settings, for tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory warehouse")?;
    configure(&conn, &WarehouseConfig::new(":memory:"))?;
    Ok(conn)
}

fn configure(conn: &Connection, config: &WarehouseConfig) -> Result<()> {
    conn.busy_timeout(config.busy_timeout)
        .context("set busy timeout")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .context("enable foreign keys")?;
    if config.fast_ingest {
        conn.execute_batch(
            r#"
PRAGMA synchronous = OFF;        -- do not wait for disk sync
PRAGMA temp_store = MEMORY;      -- temp structures in RAM
"#,
        )
        .context("apply FAST_INGEST pragmas")?;
        info!("FAST_INGEST pragmas applied");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connections_enforce_foreign_keys() {
        let conn = open_in_memory().expect("open");
        let on: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |r| r.get(0))
            .expect("pragma");
        assert_eq!(on, 1);
    }

    #[test]
    fn path_override_wins() {
        let cfg = WarehouseConfig::new("a.db").with_path_override(Some(Path::new("b.db")));
        assert_eq!(cfg.path, PathBuf::from("b.db"));
        let cfg = WarehouseConfig::new("a.db").with_path_override(None);
        assert_eq!(cfg.path, PathBuf::from("a.db"));
    }

    #[test]
    fn file_backed_connections_share_data() {
        let dir = tempfile::tempdir().expect("tempdir");
        let wh = Warehouse::new(WarehouseConfig::new(dir.path().join("w.db")));
        let conn = wh.connect().expect("first");
        conn.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1);")
            .expect("seed");
        drop(conn);
        let conn = wh.connect().expect("second");
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0))
            .expect("count");
        assert_eq!(n, 1);
    }
}
