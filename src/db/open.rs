use std::path::Path;

use log::info;
use rusqlite::Connection;

/// included schema, every statement is idempotent
static SCHEMA: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/db/schema.sql"));

pub fn open_db(path: &Path, dry_run: bool) -> rusqlite::Result<Connection> {
    if !path.exists() { info!("Creating new database {}", path.display()) }
    let conn = Connection::open(path)?;
    prepare(&conn, dry_run)?;
    Ok(conn)
}

/// Create the schema, and on a dry run start the save point
///
/// A real run autocommits every write. A dry run's writes are discarded by [release_or_rollback].
pub fn prepare(conn: &Connection, dry_run: bool) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;
    if dry_run {
        info!("Creating dry run save point");
        conn.execute_batch("SAVEPOINT dry_run")?;
    }
    Ok(())
}

pub fn release_or_rollback(conn: &Connection, dry_run: bool) -> rusqlite::Result<()> {
    match dry_run {
        true => {
            info!("--dry-run set, rolling back database state");
            conn.execute_batch("ROLLBACK TO dry_run; RELEASE dry_run")
        }
        false => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::db::job::load::load_orphans;
    use crate::db::job::LaunchRecord;
    use crate::slurm::submit::JobId;

    fn count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM launch", [], |row| row.get(0)).unwrap()
    }

    fn insert(conn: &Connection) {
        conn.execute(
            "INSERT INTO launch (project_id, sample_id, staged, created_at, updated_at) VALUES ('P1', 'S1', 1, 'now', 'now')",
            [],
        )
        .unwrap();
    }

    #[test]
    fn dry_run_discards_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("start_sarek.db");

        let conn = open_db(&path, true).unwrap();
        insert(&conn);
        release_or_rollback(&conn, true).unwrap();
        assert_eq!(count(&conn), 0);
        drop(conn);

        let conn = open_db(&path, false).unwrap();
        assert_eq!(count(&conn), 0);
    }

    #[test]
    fn real_run_keeps_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("start_sarek.db");

        let conn = open_db(&path, false).unwrap();
        insert(&conn);
        release_or_rollback(&conn, false).unwrap();
        drop(conn);

        let conn = open_db(&path, false).unwrap();
        assert_eq!(count(&conn), 1);
    }

    #[test]
    fn interrupted_real_run_keeps_submitted_jobs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("start_sarek.db");

        let conn = open_db(&path, false).unwrap();
        let record = LaunchRecord::stage(&conn, "P0001", "S1").unwrap();
        record.submit(&conn, JobId(77)).unwrap();
        drop(conn);

        let conn = open_db(&path, false).unwrap();
        let orphans = load_orphans(&conn, "P0001").unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].slurm_id, "77");
    }
}
