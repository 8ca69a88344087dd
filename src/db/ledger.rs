use std::cell::OnceCell;
use std::fs;
use std::io;
use std::path::PathBuf;

use rusqlite::Connection;
use thiserror::Error;

use crate::db::open::{open_db, prepare, release_or_rollback};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("can't create ledger directory {}: {source}", .path.display())]
    Dir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// The launch ledger, opened on first use
///
/// Reading never creates the ledger file. Writing creates it (and its directory) on a real run
/// only: a dry run writes into an existing ledger under a save point, or not at all.
pub struct Ledger {
    location: Location,
    dry_run: bool,
    conn: OnceCell<Connection>,
}

impl Ledger {
    pub fn at(path: impl Into<PathBuf>, dry_run: bool) -> Ledger {
        Ledger { location: Location::File(path.into()), dry_run, conn: OnceCell::new() }
    }

    pub fn in_memory(dry_run: bool) -> Ledger {
        Ledger { location: Location::Memory, dry_run, conn: OnceCell::new() }
    }

    /// Connection for reading, None while there is no ledger file
    pub fn existing(&self) -> Result<Option<&Connection>, LedgerError> {
        self.open(false)
    }

    /// Connection for recording a launch, None on a dry run without a ledger file
    pub fn writable(&self) -> Result<Option<&Connection>, LedgerError> {
        self.open(!self.dry_run)
    }

    fn open(&self, create: bool) -> Result<Option<&Connection>, LedgerError> {
        if let Some(conn) = self.conn.get() {
            return Ok(Some(conn));
        }
        let conn = match &self.location {
            Location::Memory => {
                let conn = Connection::open_in_memory()?;
                prepare(&conn, self.dry_run)?;
                conn
            }
            Location::File(path) => {
                if !create && !path.exists() {
                    return Ok(None);
                }
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir).map_err(|source| LedgerError::Dir { path: dir.to_path_buf(), source })?;
                }
                open_db(path, self.dry_run)?
            }
        };
        Ok(Some(self.conn.get_or_init(|| conn)))
    }

    /// Discard a dry run's writes. Nothing to do if the ledger was never opened.
    pub fn close(&self) -> Result<(), LedgerError> {
        if let Some(conn) = self.conn.get() {
            release_or_rollback(conn, self.dry_run)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::db::job::LaunchRecord;

    #[test]
    fn reading_never_creates_the_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ANALYSIS/P0001/sarek_ngi/start_sarek.db");

        let ledger = Ledger::at(&path, false);
        assert!(ledger.existing().unwrap().is_none());
        ledger.close().unwrap();

        assert!(!dir.path().join("ANALYSIS").exists());
    }

    #[test]
    fn first_write_creates_the_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ANALYSIS/P0001/sarek_ngi/start_sarek.db");

        let ledger = Ledger::at(&path, false);
        let conn = ledger.writable().unwrap().unwrap();
        LaunchRecord::stage(conn, "P0001", "S1").unwrap();
        ledger.close().unwrap();

        assert!(path.is_file());
        assert!(Ledger::at(&path, true).existing().unwrap().is_some());
    }

    #[test]
    fn dry_run_never_creates_the_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("start_sarek.db");

        let ledger = Ledger::at(&path, true);
        assert!(ledger.writable().unwrap().is_none());
        ledger.close().unwrap();

        assert!(!path.exists());
    }
}
