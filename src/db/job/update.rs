use chrono::Utc;
use log::info;
use rusqlite::{params, Connection};

use crate::db::job::state::JobState;
use crate::db::job::LaunchRecord;
use crate::slurm::submit::JobId;

impl LaunchRecord {
    /// Record that a sample's manifest and script are on disk
    pub fn stage(conn: &Connection, project_id: &str, sample_id: &str) -> rusqlite::Result<LaunchRecord> {
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO launch (project_id, sample_id, staged, created_at, updated_at) VALUES (?1, ?2, 1, ?3, ?3)",
            params![project_id, sample_id, now],
        )?;
        let record = LaunchRecord {
            id: conn.last_insert_rowid(),
            project_id: project_id.to_string(),
            sample_id: sample_id.to_string(),
        };
        info!("Updating {sample_id} with state {}", JobState::Staged.column());
        Ok(record)
    }

    pub fn submit(&self, conn: &Connection, job_id: JobId) -> rusqlite::Result<()> {
        self.update(conn, JobState::Submitted)?;
        self.update_slurm(conn, job_id)
    }

    /// Charon confirmed this launch, which also settles any earlier orphan of the sample
    pub fn track(&self, conn: &Connection) -> rusqlite::Result<()> {
        self.update(conn, JobState::Tracked)?;
        let resolved = resolve_orphans(conn, &self.project_id, &self.sample_id)?;
        if resolved > 0 {
            info!("Resolved {resolved} earlier orphaned jobs of {}", self.sample_id);
        }
        Ok(())
    }

    fn update_slurm(&self, conn: &Connection, slurm_id: JobId) -> rusqlite::Result<()> {
        info!("Updating {} with slurm ID {slurm_id}", self.sample_id);
        conn.execute(
            "UPDATE launch SET slurm_id = ?1 WHERE id = ?2",
            params![slurm_id.to_string(), self.id],
        )?;
        Ok(())
    }

    fn update(&self, conn: &Connection, state: JobState) -> rusqlite::Result<()> {
        let col = state.column();
        info!("Updating {} with state {col}", self.sample_id);
        let stmt = format!("UPDATE launch SET {col} = 1, updated_at = ?1 WHERE id = ?2");
        conn.execute(&stmt, params![Utc::now().to_rfc3339(), self.id])?;
        Ok(())
    }
}

/// Mark a sample's submitted but untracked launches as resolved, returns how many there were
pub fn resolve_orphans(conn: &Connection, project_id: &str, sample_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE launch SET resolved = 1, updated_at = ?1 \
         WHERE project_id = ?2 AND sample_id = ?3 AND submitted = 1 AND tracked = 0 AND resolved = 0",
        params![Utc::now().to_rfc3339(), project_id, sample_id],
    )
}
