use rusqlite::{params, Connection};

/// A job SLURM accepted but Charon never heard about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    pub sample_id: String,
    pub slurm_id: String,
    pub submitted_at: String,
}

pub fn load_orphans(conn: &Connection, project_id: &str) -> rusqlite::Result<Vec<Orphan>> {
    let mut stmt = conn.prepare(
        "SELECT sample_id, slurm_id, updated_at FROM launch \
         WHERE project_id = ?1 AND submitted = 1 AND tracked = 0 AND resolved = 0 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![project_id], |row| {
        Ok(Orphan {
            sample_id: row.get(0)?,
            slurm_id: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            submitted_at: row.get(2)?,
        })
    })?;
    let orphans = rows.collect::<rusqlite::Result<Vec<Orphan>>>()?;
    Ok(orphans)
}
