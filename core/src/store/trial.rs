use super::{text_column, Store};
use crate::{
    error::EngineResult,
    model::{Trial, TrialStatus},
};
use rusqlite::{params, Row};

impl Store {
    // ── Trials ────────────────────────────────────────────────────

    pub(super) fn insert_trial(&self, t: &Trial) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO trial (id, client_name, phone, ends_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![t.id, t.client_name, t.phone, t.ends_at, t.status.as_str()],
        )?;
        Ok(())
    }

    pub(super) fn all_trials(&self) -> EngineResult<Vec<Trial>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, client_name, phone, ends_at, status
             FROM trial
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([], Self::map_trial_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub(super) fn write_trial(&self, t: &Trial) -> EngineResult<usize> {
        let changed = self.conn.execute(
            "UPDATE trial SET client_name = ?2, phone = ?3, ends_at = ?4, status = ?5
             WHERE id = ?1",
            params![t.id, t.client_name, t.phone, t.ends_at, t.status.as_str()],
        )?;
        Ok(changed)
    }

    pub(super) fn remove_trial(&self, id: &str) -> EngineResult<usize> {
        Ok(self.conn.execute("DELETE FROM trial WHERE id = ?1", params![id])?)
    }

    fn map_trial_row(row: &Row<'_>) -> rusqlite::Result<Trial> {
        Ok(Trial {
            id: row.get(0)?,
            client_name: row.get(1)?,
            phone: row.get(2)?,
            ends_at: row.get(3)?,
            status: text_column(row, 4, TrialStatus::parse)?,
        })
    }
}
