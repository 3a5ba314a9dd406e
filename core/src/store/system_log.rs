use super::{text_column, Store};
use crate::{
    error::EngineResult,
    model::{SystemLogEntry, SystemLogKind},
};
use rusqlite::params;

impl Store {
    // ── System log ────────────────────────────────────────────────

    pub(super) fn insert_system_log(&self, e: &SystemLogEntry) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO system_log (id, kind, entity_id, entity_name, message, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                e.id,
                e.kind.as_str(),
                e.entity_id,
                e.entity_name,
                e.message,
                e.created_at,
            ],
        )?;
        Ok(())
    }

    pub(super) fn all_system_log(&self) -> EngineResult<Vec<SystemLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, entity_id, entity_name, message, created_at
             FROM system_log
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SystemLogEntry {
                    id: row.get(0)?,
                    kind: text_column(row, 1, SystemLogKind::parse)?,
                    entity_id: row.get(2)?,
                    entity_name: row.get(3)?,
                    message: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub(super) fn write_system_log(&self, e: &SystemLogEntry) -> EngineResult<usize> {
        let changed = self.conn.execute(
            "UPDATE system_log SET kind = ?2, entity_id = ?3, entity_name = ?4, message = ?5
             WHERE id = ?1",
            params![e.id, e.kind.as_str(), e.entity_id, e.entity_name, e.message],
        )?;
        Ok(changed)
    }

    pub(super) fn remove_system_log(&self, id: &str) -> EngineResult<usize> {
        Ok(self.conn.execute("DELETE FROM system_log WHERE id = ?1", params![id])?)
    }
}
