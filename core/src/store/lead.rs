use super::{text_column, Store};
use crate::{
    error::EngineResult,
    model::{Lead, LeadCategory, LeadSource, LeadStage, PlanSnapshot},
};
use rusqlite::{params, Row};

impl Store {
    // ── Pipeline leads ────────────────────────────────────────────

    pub(super) fn insert_lead(&self, l: &Lead) -> EngineResult<()> {
        let snapshot_json = l.snapshot.as_ref().map(serde_json::to_string).transpose()?;
        self.conn.execute(
            "INSERT INTO lead (
                id, name, phone, category, source, stage, from_migration,
                origin_client_id, snapshot_json, migration_reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                l.id,
                l.name,
                l.phone,
                l.category.as_str(),
                l.source.as_str(),
                l.stage.as_str(),
                if l.from_migration { 1 } else { 0 },
                l.origin_client_id,
                snapshot_json,
                l.migration_reason,
                l.created_at,
            ],
        )?;
        Ok(())
    }

    pub(super) fn all_leads(&self) -> EngineResult<Vec<Lead>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, phone, category, source, stage, from_migration,
                    origin_client_id, snapshot_json, migration_reason, created_at
             FROM lead
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([], Self::map_lead_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub(super) fn write_lead(&self, l: &Lead) -> EngineResult<usize> {
        let snapshot_json = l.snapshot.as_ref().map(serde_json::to_string).transpose()?;
        let changed = self.conn.execute(
            "UPDATE lead SET
                name = ?2, phone = ?3, category = ?4, source = ?5, stage = ?6,
                from_migration = ?7, origin_client_id = ?8, snapshot_json = ?9,
                migration_reason = ?10
             WHERE id = ?1",
            params![
                l.id,
                l.name,
                l.phone,
                l.category.as_str(),
                l.source.as_str(),
                l.stage.as_str(),
                if l.from_migration { 1 } else { 0 },
                l.origin_client_id,
                snapshot_json,
                l.migration_reason,
            ],
        )?;
        Ok(changed)
    }

    pub(super) fn remove_lead(&self, id: &str) -> EngineResult<usize> {
        Ok(self.conn.execute("DELETE FROM lead WHERE id = ?1", params![id])?)
    }

    fn map_lead_row(row: &Row<'_>) -> rusqlite::Result<Lead> {
        let snapshot_json: Option<String> = row.get(8)?;
        let snapshot = snapshot_json
            .map(|json| serde_json::from_str::<PlanSnapshot>(&json))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, e.into())
            })?;
        Ok(Lead {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            category: text_column(row, 3, LeadCategory::parse)?,
            source: text_column(row, 4, LeadSource::parse)?,
            stage: text_column(row, 5, LeadStage::parse)?,
            from_migration: row.get::<_, i32>(6)? != 0,
            origin_client_id: row.get(7)?,
            snapshot,
            migration_reason: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}
