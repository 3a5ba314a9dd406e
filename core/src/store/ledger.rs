use super::{text_column, Store};
use crate::{
    error::EngineResult,
    model::{RevenueTransaction, TransactionKind, TransactionStatus},
};
use rusqlite::{params, Row};

impl Store {
    // ── Revenue ledger ────────────────────────────────────────────

    pub(super) fn insert_transaction(&self, t: &RevenueTransaction) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO revenue_transaction (
                id, client_id, client_name, amount, kind, date, status,
                revert_reason, cost_snapshot, server_snapshot, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                t.id,
                t.client_id,
                t.client_name,
                t.amount,
                t.kind.as_str(),
                t.date,
                t.status.as_str(),
                t.revert_reason,
                t.cost_snapshot,
                t.server_snapshot,
                t.recorded_at,
            ],
        )?;
        Ok(())
    }

    pub(super) fn all_transactions(&self) -> EngineResult<Vec<RevenueTransaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, client_id, client_name, amount, kind, date, status,
                    revert_reason, cost_snapshot, server_snapshot, recorded_at
             FROM revenue_transaction
             ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([], Self::map_transaction_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Only status and revert reason ever change after insert.
    pub(super) fn write_transaction(&self, t: &RevenueTransaction) -> EngineResult<usize> {
        let changed = self.conn.execute(
            "UPDATE revenue_transaction SET status = ?2, revert_reason = ?3
             WHERE id = ?1",
            params![t.id, t.status.as_str(), t.revert_reason],
        )?;
        Ok(changed)
    }

    pub(super) fn remove_transaction(&self, id: &str) -> EngineResult<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM revenue_transaction WHERE id = ?1", params![id])?)
    }

    fn map_transaction_row(row: &Row<'_>) -> rusqlite::Result<RevenueTransaction> {
        Ok(RevenueTransaction {
            id: row.get(0)?,
            client_id: row.get(1)?,
            client_name: row.get(2)?,
            amount: row.get(3)?,
            kind: text_column(row, 4, TransactionKind::parse)?,
            date: row.get(5)?,
            status: text_column(row, 6, TransactionStatus::parse)?,
            revert_reason: row.get(7)?,
            cost_snapshot: row.get(8)?,
            server_snapshot: row.get(9)?,
            recorded_at: row.get(10)?,
        })
    }
}
