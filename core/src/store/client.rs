use super::{text_column, Store};
use crate::{
    error::EngineResult,
    model::{LifecycleStatus, PaymentStatus, Subscriber},
};
use rusqlite::{params, Row};

const CLIENT_COLUMNS: &str = "id, name, phone, plan, price, activation_date, expiration_date,
                              payment_status, status, server, device, app";

impl Store {
    // ── Subscribers ───────────────────────────────────────────────

    pub(super) fn insert_client(&self, c: &Subscriber) -> EngineResult<()> {
        self.conn.execute(
            "INSERT INTO client (
                id, name, phone, plan, price, activation_date, expiration_date,
                payment_status, status, server, device, app
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                c.id,
                c.name,
                c.phone,
                c.plan,
                c.price,
                c.activation_date,
                c.expiration_date,
                c.payment_status.as_str(),
                c.status.as_str(),
                c.server,
                c.device,
                c.app,
            ],
        )?;
        Ok(())
    }

    pub(super) fn all_clients(&self) -> EngineResult<Vec<Subscriber>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CLIENT_COLUMNS} FROM client ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map([], Self::map_client_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub(super) fn write_client(&self, c: &Subscriber) -> EngineResult<usize> {
        let changed = self.conn.execute(
            "UPDATE client SET
                name = ?2, phone = ?3, plan = ?4, price = ?5,
                activation_date = ?6, expiration_date = ?7,
                payment_status = ?8, status = ?9,
                server = ?10, device = ?11, app = ?12
             WHERE id = ?1",
            params![
                c.id,
                c.name,
                c.phone,
                c.plan,
                c.price,
                c.activation_date,
                c.expiration_date,
                c.payment_status.as_str(),
                c.status.as_str(),
                c.server,
                c.device,
                c.app,
            ],
        )?;
        Ok(changed)
    }

    pub(super) fn remove_client(&self, id: &str) -> EngineResult<usize> {
        Ok(self.conn.execute("DELETE FROM client WHERE id = ?1", params![id])?)
    }

    fn map_client_row(row: &Row<'_>) -> rusqlite::Result<Subscriber> {
        Ok(Subscriber {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            plan: row.get(3)?,
            price: row.get(4)?,
            activation_date: row.get(5)?,
            expiration_date: row.get(6)?,
            payment_status: text_column(row, 7, PaymentStatus::parse)?,
            status: text_column(row, 8, LifecycleStatus::parse)?,
            server: row.get(9)?,
            device: row.get(10)?,
            app: row.get(11)?,
        })
    }
}
