use sqlx::{Pool, Sqlite, Transaction};
use uuid::Uuid;

use crate::domain::{LedgerEntry, LedgerEntryType, Stock};
use crate::error::{CellarError, Result};
use crate::storage::models::{entry_type_str, LedgerEntryRow, StockRow};

/// Stock row access. Mutating methods require an active transaction (§4.1):
/// the caller is expected to hold one via [`crate::storage::Db::with_transaction`].
#[derive(Clone)]
pub struct StockRepository {
    pool: Pool<Sqlite>,
}

impl StockRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, vintage_id: Uuid, location: &str) -> Result<Option<Stock>> {
        let row = sqlx::query_as::<_, StockRow>(
            "SELECT * FROM stock WHERE vintage_id = ? AND location = ?",
        )
        .bind(vintage_id.to_string())
        .bind(location)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    /// Reads the row for update within an open transaction. SQLite's
    /// `BEGIN IMMEDIATE`-equivalent locking (acquired implicitly by the
    /// first write in the transaction) combined with WAL mode gives the
    /// "committed state reflects a serial order" contract of §4.1 for
    /// writers touching the same `(vintage, location)` row.
    pub async fn get_in_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        vintage_id: Uuid,
        location: &str,
    ) -> Result<Option<Stock>> {
        let row = sqlx::query_as::<_, StockRow>(
            "SELECT * FROM stock WHERE vintage_id = ? AND location = ?",
        )
        .bind(vintage_id.to_string())
        .bind(location)
        .fetch_optional(&mut **tx)
        .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    /// Creates the row on first receipt at a location if absent (§3).
    pub async fn upsert_increment(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        vintage_id: Uuid,
        location: &str,
        delta_qty: i64,
        new_cost_per_bottle: Option<rust_decimal::Decimal>,
    ) -> Result<()> {
        let cost_str = new_cost_per_bottle.map(|d| d.to_string());
        sqlx::query(
            "INSERT INTO stock (vintage_id, location, quantity, reserved_quantity, cost_per_bottle)
             VALUES (?, ?, ?, 0, ?)
             ON CONFLICT (vintage_id, location) DO UPDATE SET
                quantity = quantity + excluded.quantity,
                cost_per_bottle = COALESCE(excluded.cost_per_bottle, stock.cost_per_bottle)",
        )
        .bind(vintage_id.to_string())
        .bind(location)
        .bind(delta_qty)
        .bind(cost_str)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn decrement(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        vintage_id: Uuid,
        location: &str,
        delta_qty: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE stock SET quantity = quantity - ? WHERE vintage_id = ? AND location = ?",
        )
        .bind(delta_qty)
        .bind(vintage_id.to_string())
        .bind(location)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn adjust_reserved(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        vintage_id: Uuid,
        location: &str,
        delta_reserved: i64,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE stock SET reserved_quantity = reserved_quantity + ? WHERE vintage_id = ? AND location = ?",
        )
        .bind(delta_reserved)
        .bind(vintage_id.to_string())
        .bind(location)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list_for_vintage(&self, vintage_id: Uuid) -> Result<Vec<Stock>> {
        let rows = sqlx::query_as::<_, StockRow>("SELECT * FROM stock WHERE vintage_id = ?")
            .bind(vintage_id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }
}

/// Append-only ledger access (§3, §4.6).
#[derive(Clone)]
pub struct LedgerRepository {
    pool: Pool<Sqlite>,
}

impl LedgerRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        entry: &LedgerEntry,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO ledger_entries
             (id, entry_type, vintage_id, location, related_location, quantity, unit_cost,
              reference_id, notes, actor, correlation_id, timestamp)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(entry_type_str(entry.entry_type))
        .bind(entry.vintage_id.to_string())
        .bind(&entry.location)
        .bind(&entry.related_location)
        .bind(entry.quantity)
        .bind(entry.unit_cost.map(|d| d.to_string()))
        .bind(&entry.reference_id)
        .bind(&entry.notes)
        .bind(&entry.actor)
        .bind(entry.correlation_id.map(|c| c.to_string()))
        .bind(entry.timestamp.to_rfc3339())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    pub async fn list_for_vintage(&self, vintage_id: Uuid) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(
            "SELECT * FROM ledger_entries WHERE vintage_id = ? ORDER BY timestamp ASC",
        )
        .bind(vintage_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    /// §8 ledger conservation: `sum(IN) - sum(OUT) + net MOVE in - net MOVE
    /// out = sum(quantity across locations)`. Useful for property tests and
    /// admin audits.
    pub async fn net_quantity(&self, vintage_id: Uuid) -> Result<i64> {
        let entries = self.list_for_vintage(vintage_id).await?;
        let mut net = 0i64;
        for e in &entries {
            match e.entry_type {
                LedgerEntryType::In => net += e.quantity,
                LedgerEntryType::Out => net -= e.quantity,
                LedgerEntryType::Move => {
                    // Each MOVE leg is recorded as its own signed entry via
                    // `quantity`'s sign at append time (negative = outgoing leg).
                    net += e.quantity;
                }
                LedgerEntryType::Reserve | LedgerEntryType::Unreserve => {}
            }
        }
        Ok(net)
    }
}

impl Stock {
    pub fn require_available(&self, qty: i64) -> Result<()> {
        if qty > self.available() {
            return Err(CellarError::InsufficientStock {
                requested: qty,
                available: self.available(),
            });
        }
        Ok(())
    }
}
