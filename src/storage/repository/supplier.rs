use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::domain::{AvailabilityStatus, PriceBookRow, Supplier};
use crate::error::Result;
use crate::storage::models::{availability_str, PriceBookDbRow, SupplierRow};

#[derive(Clone)]
pub struct SupplierRepository {
    pool: Pool<Sqlite>,
}

impl SupplierRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, supplier: &Supplier) -> Result<()> {
        sqlx::query("INSERT INTO suppliers (id, name, active, rating) VALUES (?, ?, ?, ?)")
            .bind(supplier.id.to_string())
            .bind(&supplier.name)
            .bind(supplier.active)
            .bind(supplier.rating as i64)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Supplier>> {
        let row = sqlx::query_as::<_, SupplierRow>("SELECT * FROM suppliers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_domain()).transpose()
    }

    pub async fn list_active(&self) -> Result<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, SupplierRow>("SELECT * FROM suppliers WHERE active = 1")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }
}

#[derive(Clone)]
pub struct PriceBookRepository {
    pool: Pool<Sqlite>,
}

impl PriceBookRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, row: &PriceBookRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO price_book (vintage_id, supplier_id, price_per_bottle, availability_status, last_updated)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (vintage_id, supplier_id) DO UPDATE SET
                price_per_bottle = excluded.price_per_bottle,
                availability_status = excluded.availability_status,
                last_updated = excluded.last_updated",
        )
        .bind(row.vintage_id.to_string())
        .bind(row.supplier_id.to_string())
        .bind(row.price_per_bottle.to_string())
        .bind(availability_str(row.availability_status))
        .bind(row.last_updated.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_vintage(&self, vintage_id: Uuid) -> Result<Vec<PriceBookRow>> {
        let rows = sqlx::query_as::<_, PriceBookDbRow>(
            "SELECT * FROM price_book WHERE vintage_id = ? ORDER BY price_per_bottle ASC",
        )
        .bind(vintage_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(|r| r.into_domain()).collect()
    }

    pub async fn best_available(&self, vintage_id: Uuid) -> Result<Option<PriceBookRow>> {
        Ok(self
            .list_for_vintage(vintage_id)
            .await?
            .into_iter()
            .find(|r| r.availability_status != AvailabilityStatus::Out))
    }
}
