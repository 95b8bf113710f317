use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    /// 1..5
    pub rating: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    InStock,
    Limited,
    Allocated,
    Out,
}

/// A `(vintage, supplier)` row in the price book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBookRow {
    pub vintage_id: Uuid,
    pub supplier_id: Uuid,
    pub price_per_bottle: Decimal,
    pub availability_status: AvailabilityStatus,
    pub last_updated: DateTime<Utc>,
}

impl Supplier {
    pub fn new(name: impl Into<String>, rating: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            active: true,
            rating: rating.clamp(1, 5),
        }
    }
}
