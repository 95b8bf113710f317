use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only record of a stock movement (§3). Never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LedgerEntryType {
    In,
    Out,
    Move,
    Reserve,
    Unreserve,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub entry_type: LedgerEntryType,
    pub vintage_id: Uuid,
    pub location: String,
    /// For MOVE entries, the other leg's location.
    pub related_location: Option<String>,
    pub quantity: i64,
    pub unit_cost: Option<Decimal>,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    pub actor: Option<String>,
    /// Correlates the two legs of a MOVE.
    pub correlation_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        entry_type: LedgerEntryType,
        vintage_id: Uuid,
        location: impl Into<String>,
        quantity: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_type,
            vintage_id,
            location: location.into(),
            related_location: None,
            quantity,
            unit_cost: None,
            reference_id: None,
            notes: None,
            actor: None,
            correlation_id: None,
            timestamp: Utc::now(),
        }
    }
}
