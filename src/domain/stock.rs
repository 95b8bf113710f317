use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Keyed by `(vintage, location)`; invariant `available = quantity - reserved
/// >= 0` must hold after every committed transaction (§3, §8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub vintage_id: Uuid,
    pub location: String,
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub cost_per_bottle: Option<Decimal>,
    pub current_value: Option<Decimal>,
}

impl Stock {
    pub fn new(vintage_id: Uuid, location: impl Into<String>) -> Self {
        Self {
            vintage_id,
            location: location.into(),
            quantity: 0,
            reserved_quantity: 0,
            cost_per_bottle: None,
            current_value: None,
        }
    }

    pub fn available(&self) -> i64 {
        self.quantity - self.reserved_quantity
    }

    pub fn is_consistent(&self) -> bool {
        self.quantity >= 0
            && self.reserved_quantity >= 0
            && self.reserved_quantity <= self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_is_quantity_minus_reserved() {
        let mut s = Stock::new(Uuid::new_v4(), "main-cellar");
        s.quantity = 12;
        s.reserved_quantity = 6;
        assert_eq!(s.available(), 6);
        assert!(s.is_consistent());
    }

    #[test]
    fn detects_inconsistent_over_reservation() {
        let mut s = Stock::new(Uuid::new_v4(), "main-cellar");
        s.quantity = 4;
        s.reserved_quantity = 5;
        assert!(!s.is_consistent());
    }
}
