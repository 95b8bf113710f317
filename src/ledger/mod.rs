//! Inventory Ledger (spec §4.6): transactional stock operations over
//! [`StockRepository`]/[`LedgerRepository`], each wrapped in
//! [`Db::with_transaction`], plus best-effort post-receive enrichment and
//! intake parsing.

mod intake;

pub use intake::{
    parse_intake, ExcelIntakeParser, IntakeItem, IntakeParser, IntakeSourceType, ManualIntakeParser,
    PdfInvoiceParser, ScannedDocumentParser,
};

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{LedgerEntry, LedgerEntryType, Stock, Vintage, Wine};
use crate::error::{CellarError, Result};
use crate::storage::repository::{LedgerRepository, StockRepository, VintageRepository, WineRepository};
use crate::storage::Db;
use crate::vintage_intelligence::VintageIntelligence;

/// Returned by `receive`: the updated stock row plus, if enrichment ran and
/// failed, the captured error (§4.6: enrichment must never fail the receive
/// itself).
#[derive(Debug, Clone)]
pub struct ReceiveOutcome {
    pub stock: Stock,
    pub enrichment_error: Option<String>,
}

#[derive(Clone)]
pub struct LedgerEngine {
    db: Arc<Db>,
    stock: Arc<StockRepository>,
    ledger: Arc<LedgerRepository>,
    wines: Arc<WineRepository>,
    vintages: Arc<VintageRepository>,
    intelligence: Arc<VintageIntelligence>,
}

impl LedgerEngine {
    pub fn new(
        db: Arc<Db>,
        stock: Arc<StockRepository>,
        ledger: Arc<LedgerRepository>,
        wines: Arc<WineRepository>,
        vintages: Arc<VintageRepository>,
        intelligence: Arc<VintageIntelligence>,
    ) -> Self {
        Self { db, stock, ledger, wines, vintages, intelligence }
    }

    /// `qty = 0` is a valid no-op; otherwise requires `qty > 0` and
    /// `available(row) >= qty`.
    pub async fn consume(
        &self,
        vintage_id: Uuid,
        location: &str,
        qty: i64,
        notes: Option<String>,
        actor: Option<String>,
    ) -> Result<Stock> {
        if qty < 0 {
            return Err(CellarError::validation("qty must be non-negative"));
        }
        if qty == 0 {
            return self
                .stock
                .get(vintage_id, location)
                .await?
                .ok_or_else(|| CellarError::not_found("no stock row for vintage/location"));
        }

        let stock_repo = Arc::clone(&self.stock);
        let ledger_repo = Arc::clone(&self.ledger);
        let location = location.to_string();

        self.db
            .with_transaction(move |tx| {
                let stock_repo = Arc::clone(&stock_repo);
                let ledger_repo = Arc::clone(&ledger_repo);
                let location = location.clone();
                Box::pin(async move {
                    let row = stock_repo
                        .get_in_tx(tx, vintage_id, &location)
                        .await?
                        .ok_or_else(|| CellarError::not_found("no stock row for vintage/location"))?;
                    row.require_available(qty)?;

                    stock_repo.decrement(tx, vintage_id, &location, qty).await?;

                    let mut entry = LedgerEntry::new(LedgerEntryType::Out, vintage_id, location.clone(), qty);
                    entry.notes = notes;
                    entry.actor = actor;
                    ledger_repo.append(tx, &entry).await?;

                    stock_repo
                        .get_in_tx(tx, vintage_id, &location)
                        .await?
                        .ok_or_else(|| CellarError::internal("stock row vanished mid-transaction"))
                })
            })
            .await
    }

    /// Increments stock at `location` (creating the row if absent), appends
    /// an IN ledger entry, and then best-effort enriches the vintage.
    pub async fn receive(
        &self,
        vintage_id: Uuid,
        location: &str,
        qty: i64,
        unit_cost: Option<rust_decimal::Decimal>,
        reference_id: Option<String>,
        notes: Option<String>,
        actor: Option<String>,
    ) -> Result<ReceiveOutcome> {
        if qty <= 0 {
            return Err(CellarError::validation("qty must be greater than zero"));
        }

        let stock_repo = Arc::clone(&self.stock);
        let ledger_repo = Arc::clone(&self.ledger);
        let location_owned = location.to_string();

        let stock = self
            .db
            .with_transaction(move |tx| {
                let stock_repo = Arc::clone(&stock_repo);
                let ledger_repo = Arc::clone(&ledger_repo);
                let location = location_owned.clone();
                let reference_id = reference_id.clone();
                let notes = notes.clone();
                let actor = actor.clone();
                Box::pin(async move {
                    stock_repo
                        .upsert_increment(tx, vintage_id, &location, qty, unit_cost)
                        .await?;

                    let mut entry = LedgerEntry::new(LedgerEntryType::In, vintage_id, location.clone(), qty);
                    entry.unit_cost = unit_cost;
                    entry.reference_id = reference_id;
                    entry.notes = notes;
                    entry.actor = actor;
                    ledger_repo.append(tx, &entry).await?;

                    stock_repo
                        .get_in_tx(tx, vintage_id, &location)
                        .await?
                        .ok_or_else(|| CellarError::internal("stock row vanished mid-transaction"))
                })
            })
            .await?;

        let enrichment_error = self.try_enrich(vintage_id).await.err().map(|e| e.to_string());

        Ok(ReceiveOutcome { stock, enrichment_error })
    }

    async fn try_enrich(&self, vintage_id: Uuid) -> Result<()> {
        let vintage: Vintage = self
            .vintages
            .get(vintage_id)
            .await?
            .ok_or_else(|| CellarError::not_found("vintage not found"))?;
        let wine: Wine = self
            .wines
            .get(vintage.wine_id)
            .await?
            .ok_or_else(|| CellarError::not_found("wine not found"))?;
        self.intelligence.enrich_wine_data(&wine, &vintage).await?;
        Ok(())
    }

    /// Moving to the same location is a no-op regardless of quantity.
    /// Otherwise requires `qty > 0` and `available(from) >= qty`.
    pub async fn move_stock(
        &self,
        vintage_id: Uuid,
        from: &str,
        to: &str,
        qty: i64,
        notes: Option<String>,
        actor: Option<String>,
    ) -> Result<(Stock, Stock)> {
        if from == to {
            let current = self
                .stock
                .get(vintage_id, from)
                .await?
                .ok_or_else(|| CellarError::not_found("no stock row for vintage/location"))?;
            return Ok((current.clone(), current));
        }
        if qty <= 0 {
            return Err(CellarError::validation("qty must be greater than zero"));
        }

        let stock_repo = Arc::clone(&self.stock);
        let ledger_repo = Arc::clone(&self.ledger);
        let from = from.to_string();
        let to = to.to_string();

        self.db
            .with_transaction(move |tx| {
                let stock_repo = Arc::clone(&stock_repo);
                let ledger_repo = Arc::clone(&ledger_repo);
                let from = from.clone();
                let to = to.clone();
                let notes = notes.clone();
                let actor = actor.clone();
                Box::pin(async move {
                    let from_row = stock_repo
                        .get_in_tx(tx, vintage_id, &from)
                        .await?
                        .ok_or_else(|| CellarError::not_found("no stock row at source location"))?;
                    from_row.require_available(qty)?;

                    stock_repo.decrement(tx, vintage_id, &from, qty).await?;
                    stock_repo.upsert_increment(tx, vintage_id, &to, qty, None).await?;

                    let correlation_id = Uuid::new_v4();

                    let mut out_leg = LedgerEntry::new(LedgerEntryType::Move, vintage_id, from.clone(), -qty);
                    out_leg.related_location = Some(to.clone());
                    out_leg.correlation_id = Some(correlation_id);
                    out_leg.notes = notes.clone();
                    out_leg.actor = actor.clone();
                    ledger_repo.append(tx, &out_leg).await?;

                    let mut in_leg = LedgerEntry::new(LedgerEntryType::Move, vintage_id, to.clone(), qty);
                    in_leg.related_location = Some(from.clone());
                    in_leg.correlation_id = Some(correlation_id);
                    in_leg.notes = notes;
                    in_leg.actor = actor;
                    ledger_repo.append(tx, &in_leg).await?;

                    let from_after = stock_repo
                        .get_in_tx(tx, vintage_id, &from)
                        .await?
                        .ok_or_else(|| CellarError::internal("stock row vanished mid-transaction"))?;
                    let to_after = stock_repo
                        .get_in_tx(tx, vintage_id, &to)
                        .await?
                        .ok_or_else(|| CellarError::internal("stock row vanished mid-transaction"))?;
                    Ok((from_after, to_after))
                })
            })
            .await
    }

    /// Requires `qty > 0` and `available(row) >= qty`.
    pub async fn reserve(
        &self,
        vintage_id: Uuid,
        location: &str,
        qty: i64,
        notes: Option<String>,
        actor: Option<String>,
    ) -> Result<Stock> {
        if qty <= 0 {
            return Err(CellarError::validation("qty must be greater than zero"));
        }

        let stock_repo = Arc::clone(&self.stock);
        let ledger_repo = Arc::clone(&self.ledger);
        let location = location.to_string();

        self.db
            .with_transaction(move |tx| {
                let stock_repo = Arc::clone(&stock_repo);
                let ledger_repo = Arc::clone(&ledger_repo);
                let location = location.clone();
                Box::pin(async move {
                    let row = stock_repo
                        .get_in_tx(tx, vintage_id, &location)
                        .await?
                        .ok_or_else(|| CellarError::not_found("no stock row for vintage/location"))?;
                    row.require_available(qty)?;

                    stock_repo.adjust_reserved(tx, vintage_id, &location, qty).await?;

                    let mut entry = LedgerEntry::new(LedgerEntryType::Reserve, vintage_id, location.clone(), qty);
                    entry.notes = notes;
                    entry.actor = actor;
                    ledger_repo.append(tx, &entry).await?;

                    stock_repo
                        .get_in_tx(tx, vintage_id, &location)
                        .await?
                        .ok_or_else(|| CellarError::internal("stock row vanished mid-transaction"))
                })
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Vintage, Wine, WineType};
    use crate::storage::database::DatabaseConfig;
    use crate::weather::{RateLimiter, ResilientWeatherFetcher, RetryPolicy};
    use crate::vintage_intelligence::VintageMemo;

    async fn engine() -> (LedgerEngine, Vintage) {
        let db = Arc::new(Db::connect(&DatabaseConfig::default()).await.unwrap());
        let stock = Arc::new(StockRepository::new(db.pool().clone()));
        let ledger = Arc::new(LedgerRepository::new(db.pool().clone()));
        let wines = Arc::new(WineRepository::new(db.pool().clone()));
        let vintages = Arc::new(VintageRepository::new(db.pool().clone()));
        let weather_cache = Arc::new(crate::storage::repository::WeatherCacheRepository::new(db.pool().clone()));
        let explanations = Arc::new(crate::storage::repository::ExplanationRepository::new(db.pool().clone()));

        struct NoCoords;
        #[async_trait::async_trait]
        impl crate::weather::RegionCoordinateResolver for NoCoords {
            async fn resolve(&self, _region: &str) -> Result<Option<crate::weather::Coordinates>> {
                Ok(None)
            }
        }
        struct NoClient;
        #[async_trait::async_trait]
        impl crate::weather::DailyWeatherClient for NoClient {
            async fn fetch_daily(
                &self,
                _coords: crate::weather::Coordinates,
                _year: i32,
            ) -> Result<crate::weather::DailySeries> {
                Err(CellarError::ServiceUnavailable("no network in tests".to_string()))
            }
        }

        let fetcher = Arc::new(ResilientWeatherFetcher::new(
            weather_cache,
            explanations,
            Arc::new(NoCoords),
            Arc::new(NoClient),
            Arc::new(RateLimiter::new(100, 100)),
            RetryPolicy { attempts: 1, initial_delay_ms: 1, backoff_factor: 1.0, jitter: false },
            false,
        ));
        let intelligence = Arc::new(VintageIntelligence::new(Arc::clone(&vintages), fetcher, Arc::new(VintageMemo::new())));

        let wine = Wine::new("Test Cuvee", "Test Producer", "Bordeaux", "France", WineType::Red);
        wines.create(&wine).await.unwrap();
        let vintage = vintages.get_or_create(wine.id, 2015).await.unwrap();

        let engine = LedgerEngine::new(db, stock, ledger, wines, vintages, intelligence);
        (engine, vintage)
    }

    #[tokio::test]
    async fn receive_then_consume_round_trips_available_quantity() {
        let (engine, vintage) = engine().await;

        let outcome = engine
            .receive(vintage.id, "main-cellar", 12, None, None, None, None)
            .await
            .unwrap();
        assert_eq!(outcome.stock.quantity, 12);

        let after = engine
            .consume(vintage.id, "main-cellar", 5, None, None)
            .await
            .unwrap();
        assert_eq!(after.quantity, 7);
        assert_eq!(after.available(), 7);
    }

    #[tokio::test]
    async fn consume_beyond_available_fails_with_insufficient_stock() {
        let (engine, vintage) = engine().await;
        engine.receive(vintage.id, "main-cellar", 3, None, None, None, None).await.unwrap();

        let err = engine.consume(vintage.id, "main-cellar", 10, None, None).await.unwrap_err();
        assert!(matches!(err, CellarError::InsufficientStock { .. }));
    }

    #[tokio::test]
    async fn moving_to_the_same_location_is_a_no_op() {
        let (engine, vintage) = engine().await;
        engine.receive(vintage.id, "main-cellar", 5, None, None, None, None).await.unwrap();

        let (from, to) = engine
            .move_stock(vintage.id, "main-cellar", "main-cellar", 999, None, None)
            .await
            .unwrap();
        assert_eq!(from.quantity, 5);
        assert_eq!(to.quantity, 5);
    }

    #[tokio::test]
    async fn move_splits_quantity_across_two_locations() {
        let (engine, vintage) = engine().await;
        engine.receive(vintage.id, "main-cellar", 10, None, None, None, None).await.unwrap();

        let (from, to) = engine
            .move_stock(vintage.id, "main-cellar", "overflow", 4, None, None)
            .await
            .unwrap();
        assert_eq!(from.quantity, 6);
        assert_eq!(to.quantity, 4);
    }

    #[tokio::test]
    async fn reserve_increments_reserved_quantity_within_available_bounds() {
        let (engine, vintage) = engine().await;
        engine.receive(vintage.id, "main-cellar", 10, None, None, None, None).await.unwrap();

        let reserved = engine.reserve(vintage.id, "main-cellar", 4, None, None).await.unwrap();
        assert_eq!(reserved.reserved_quantity, 4);
        assert_eq!(reserved.available(), 6);
    }
}
