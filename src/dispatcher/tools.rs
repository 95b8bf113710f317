//! Default tool registrations exposing core capabilities through the
//! dispatcher: read-only wine lookup and the mutating ledger operations,
//! each emitting the matching realtime event on success (§4.9, §6).

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::dispatcher::{Role, ToolDefinition, ToolDispatcherBuilder, ToolHandler};
use crate::error::{CellarError, Result};
use crate::ledger::LedgerEngine;
use crate::realtime::{EventKind, RealtimeBroadcaster};
use crate::storage::repository::WineRepository;

struct ListAvailableWines {
    wines: Arc<WineRepository>,
}

#[async_trait]
impl ToolHandler for ListAvailableWines {
    async fn call(&self, params: serde_json::Value, _dry_run: bool) -> Result<serde_json::Value> {
        let region = params.get("region").and_then(|v| v.as_str());
        let wine_type = params.get("wine_type").and_then(|v| v.as_str());
        let wines = self.wines.list_available(region, wine_type).await?;
        Ok(serde_json::to_value(wines)?)
    }
}

struct ReceiveStock {
    ledger: Arc<LedgerEngine>,
    realtime: Arc<RealtimeBroadcaster>,
}

fn parse_uuid(params: &serde_json::Value, field: &str) -> Result<Uuid> {
    let raw = params
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| CellarError::validation(format!("'{field}' is required")))?;
    Uuid::parse_str(raw).map_err(|_| CellarError::validation(format!("'{field}' must be a UUID")))
}

fn parse_location(params: &serde_json::Value) -> Result<String> {
    params
        .get("location")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| CellarError::validation("'location' is required"))
}

fn parse_qty(params: &serde_json::Value) -> Result<i64> {
    params
        .get("qty")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| CellarError::validation("'qty' is required and must be an integer"))
}

#[async_trait]
impl ToolHandler for ReceiveStock {
    async fn call(&self, params: serde_json::Value, dry_run: bool) -> Result<serde_json::Value> {
        let vintage_id = parse_uuid(&params, "vintage_id")?;
        let location = parse_location(&params)?;
        let qty = parse_qty(&params)?;
        if qty <= 0 {
            return Err(CellarError::validation("qty must be greater than zero"));
        }

        if dry_run {
            return Ok(serde_json::json!({
                "simulated": true,
                "vintage_id": vintage_id,
                "location": location,
                "qty": qty,
            }));
        }

        let outcome = self.ledger.receive(vintage_id, &location, qty, None, None, None, None).await?;
        self.realtime.publish(
            EventKind::InventoryItemAdded,
            serde_json::json!({ "vintage_id": vintage_id, "location": location, "qty": qty }),
        );
        Ok(serde_json::to_value(outcome.stock)?)
    }
}

struct ConsumeStock {
    ledger: Arc<LedgerEngine>,
    realtime: Arc<RealtimeBroadcaster>,
}

#[async_trait]
impl ToolHandler for ConsumeStock {
    async fn call(&self, params: serde_json::Value, dry_run: bool) -> Result<serde_json::Value> {
        let vintage_id = parse_uuid(&params, "vintage_id")?;
        let location = parse_location(&params)?;
        let qty = parse_qty(&params)?;

        if dry_run {
            return Ok(serde_json::json!({ "simulated": true, "vintage_id": vintage_id, "location": location, "qty": qty }));
        }

        let stock = self.ledger.consume(vintage_id, &location, qty, None, None).await?;
        self.realtime.publish(
            EventKind::InventoryItemConsumed,
            serde_json::json!({ "vintage_id": vintage_id, "location": location, "qty": qty }),
        );
        Ok(serde_json::to_value(stock)?)
    }
}

/// Registers the capabilities exposed by this core out of the box. A host
/// application is free to call [`ToolDispatcherBuilder::register`] with
/// further tools of its own before `.build()`.
pub fn register_default_tools(
    builder: ToolDispatcherBuilder,
    wines: Arc<WineRepository>,
    ledger: Arc<LedgerEngine>,
    realtime: Arc<RealtimeBroadcaster>,
) -> ToolDispatcherBuilder {
    builder
        .register(ToolDefinition {
            name: "list_available_wines".to_string(),
            description: "Lists wines with positive available stock, optionally filtered by region/type.".to_string(),
            mutating: false,
            allowed_roles: vec![Role::Guest, Role::Crew, Role::Admin],
            require_idempotency: false,
            handler: Arc::new(ListAvailableWines { wines }),
        })
        .register(ToolDefinition {
            name: "receive_stock".to_string(),
            description: "Receives stock for a vintage at a location, appending a ledger IN entry.".to_string(),
            mutating: true,
            allowed_roles: vec![Role::Crew, Role::Admin],
            require_idempotency: true,
            handler: Arc::new(ReceiveStock { ledger: Arc::clone(&ledger), realtime: Arc::clone(&realtime) }),
        })
        .register(ToolDefinition {
            name: "consume_stock".to_string(),
            description: "Consumes stock for a vintage at a location, appending a ledger OUT entry.".to_string(),
            mutating: true,
            allowed_roles: vec![Role::Crew, Role::Admin],
            require_idempotency: true,
            handler: Arc::new(ConsumeStock { ledger, realtime }),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::DatabaseConfig;
    use crate::storage::repository::{LedgerRepository, StockRepository, VintageRepository};
    use crate::storage::Db;
    use crate::vintage_intelligence::{VintageIntelligence, VintageMemo};
    use crate::weather::WeatherFetcher;

    struct NoopWeather;
    #[async_trait]
    impl WeatherFetcher for NoopWeather {
        async fn fetch(
            &self,
            _region_token: &str,
            _year: i32,
            _vineyard_alias: Option<&str>,
        ) -> Result<Option<crate::domain::WeatherAnalysis>> {
            Ok(None)
        }
    }

    async fn test_dispatcher() -> crate::dispatcher::ToolDispatcher {
        use crate::storage::repository::IdempotencyRepository;

        let db = Arc::new(Db::connect(&DatabaseConfig::default()).await.unwrap());
        let wines = Arc::new(WineRepository::new(db.pool().clone()));
        let vintages = Arc::new(VintageRepository::new(db.pool().clone()));
        let stock = Arc::new(StockRepository::new(db.pool().clone()));
        let ledger_repo = Arc::new(LedgerRepository::new(db.pool().clone()));
        let idempotency = Arc::new(IdempotencyRepository::new(db.pool().clone()));
        let memo = Arc::new(VintageMemo::new());
        let intelligence = Arc::new(VintageIntelligence::new(vintages, Arc::new(NoopWeather), memo));
        let ledger = Arc::new(LedgerEngine::new(
            Arc::clone(&db),
            Arc::clone(&stock),
            ledger_repo,
            Arc::clone(&wines),
            Arc::new(VintageRepository::new(db.pool().clone())),
            intelligence,
        ));
        let realtime = Arc::new(RealtimeBroadcaster::new());

        register_default_tools(ToolDispatcherBuilder::new(), wines, ledger, realtime).build(idempotency)
    }

    #[tokio::test]
    async fn list_available_wines_is_open_to_guests() {
        let dispatcher = test_dispatcher().await;
        let result = dispatcher
            .call_tool(
                "list_available_wines",
                serde_json::json!({}),
                "guest-1",
                Role::Guest,
                Default::default(),
            )
            .await
            .unwrap();
        assert!(result.is_array());
    }

    #[tokio::test]
    async fn guests_cannot_receive_stock() {
        let dispatcher = test_dispatcher().await;
        let err = dispatcher
            .call_tool(
                "receive_stock",
                serde_json::json!({"vintage_id": Uuid::new_v4(), "location": "cellar-a", "qty": 6}),
                "guest-1",
                Role::Guest,
                Default::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CellarError::Authorization(_)));
    }

    #[tokio::test]
    async fn receive_stock_dry_run_does_not_mutate() {
        let dispatcher = test_dispatcher().await;
        let vintage_id = Uuid::new_v4();
        let result = dispatcher
            .call_tool(
                "receive_stock",
                serde_json::json!({"vintage_id": vintage_id, "location": "cellar-a", "qty": 6}),
                "admin-1",
                Role::Admin,
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(result["simulated"], true);
    }
}
