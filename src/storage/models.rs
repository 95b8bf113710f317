//! Row-level mappings between sqlite columns and domain types, kept
//! separate from domain logic per the teacher's `storage::models` pattern.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::*;
use crate::error::{CellarError, Result};

fn parse_uuid(s: &str, field: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| CellarError::internal(format!("bad uuid in {field}: {e}")))
}

fn parse_ts(s: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| CellarError::internal(format!("bad timestamp in {field}: {e}")))
}

#[derive(Debug, FromRow)]
pub struct WineRow {
    pub id: String,
    pub name: String,
    pub producer: String,
    pub region: String,
    pub country: String,
    pub wine_type: String,
    pub grape_varieties: String,
    pub style: Option<String>,
    pub tasting_notes: Option<String>,
    pub storage_hints: Option<String>,
}

impl WineRow {
    pub fn into_domain(self) -> Result<Wine> {
        Ok(Wine {
            id: parse_uuid(&self.id, "wines.id")?,
            name: self.name,
            producer: self.producer,
            region: self.region,
            country: self.country,
            wine_type: WineType::parse(&self.wine_type),
            grape_varieties: serde_json::from_str(&self.grape_varieties).unwrap_or_default(),
            style: self.style,
            tasting_notes: self.tasting_notes,
            storage_hints: self.storage_hints,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct VintageRow {
    pub id: String,
    pub wine_id: String,
    pub year: i64,
    pub quality_score: Option<f64>,
    pub weather_score: Option<f64>,
    pub critic_score: Option<f64>,
    pub peak_drinking_start: Option<i64>,
    pub peak_drinking_end: Option<i64>,
    pub weather_json: Option<String>,
    pub procurement_json: Option<String>,
    pub notes_text: Option<String>,
    pub created_at: String,
    pub enriched_at: Option<String>,
}

impl VintageRow {
    pub fn into_domain(self) -> Result<Vintage> {
        Ok(Vintage {
            id: parse_uuid(&self.id, "vintages.id")?,
            wine_id: parse_uuid(&self.wine_id, "vintages.wine_id")?,
            year: self.year as i32,
            quality_score: self.quality_score,
            weather_score: self.weather_score,
            critic_score: self.critic_score,
            peak_drinking_start: self.peak_drinking_start.map(|v| v as i32),
            peak_drinking_end: self.peak_drinking_end.map(|v| v as i32),
            weather_json: self
                .weather_json
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            procurement_json: self
                .procurement_json
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            notes_text: self.notes_text,
            created_at: parse_ts(&self.created_at, "vintages.created_at")?,
            enriched_at: self
                .enriched_at
                .as_deref()
                .map(|s| parse_ts(s, "vintages.enriched_at"))
                .transpose()?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct StockRow {
    pub vintage_id: String,
    pub location: String,
    pub quantity: i64,
    pub reserved_quantity: i64,
    pub cost_per_bottle: Option<String>,
    pub current_value: Option<String>,
}

impl StockRow {
    pub fn into_domain(self) -> Result<Stock> {
        Ok(Stock {
            vintage_id: parse_uuid(&self.vintage_id, "stock.vintage_id")?,
            location: self.location,
            quantity: self.quantity,
            reserved_quantity: self.reserved_quantity,
            cost_per_bottle: self
                .cost_per_bottle
                .as_deref()
                .map(Decimal::from_str)
                .transpose()
                .map_err(|e| CellarError::internal(format!("bad decimal: {e}")))?,
            current_value: self
                .current_value
                .as_deref()
                .map(Decimal::from_str)
                .transpose()
                .map_err(|e| CellarError::internal(format!("bad decimal: {e}")))?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct LedgerEntryRow {
    pub id: String,
    pub entry_type: String,
    pub vintage_id: String,
    pub location: String,
    pub related_location: Option<String>,
    pub quantity: i64,
    pub unit_cost: Option<String>,
    pub reference_id: Option<String>,
    pub notes: Option<String>,
    pub actor: Option<String>,
    pub correlation_id: Option<String>,
    pub timestamp: String,
}

impl LedgerEntryRow {
    pub fn into_domain(self) -> Result<LedgerEntry> {
        let entry_type = match self.entry_type.as_str() {
            "IN" => LedgerEntryType::In,
            "OUT" => LedgerEntryType::Out,
            "MOVE" => LedgerEntryType::Move,
            "RESERVE" => LedgerEntryType::Reserve,
            "UNRESERVE" => LedgerEntryType::Unreserve,
            other => return Err(CellarError::internal(format!("bad ledger entry_type: {other}"))),
        };
        Ok(LedgerEntry {
            id: parse_uuid(&self.id, "ledger_entries.id")?,
            entry_type,
            vintage_id: parse_uuid(&self.vintage_id, "ledger_entries.vintage_id")?,
            location: self.location,
            related_location: self.related_location,
            quantity: self.quantity,
            unit_cost: self
                .unit_cost
                .as_deref()
                .map(Decimal::from_str)
                .transpose()
                .map_err(|e| CellarError::internal(format!("bad decimal: {e}")))?,
            reference_id: self.reference_id,
            notes: self.notes,
            actor: self.actor,
            correlation_id: self
                .correlation_id
                .as_deref()
                .map(|s| parse_uuid(s, "ledger_entries.correlation_id"))
                .transpose()?,
            timestamp: parse_ts(&self.timestamp, "ledger_entries.timestamp")?,
        })
    }
}

pub fn entry_type_str(t: LedgerEntryType) -> &'static str {
    match t {
        LedgerEntryType::In => "IN",
        LedgerEntryType::Out => "OUT",
        LedgerEntryType::Move => "MOVE",
        LedgerEntryType::Reserve => "RESERVE",
        LedgerEntryType::Unreserve => "UNRESERVE",
    }
}

#[derive(Debug, FromRow)]
pub struct SupplierRow {
    pub id: String,
    pub name: String,
    pub active: i64,
    pub rating: i64,
}

impl SupplierRow {
    pub fn into_domain(self) -> Result<Supplier> {
        Ok(Supplier {
            id: parse_uuid(&self.id, "suppliers.id")?,
            name: self.name,
            active: self.active != 0,
            rating: self.rating as u8,
        })
    }
}

fn parse_availability(s: &str) -> Result<AvailabilityStatus> {
    match s {
        "in_stock" => Ok(AvailabilityStatus::InStock),
        "limited" => Ok(AvailabilityStatus::Limited),
        "allocated" => Ok(AvailabilityStatus::Allocated),
        "out" => Ok(AvailabilityStatus::Out),
        other => Err(CellarError::internal(format!(
            "bad availability_status: {other}"
        ))),
    }
}

pub fn availability_str(s: AvailabilityStatus) -> &'static str {
    match s {
        AvailabilityStatus::InStock => "in_stock",
        AvailabilityStatus::Limited => "limited",
        AvailabilityStatus::Allocated => "allocated",
        AvailabilityStatus::Out => "out",
    }
}

#[derive(Debug, FromRow)]
pub struct PriceBookDbRow {
    pub vintage_id: String,
    pub supplier_id: String,
    pub price_per_bottle: String,
    pub availability_status: String,
    pub last_updated: String,
}

impl PriceBookDbRow {
    pub fn into_domain(self) -> Result<PriceBookRow> {
        Ok(PriceBookRow {
            vintage_id: parse_uuid(&self.vintage_id, "price_book.vintage_id")?,
            supplier_id: parse_uuid(&self.supplier_id, "price_book.supplier_id")?,
            price_per_bottle: Decimal::from_str(&self.price_per_bottle)
                .map_err(|e| CellarError::internal(format!("bad decimal: {e}")))?,
            availability_status: parse_availability(&self.availability_status)?,
            last_updated: parse_ts(&self.last_updated, "price_book.last_updated")?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct WeatherCacheRow {
    pub region_token: String,
    pub year: i64,
    pub vineyard_alias: String,
    pub payload: String,
    pub created_at: String,
    pub expires_at: String,
}

impl WeatherCacheRow {
    pub fn into_domain(self) -> Result<WeatherCacheEntry> {
        let payload: WeatherAnalysis = serde_json::from_str(&self.payload)?;
        Ok(WeatherCacheEntry {
            region_token: self.region_token,
            year: self.year as i32,
            vineyard_alias: if self.vineyard_alias.is_empty() {
                None
            } else {
                Some(self.vineyard_alias)
            },
            payload,
            created_at: parse_ts(&self.created_at, "weather_cache.created_at")?,
            expires_at: parse_ts(&self.expires_at, "weather_cache.expires_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ExplanationRow {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub summary: String,
    pub factors: String,
    pub created_at: String,
    pub actor_role: String,
}

impl ExplanationRow {
    pub fn into_domain(self) -> Result<Explanation> {
        let entity_type = match self.entity_type.as_str() {
            "pairing_recommendation" => ExplanationEntityType::PairingRecommendation,
            "procurement" => ExplanationEntityType::Procurement,
            "weather" => ExplanationEntityType::Weather,
            "vintage_adjustment" => ExplanationEntityType::VintageAdjustment,
            other => {
                return Err(CellarError::internal(format!(
                    "bad explanation entity_type: {other}"
                )))
            }
        };
        Ok(Explanation {
            id: parse_uuid(&self.id, "explanations.id")?,
            entity_type,
            entity_id: self.entity_id,
            summary: self.summary,
            factors: serde_json::from_str(&self.factors).unwrap_or_default(),
            created_at: parse_ts(&self.created_at, "explanations.created_at")?,
            actor_role: self.actor_role,
        })
    }
}

pub fn explanation_entity_type_str(t: ExplanationEntityType) -> &'static str {
    match t {
        ExplanationEntityType::PairingRecommendation => "pairing_recommendation",
        ExplanationEntityType::Procurement => "procurement",
        ExplanationEntityType::Weather => "weather",
        ExplanationEntityType::VintageAdjustment => "vintage_adjustment",
    }
}

#[derive(Debug, FromRow)]
pub struct FeedbackRow {
    pub id: String,
    pub recommendation_id: String,
    pub user_id: Option<String>,
    pub overall_rating: i64,
    pub flavor_harmony: Option<i64>,
    pub texture_balance: Option<i64>,
    pub acidity_match: Option<i64>,
    pub tannin_balance: Option<i64>,
    pub body_match: Option<i64>,
    pub regional_tradition: Option<i64>,
    pub selected: i64,
    pub time_to_decision_ms: Option<i64>,
    pub notes: Option<String>,
    pub created_at: String,
}

impl FeedbackRow {
    pub fn into_domain(self) -> Result<Feedback> {
        Ok(Feedback {
            id: parse_uuid(&self.id, "feedback.id")?,
            recommendation_id: parse_uuid(&self.recommendation_id, "feedback.recommendation_id")?,
            user_id: self.user_id,
            overall_rating: self.overall_rating as u8,
            flavor_harmony: self.flavor_harmony.map(|v| v as u8),
            texture_balance: self.texture_balance.map(|v| v as u8),
            acidity_match: self.acidity_match.map(|v| v as u8),
            tannin_balance: self.tannin_balance.map(|v| v as u8),
            body_match: self.body_match.map(|v| v as u8),
            regional_tradition: self.regional_tradition.map(|v| v as u8),
            selected: self.selected != 0,
            time_to_decision_ms: self.time_to_decision_ms.map(|v| v as u64),
            notes: self.notes,
            created_at: parse_ts(&self.created_at, "feedback.created_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ExperimentRow {
    pub id: String,
    pub name: String,
    pub status: String,
    pub target_metric: String,
    pub guardrail_metrics: String,
    pub allocation_unit: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub winner_variant_id: Option<String>,
    pub conclusion: Option<String>,
}

impl ExperimentRow {
    pub fn into_domain(self, variants: Vec<ExperimentVariant>) -> Result<Experiment> {
        let status = match self.status.as_str() {
            "draft" => ExperimentStatus::Draft,
            "running" => ExperimentStatus::Running,
            "paused" => ExperimentStatus::Paused,
            "completed" => ExperimentStatus::Completed,
            "archived" => ExperimentStatus::Archived,
            other => {
                return Err(CellarError::internal(format!(
                    "bad experiment status: {other}"
                )))
            }
        };
        let allocation_unit = match self.allocation_unit.as_str() {
            "user" => AllocationUnit::User,
            "session" => AllocationUnit::Session,
            other => {
                return Err(CellarError::internal(format!(
                    "bad allocation_unit: {other}"
                )))
            }
        };
        Ok(Experiment {
            id: parse_uuid(&self.id, "experiments.id")?,
            name: self.name,
            status,
            target_metric: self.target_metric,
            guardrail_metrics: serde_json::from_str(&self.guardrail_metrics).unwrap_or_default(),
            allocation_unit,
            start_date: self
                .start_date
                .as_deref()
                .map(|s| parse_ts(s, "experiments.start_date"))
                .transpose()?,
            end_date: self
                .end_date
                .as_deref()
                .map(|s| parse_ts(s, "experiments.end_date"))
                .transpose()?,
            variants,
            winner_variant_id: self
                .winner_variant_id
                .as_deref()
                .map(|s| parse_uuid(s, "experiments.winner_variant_id"))
                .transpose()?,
            conclusion: self.conclusion,
        })
    }
}

pub fn experiment_status_str(s: ExperimentStatus) -> &'static str {
    match s {
        ExperimentStatus::Draft => "draft",
        ExperimentStatus::Running => "running",
        ExperimentStatus::Paused => "paused",
        ExperimentStatus::Completed => "completed",
        ExperimentStatus::Archived => "archived",
    }
}

pub fn allocation_unit_str(a: AllocationUnit) -> &'static str {
    match a {
        AllocationUnit::User => "user",
        AllocationUnit::Session => "session",
    }
}

#[derive(Debug, FromRow)]
pub struct ExperimentVariantRow {
    pub id: String,
    pub experiment_id: String,
    pub name: String,
    pub is_control: i64,
    pub allocation_pct: f64,
}

impl ExperimentVariantRow {
    pub fn into_domain(self) -> Result<ExperimentVariant> {
        Ok(ExperimentVariant {
            id: parse_uuid(&self.id, "experiment_variants.id")?,
            experiment_id: parse_uuid(&self.experiment_id, "experiment_variants.experiment_id")?,
            name: self.name,
            is_control: self.is_control != 0,
            allocation_pct: self.allocation_pct,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ExperimentAssignmentRow {
    pub experiment_id: String,
    pub allocation_unit_id: String,
    pub variant_id: String,
    pub assigned_at: String,
}

impl ExperimentAssignmentRow {
    pub fn into_domain(self) -> Result<ExperimentAssignment> {
        Ok(ExperimentAssignment {
            experiment_id: parse_uuid(
                &self.experiment_id,
                "experiment_assignments.experiment_id",
            )?,
            allocation_unit_id: self.allocation_unit_id,
            variant_id: parse_uuid(&self.variant_id, "experiment_assignments.variant_id")?,
            assigned_at: parse_ts(&self.assigned_at, "experiment_assignments.assigned_at")?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ExperimentEventRow {
    pub id: String,
    pub experiment_id: String,
    pub variant_id: String,
    pub allocation_unit_id: String,
    pub event_type: String,
    pub value: Option<f64>,
    pub timestamp: String,
    pub context: String,
}

impl ExperimentEventRow {
    pub fn into_domain(self) -> Result<ExperimentEvent> {
        let event_type = match self.event_type.as_str() {
            "impression" => ExperimentEventType::Impression,
            "click" => ExperimentEventType::Click,
            "conversion" => ExperimentEventType::Conversion,
            "rating" => ExperimentEventType::Rating,
            other => return Err(CellarError::internal(format!("bad event_type: {other}"))),
        };
        Ok(ExperimentEvent {
            id: parse_uuid(&self.id, "experiment_events.id")?,
            experiment_id: parse_uuid(&self.experiment_id, "experiment_events.experiment_id")?,
            variant_id: parse_uuid(&self.variant_id, "experiment_events.variant_id")?,
            allocation_unit_id: self.allocation_unit_id,
            event_type,
            value: self.value,
            timestamp: parse_ts(&self.timestamp, "experiment_events.timestamp")?,
            context: serde_json::from_str(&self.context).unwrap_or(serde_json::Value::Null),
        })
    }
}

pub fn experiment_event_type_str(t: ExperimentEventType) -> &'static str {
    match t {
        ExperimentEventType::Impression => "impression",
        ExperimentEventType::Click => "click",
        ExperimentEventType::Conversion => "conversion",
        ExperimentEventType::Rating => "rating",
    }
}

#[derive(Debug, FromRow)]
pub struct IdempotencyRow {
    pub tool_name: String,
    pub idempotency_key: String,
    pub actor: String,
    pub result_json: String,
    pub created_at: String,
}
