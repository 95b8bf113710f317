//! Observability (spec §4, "Observability (5%)"): structured error
//! taxonomy (see [`crate::error`]), per-operation metrics recorded through
//! the `metrics` facade (already used by the cache fabric, see
//! `crate::cache::fabric`), and the RUM ingestion buffer.

pub mod metrics;
pub mod rum;

pub use metrics::{install_prometheus_recorder, OperationTimer};
pub use rum::{RumBuffer, RumMetric};
