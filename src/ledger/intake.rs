//! Intake parsing (§4.6): turns free-form source documents into structured
//! items ready for `receive`, mirroring the teacher's `IngestionHandler`
//! trait shape (`ingestion::handler`) so each source type is an independently
//! testable unit.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{CellarError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeSourceType {
    Manual,
    PdfInvoice,
    ScannedDocument,
    Excel,
}

/// One line item extracted from an intake source, ready to feed into
/// `LedgerEngine::receive` once resolved against a wine/vintage.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeItem {
    pub name: String,
    pub producer: Option<String>,
    pub region: Option<String>,
    pub wine_type: Option<String>,
    pub year: i32,
    pub quantity: i64,
    pub unit_cost: Option<Decimal>,
    pub location: Option<String>,
}

pub trait IntakeParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<Vec<IntakeItem>>;
}

/// Structured items pass through after validation; `raw` is a JSON array.
pub struct ManualIntakeParser;

impl IntakeParser for ManualIntakeParser {
    fn parse(&self, raw: &str) -> Result<Vec<IntakeItem>> {
        let items: Vec<ManualItem> =
            serde_json::from_str(raw).map_err(|e| CellarError::validation(format!("invalid manual intake payload: {e}")))?;
        items
            .into_iter()
            .map(|item| {
                if item.quantity <= 0 {
                    return Err(CellarError::validation("quantity must be positive"));
                }
                if !(1800..=2100).contains(&item.year) {
                    return Err(CellarError::validation("year out of range"));
                }
                Ok(IntakeItem {
                    name: item.name,
                    producer: item.producer,
                    region: item.region,
                    wine_type: item.wine_type,
                    year: item.year,
                    quantity: item.quantity,
                    unit_cost: item.unit_cost,
                    location: item.location,
                })
            })
            .collect()
    }
}

#[derive(serde::Deserialize)]
struct ManualItem {
    name: String,
    producer: Option<String>,
    region: Option<String>,
    wine_type: Option<String>,
    year: i32,
    quantity: i64,
    unit_cost: Option<Decimal>,
    location: Option<String>,
}

/// Splits text by line and parses each line as
/// `name - producer - year - qty - unit_cost` with permissive whitespace.
/// Rejects lines that fail to yield a positive quantity and a 4-digit year.
pub struct PdfInvoiceParser;

fn parse_invoice_line(line: &str) -> Option<IntakeItem> {
    let parts: Vec<&str> = line.split('-').map(str::trim).filter(|p| !p.is_empty()).collect();
    if parts.len() < 5 {
        return None;
    }
    let name = parts[0].to_string();
    let producer = Some(parts[1].to_string());
    let year: i32 = parts[2].parse().ok()?;
    if !(1000..=9999).contains(&year) {
        return None;
    }
    let quantity: i64 = parts[3].parse().ok()?;
    if quantity <= 0 {
        return None;
    }
    let unit_cost = Decimal::from_str(parts[4]).ok();

    Some(IntakeItem {
        name,
        producer,
        region: None,
        wine_type: None,
        year,
        quantity,
        unit_cost,
        location: None,
    })
}

impl IntakeParser for PdfInvoiceParser {
    fn parse(&self, raw: &str) -> Result<Vec<IntakeItem>> {
        let items: Vec<IntakeItem> = raw.lines().filter(|l| !l.trim().is_empty()).filter_map(parse_invoice_line).collect();
        if items.is_empty() {
            return Err(CellarError::unprocessable("no valid invoice lines found"));
        }
        Ok(items)
    }
}

/// Same line format as `pdf_invoice`, but rejects the whole document with
/// `LowOCRConfidence` when `ocr_confidence < 0.5`.
pub struct ScannedDocumentParser {
    pub ocr_confidence: f64,
}

impl IntakeParser for ScannedDocumentParser {
    fn parse(&self, raw: &str) -> Result<Vec<IntakeItem>> {
        if self.ocr_confidence < 0.5 {
            return Err(CellarError::unprocessable("LowOCRConfidence"));
        }
        PdfInvoiceParser.parse(raw)
    }
}

/// Rows as `[name, year, qty, unit_cost, location, producer, region,
/// wine_type]`; `raw` is newline-separated, comma-delimited rows with
/// numeric coercion.
pub struct ExcelIntakeParser;

impl IntakeParser for ExcelIntakeParser {
    fn parse(&self, raw: &str) -> Result<Vec<IntakeItem>> {
        let mut items = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let cols: Vec<&str> = line.split(',').map(str::trim).collect();
            if cols.len() < 4 {
                return Err(CellarError::validation("excel row missing required columns"));
            }
            let name = cols[0].to_string();
            let year: i32 = cols[1]
                .parse()
                .map_err(|_| CellarError::validation(format!("invalid year in row: {line}")))?;
            let quantity: i64 = cols[2]
                .parse()
                .map_err(|_| CellarError::validation(format!("invalid quantity in row: {line}")))?;
            if quantity <= 0 {
                return Err(CellarError::validation(format!("quantity must be positive in row: {line}")));
            }
            let unit_cost = Decimal::from_str(cols[3]).ok();
            let location = cols.get(4).filter(|s| !s.is_empty()).map(|s| s.to_string());
            let producer = cols.get(5).filter(|s| !s.is_empty()).map(|s| s.to_string());
            let region = cols.get(6).filter(|s| !s.is_empty()).map(|s| s.to_string());
            let wine_type = cols.get(7).filter(|s| !s.is_empty()).map(|s| s.to_string());

            items.push(IntakeItem { name, producer, region, wine_type, year, quantity, unit_cost, location });
        }
        Ok(items)
    }
}

/// Dispatches to the appropriate parser by source type.
pub fn parse_intake(source_type: IntakeSourceType, raw: &str, ocr_confidence: Option<f64>) -> Result<Vec<IntakeItem>> {
    match source_type {
        IntakeSourceType::Manual => ManualIntakeParser.parse(raw),
        IntakeSourceType::PdfInvoice => PdfInvoiceParser.parse(raw),
        IntakeSourceType::ScannedDocument => ScannedDocumentParser {
            ocr_confidence: ocr_confidence.unwrap_or(0.0),
        }
        .parse(raw),
        IntakeSourceType::Excel => ExcelIntakeParser.parse(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_parses_a_valid_json_array() {
        let raw = r#"[{"name":"Cuvee","year":2015,"quantity":6,"unit_cost":"24.50"}]"#;
        let items = ManualIntakeParser.parse(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 6);
    }

    #[test]
    fn manual_rejects_non_positive_quantity() {
        let raw = r#"[{"name":"Cuvee","year":2015,"quantity":0}]"#;
        assert!(ManualIntakeParser.parse(raw).is_err());
    }

    #[test]
    fn pdf_invoice_parses_permissive_whitespace_lines() {
        let raw = "Cuvee Prestige -  Domaine Example  - 2015 -  6  - 24.50\nBad Line With No Dashes";
        let items = PdfInvoiceParser.parse(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].year, 2015);
        assert_eq!(items[0].quantity, 6);
    }

    #[test]
    fn pdf_invoice_rejects_entirely_unparseable_documents() {
        let raw = "not an invoice at all";
        assert!(PdfInvoiceParser.parse(raw).is_err());
    }

    #[test]
    fn scanned_document_rejects_low_ocr_confidence() {
        let parser = ScannedDocumentParser { ocr_confidence: 0.3 };
        let err = parser.parse("Cuvee - Domaine - 2015 - 6 - 24.50").unwrap_err();
        assert!(matches!(err, CellarError::Unprocessable(_)));
    }

    #[test]
    fn scanned_document_accepts_sufficient_confidence() {
        let parser = ScannedDocumentParser { ocr_confidence: 0.8 };
        let items = parser.parse("Cuvee - Domaine - 2015 - 6 - 24.50").unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn excel_coerces_numeric_columns() {
        let raw = "Cuvee,2015,6,24.50,main-cellar,Domaine Example,Bordeaux,Red";
        let items = ExcelIntakeParser.parse(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].year, 2015);
        assert_eq!(items[0].quantity, 6);
        assert_eq!(items[0].location.as_deref(), Some("main-cellar"));
    }

    #[test]
    fn excel_rejects_rows_missing_required_columns() {
        let raw = "Cuvee,2015";
        assert!(ExcelIntakeParser.parse(raw).is_err());
    }
}
