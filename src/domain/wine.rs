use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wine type, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum WineType {
    Red,
    White,
    #[serde(rename = "Rosé")]
    Rose,
    Sparkling,
    Dessert,
    Fortified,
    Other,
}

impl WineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WineType::Red => "Red",
            WineType::White => "White",
            WineType::Rose => "Rosé",
            WineType::Sparkling => "Sparkling",
            WineType::Dessert => "Dessert",
            WineType::Fortified => "Fortified",
            WineType::Other => "Other",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "red" => WineType::Red,
            "white" => WineType::White,
            "rose" | "rosé" => WineType::Rose,
            "sparkling" | "champagne" => WineType::Sparkling,
            "dessert" => WineType::Dessert,
            "fortified" => WineType::Fortified,
            _ => WineType::Other,
        }
    }
}

/// A wine identity, immutable after creation except by admin edit (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wine {
    pub id: Uuid,
    pub name: String,
    pub producer: String,
    pub region: String,
    pub country: String,
    pub wine_type: WineType,
    pub grape_varieties: Vec<String>,
    pub style: Option<String>,
    pub tasting_notes: Option<String>,
    pub storage_hints: Option<String>,
}

/// An alternate name attached to a [`Wine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WineAlias {
    pub wine_id: Uuid,
    pub alias: String,
}

impl Wine {
    pub fn new(
        name: impl Into<String>,
        producer: impl Into<String>,
        region: impl Into<String>,
        country: impl Into<String>,
        wine_type: WineType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            producer: producer.into(),
            region: region.into(),
            country: country.into(),
            wine_type,
            grape_varieties: Vec::new(),
            style: None,
            tasting_notes: None,
            storage_hints: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_aliases_case_insensitively() {
        assert_eq!(WineType::parse("RED"), WineType::Red);
        assert_eq!(WineType::parse("rosé"), WineType::Rose);
        assert_eq!(WineType::parse("champagne"), WineType::Sparkling);
        assert_eq!(WineType::parse("something-else"), WineType::Other);
    }
}
