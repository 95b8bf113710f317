//! Dish input normalization (§4.7 step 1): accepts either a structured
//! object or free text, and always produces a normalized [`Dish`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    pub cuisine: Option<String>,
    pub preparation: Option<String>,
    pub intensity: Option<String>,
    pub dominant_flavors: Vec<String>,
    pub texture: Option<String>,
    pub season: Option<String>,
}

const INTENSITY_WORDS: &[(&str, &str)] = &[
    ("grilled", "bold"),
    ("seared", "bold"),
    ("braised", "bold"),
    ("smoked", "bold"),
    ("roasted", "rich"),
    ("creamy", "rich"),
    ("steamed", "light"),
    ("raw", "light"),
    ("poached", "light"),
];

const FLAVOR_WORDS: &[&str] = &[
    "spicy", "sweet", "smoky", "citrus", "herbal", "buttery", "umami", "tangy", "earthy", "peppery",
];

const TEXTURE_WORDS: &[&str] = &["crispy", "creamy", "tender", "flaky", "chewy", "silky"];

const SEASON_WORDS: &[&str] = &["spring", "summer", "autumn", "fall", "winter"];

/// Heuristic, deterministic free-text parse into the structured dish form.
pub fn parse_free_text(text: &str) -> Dish {
    let lower = text.to_lowercase();

    let intensity = INTENSITY_WORDS
        .iter()
        .find(|(word, _)| lower.contains(word))
        .map(|(_, tier)| tier.to_string());

    let dominant_flavors: Vec<String> = FLAVOR_WORDS
        .iter()
        .filter(|word| lower.contains(*word))
        .map(|s| s.to_string())
        .collect();

    let texture = TEXTURE_WORDS.iter().find(|word| lower.contains(**word)).map(|s| s.to_string());
    let season = SEASON_WORDS.iter().find(|word| lower.contains(**word)).map(|s| s.to_string());

    Dish {
        name: text.trim().to_string(),
        cuisine: None,
        preparation: INTENSITY_WORDS
            .iter()
            .find(|(word, _)| lower.contains(word))
            .map(|(word, _)| word.to_string()),
        intensity,
        dominant_flavors,
        texture,
        season,
    }
}

/// Validates and normalizes a dish name; fails `DishRequired` equivalent on
/// empty/whitespace-only input (§4.7 step 1).
pub fn require_dish_name(name: &str) -> crate::error::Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::error::CellarError::validation("dish is required"));
    }
    Ok(trimmed.to_string())
}
