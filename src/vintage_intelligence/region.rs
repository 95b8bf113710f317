//! Region alias normalization (§4.4 step 1).

/// Canonical token table of common alternate spellings. Unknown regions
/// pass through lowercased.
const ALIASES: &[(&[&str], &str)] = &[
    (&["burgundy", "bourgogne"], "burgundy"),
    (&["bordeaux"], "bordeaux"),
    (&["napa", "napa valley"], "napa"),
    (&["rhone", "rhône", "cotes du rhone", "côtes du rhône"], "rhone"),
    (&["tuscany", "toscana"], "tuscany"),
    (&["piedmont", "piemonte"], "piedmont"),
    (&["champagne"], "champagne"),
];

pub fn normalize_region(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    for (aliases, canonical) in ALIASES {
        if aliases.contains(&lower.as_str()) {
            return canonical.to_string();
        }
    }
    lower
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_aliases_to_a_canonical_token() {
        assert_eq!(normalize_region("Bourgogne"), "burgundy");
        assert_eq!(normalize_region("Napa Valley"), "napa");
        assert_eq!(normalize_region("Côtes du Rhône"), "rhone");
        assert_eq!(normalize_region("Toscana"), "tuscany");
    }

    #[test]
    fn passes_through_unknown_regions_lowercased() {
        assert_eq!(normalize_region("Willamette Valley"), "willamette valley");
    }
}
