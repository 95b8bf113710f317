//! Template vintage summary generation (§4.4 step 5).

use crate::domain::WeatherAnalysis;

fn gdd_tier(gdd: f64) -> &'static str {
    if gdd < 1200.0 {
        "cooler conditions"
    } else if gdd <= 1600.0 {
        "an ideal growing window"
    } else {
        "a warm season"
    }
}

fn diurnal_note(range: f64) -> Option<&'static str> {
    if range > 12.0 {
        Some("wide day-night temperature swings helped preserve acidity and aromatic complexity")
    } else if range < 8.0 {
        Some("narrow day-night temperature swings favored early ripening over structure")
    } else {
        None
    }
}

fn advice_tier(overall_score: f64) -> &'static str {
    if overall_score >= 85.0 {
        "built for extended cellaring"
    } else if overall_score >= 70.0 {
        "best suited to near-term drinking pleasure"
    } else {
        "approachable now"
    }
}

/// Produces a short, human-readable summary of the growing season,
/// parametrized by GDD, diurnal range, overall score, producer, and vintage.
pub fn generate_summary(analysis: &WeatherAnalysis, producer: &str, year: i32) -> String {
    let mut summary = format!(
        "{year} brought {} for {producer} ({:.0} GDD), {}",
        gdd_tier(analysis.gdd),
        analysis.gdd,
        advice_tier(analysis.overall_score)
    );

    if let Some(note) = diurnal_note(analysis.diurnal_range_avg_c) {
        summary.push_str(&format!("; {note}"));
    }

    if analysis.heatwave_days > 5 {
        summary.push_str(&format!(
            ", tempered by {} notable heatwave days",
            analysis.heatwave_days
        ));
    }
    if analysis.frost_days > 0 {
        summary.push_str(&format!(
            " and {} frost day{} during the season",
            analysis.frost_days,
            if analysis.frost_days == 1 { "" } else { "s" }
        ));
    }

    summary.push('.');
    summary
}
