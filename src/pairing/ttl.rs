//! Pairing response cache TTL policy (§4.2 "Fingerprint keys", §8 "TTL
//! rules"): the narrowest applicable rule wins.

use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 24 * 3600;
const AI_TTL_SECS: u64 = 12 * 3600;
const SPECIAL_OCCASION_TTL_SECS: u64 = 6 * 3600;
const HIGH_DIETARY_RESTRICTIONS_TTL_SECS: u64 = 4 * 3600;
const SEASONAL_CONTEXT_TTL_SECS: u64 = 8 * 3600;

#[derive(Debug, Clone, Copy, Default)]
pub struct TtlInputs {
    pub ai_enhanced: bool,
    pub special_occasion: bool,
    pub dietary_restriction_count: usize,
    pub seasonal_context: bool,
}

/// The applicable TTLs compound via minimum: AI-generated responses cap at
/// 12h, a flagged special occasion at 6h, 3+ dietary restrictions at 4h,
/// seasonal context at 8h; otherwise the default is 24h.
pub fn resolve_ttl(inputs: TtlInputs) -> Duration {
    let mut ttl_secs = DEFAULT_TTL_SECS;
    if inputs.ai_enhanced {
        ttl_secs = ttl_secs.min(AI_TTL_SECS);
    }
    if inputs.special_occasion {
        ttl_secs = ttl_secs.min(SPECIAL_OCCASION_TTL_SECS);
    }
    if inputs.dietary_restriction_count >= 3 {
        ttl_secs = ttl_secs.min(HIGH_DIETARY_RESTRICTIONS_TTL_SECS);
    }
    if inputs.seasonal_context {
        ttl_secs = ttl_secs.min(SEASONAL_CONTEXT_TTL_SECS);
    }
    Duration::from_secs(ttl_secs)
}
