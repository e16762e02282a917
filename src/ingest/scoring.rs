//! Ranking helpers for candidate items.
//!
//! Every fetcher ranks its pool with the same shape:
//! `composite = w_freshness * freshness + w_popularity * popularity`,
//! both inputs normalized to [0,1]. Weights differ slightly per source.

use chrono::{DateTime, Utc};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Horizon used for freshness when the caller gives no `max_age_days`.
pub const DEFAULT_FRESHNESS_HORIZON_DAYS: u32 = 7;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreWeights {
    pub w_freshness: f64,
    pub w_popularity: f64,
}

impl ScoreWeights {
    pub const fn new(w_freshness: f64, w_popularity: f64) -> Self {
        Self {
            w_freshness,
            w_popularity,
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::new(0.6, 0.4)
    }
}

/// Fractional age in days; future timestamps count as age 0.
pub fn age_days(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let ms = now.signed_duration_since(published_at).num_milliseconds();
    (ms.max(0) as f64) / MS_PER_DAY
}

/// `max(0, 1 - ageDays / horizon)`. Items without a date are treated as fresh.
pub fn freshness(
    published_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    max_age_days: Option<u32>,
) -> f64 {
    let Some(ts) = published_at else {
        return 1.0;
    };
    let horizon = max_age_days
        .unwrap_or(DEFAULT_FRESHNESS_HORIZON_DAYS)
        .max(1) as f64;
    (1.0 - age_days(ts, now) / horizon).max(0.0)
}

/// `min(1, value / saturation)`, e.g. reactions saturating at 50.
pub fn saturating_ratio(value: f64, saturation: f64) -> f64 {
    if saturation <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    (value / saturation).clamp(0.0, 1.0)
}

/// Weighted composite. Divides by the weight sum so odd weights still land in [0,1].
pub fn composite(freshness: f64, popularity: f64, w: &ScoreWeights) -> f64 {
    let raw = freshness.clamp(0.0, 1.0) * w.w_freshness
        + popularity.clamp(0.0, 1.0) * w.w_popularity;
    let denom = (w.w_freshness + w.w_popularity).max(1e-9);
    (raw / denom).clamp(0.0, 1.0)
}
