//! Deterministic entity bucketing
//!
//! Buckets are derived from a SHA-256 digest so the same entity lands in the
//! same bucket on every platform and every release.

use sha2::{Digest, Sha256};

/// Number of buckets variant distributions are spread across
pub const TOTAL_BUCKETS: u32 = 1000;

/// Scale from a percentage to a bucket count
const PERCENT_MULTIPLIER: f32 = TOTAL_BUCKETS as f32 / 100.0;

fn digest_u32(parts: &[&str]) -> u32 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Bucket in `0..TOTAL_BUCKETS` used to pick a variant
pub fn variant_bucket(flag_key: &str, entity_id: &str) -> u32 {
    digest_u32(&[flag_key, entity_id]) % TOTAL_BUCKETS
}

/// Value in `0..100` compared against threshold rollouts
pub fn threshold_value(entity_id: &str, flag_key: &str) -> f32 {
    (digest_u32(&[entity_id, flag_key]) % 100) as f32
}

/// Cumulative upper bounds for a list of percentages
pub fn cumulative_bounds(rollouts: impl IntoIterator<Item = f32>) -> Vec<u32> {
    let mut total = 0u32;
    rollouts
        .into_iter()
        .map(|rollout| {
            total += (rollout * PERCENT_MULTIPLIER) as u32;
            total
        })
        .collect()
}

/// Index of the first bound strictly above `bucket`
pub fn select(bounds: &[u32], bucket: u32) -> Option<usize> {
    let idx = bounds.partition_point(|bound| *bound <= bucket);
    (idx < bounds.len()).then_some(idx)
}
