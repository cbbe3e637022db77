//! Stable Bernoulli sampling keyed on the job id.
//!
//! The draw must be idempotent across retries and reruns: the first 8 bytes
//! of SHA-256(key), read as an unsigned big-endian integer and scaled into
//! [0, 1), are compared against the ratio.

use sha2::{Digest, Sha256};

/// Deterministic per-key sample. `ratio <= 0` never samples, `ratio >= 1`
/// always does.
pub fn stable_sample(key: &str, ratio: f64) -> bool {
    let bounded = ratio.clamp(0.0, 1.0);
    if bounded <= 0.0 {
        return false;
    }
    if bounded >= 1.0 {
        return true;
    }

    let digest = Sha256::digest(key.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let sample = u64::from_be_bytes(prefix) as f64 / 2f64.powi(64);

    sample < bounded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_key_always_draws_the_same_result() {
        for i in 0..50 {
            let key = format!("job-{i}");
            let first = stable_sample(&key, 0.2);
            for _ in 0..10 {
                assert_eq!(stable_sample(&key, 0.2), first);
            }
        }
    }

    #[test]
    fn zero_ratio_never_samples() {
        for i in 0..100 {
            assert!(!stable_sample(&format!("job-{i}"), 0.0));
        }
    }

    #[test]
    fn full_ratio_always_samples() {
        for i in 0..100 {
            assert!(stable_sample(&format!("job-{i}"), 1.0));
        }
    }

    #[test]
    fn out_of_range_ratios_are_clamped() {
        assert!(!stable_sample("job-a", -0.5));
        assert!(stable_sample("job-a", 1.5));
    }

    #[test]
    fn higher_ratio_is_a_superset_of_lower() {
        for i in 0..200 {
            let key = format!("job-{i}");
            if stable_sample(&key, 0.1) {
                assert!(stable_sample(&key, 0.5));
            }
        }
    }
}
