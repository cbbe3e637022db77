//! Distribution and stability properties of the review spot-check sampler.

use server_core::domains::qa::stable_sample;

fn empirical_rate(ratio: f64, n: usize) -> f64 {
    let sampled = (0..n)
        .filter(|i| stable_sample(&format!("job-{i}"), ratio))
        .count();
    sampled as f64 / n as f64
}

#[test]
fn empirical_rate_tracks_the_ratio_within_two_points() {
    for ratio in [0.1, 0.2, 0.5] {
        let rate = empirical_rate(ratio, 10_000);
        assert!(
            (rate - ratio).abs() <= 0.02,
            "ratio {ratio}: empirical rate {rate} off by more than 2 percentage points"
        );
    }
}

#[test]
fn every_key_is_stable_across_repeated_draws() {
    for i in 0..1_000 {
        let key = format!("job-{i}");
        let first = stable_sample(&key, 0.2);
        assert_eq!(stable_sample(&key, 0.2), first);
        assert_eq!(stable_sample(&key, 0.2), first);
    }
}

#[test]
fn boundary_ratios_are_exact() {
    for i in 0..1_000 {
        let key = format!("job-{i}");
        assert!(!stable_sample(&key, 0.0));
        assert!(stable_sample(&key, 1.0));
    }
}
