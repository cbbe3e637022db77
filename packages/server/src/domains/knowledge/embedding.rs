//! Hash-based task-summary embedding.
//!
//! Not a semantic embedding: a cheap, dependency-free stand-in with the
//! right shape (fixed length, unit norm) so a real encoder can drop in
//! without schema changes.

use sha2::{Digest, Sha256};

pub const EMBEDDING_DIMS: usize = 16;

/// Fixed-length normalized vector over the text.
pub fn simple_embedding(text: &str) -> Vec<f32> {
    let digest = Sha256::digest(text.as_bytes());
    let vec: Vec<f32> = digest[..EMBEDDING_DIMS]
        .iter()
        .map(|byte| *byte as f32 / 255.0)
        .collect();

    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm = if norm == 0.0 { 1.0 } else { norm };
    vec.into_iter().map(|v| v / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_has_fixed_dimensions() {
        assert_eq!(simple_embedding("remove the logo").len(), EMBEDDING_DIMS);
    }

    #[test]
    fn embedding_is_deterministic() {
        assert_eq!(
            simple_embedding("remove the logo"),
            simple_embedding("remove the logo")
        );
        assert_ne!(
            simple_embedding("remove the logo"),
            simple_embedding("replace the background")
        );
    }

    #[test]
    fn embedding_is_unit_norm() {
        let vec = simple_embedding("stylize the clip as anime");
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }
}
