//! Deterministic character-trigram embedder.
//!
//! Hashes each character trigram into a fixed-size bucket vector and
//! L2-normalizes the counts. Texts sharing surface vocabulary land close in
//! the vector space, which is enough for offline indexing and tests; the
//! production embedding service is a drop-in replacement behind the same
//! trait.

use async_trait::async_trait;

use inci_core::{Embedder, Result};

/// Trigram-hash embedder with a fixed dimensionality.
pub struct TrigramEmbedder {
    dimension: usize,
}

impl TrigramEmbedder {
    /// Create an embedder with the default dimensionality.
    pub fn new() -> Self {
        Self { dimension: 384 }
    }

    /// Create an embedder with a custom dimensionality.
    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, trigram: &[char; 3]) -> usize {
        let mut hash = 0xcbf2_9ce4_8422_2325u64; // FNV-1a
        for c in trigram {
            for b in (*c as u32).to_le_bytes() {
                hash ^= b as u64;
                hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            }
        }
        (hash % self.dimension as u64) as usize
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let chars: Vec<char> = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();

        for window in chars.windows(3) {
            let trigram = [window[0], window[1], window[2]];
            vector[self.bucket(&trigram)] += 1.0;
        }
        // Short texts still get a signal from single characters.
        if chars.len() < 3 {
            for c in &chars {
                vector[self.bucket(&[*c, *c, *c])] += 1.0;
            }
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        vector
    }
}

impl Default for TrigramEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for TrigramEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = TrigramEmbedder::new();
        let a = embedder.embed("sodium hyaluronate").await.unwrap();
        let b = embedder.embed("sodium hyaluronate").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_normalized() {
        let embedder = TrigramEmbedder::new();
        let v = embedder.embed("deep hydration for dry skin").await.unwrap();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
        assert_eq!(v.len(), 384);
    }

    #[tokio::test]
    async fn test_similar_texts_closer_than_unrelated() {
        let embedder = TrigramEmbedder::new();
        let a = embedder.embed("hydrating humectant for skin").await.unwrap();
        let b = embedder.embed("deep hydrating humectant").await.unwrap();
        let c = embedder.embed("UV filter sunscreen agent").await.unwrap();

        assert!(cosine(&a, &b) > cosine(&a, &c));
    }

    #[tokio::test]
    async fn test_thai_text_embeds() {
        let embedder = TrigramEmbedder::new();
        let a = embedder.embed("ให้ความชุ่มชื่น").await.unwrap();
        let b = embedder.embed("ชุ่มชื่นผิว").await.unwrap();
        let c = embedder.embed("completely unrelated latin").await.unwrap();

        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
        assert!(cosine(&a, &b) > cosine(&a, &c));
    }

    #[tokio::test]
    async fn test_empty_text_zero_vector() {
        let embedder = TrigramEmbedder::new();
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
