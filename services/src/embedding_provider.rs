use async_trait::async_trait;
use common::AppError;

/// One face detected in a frame, with its raw (not yet unit-normalized)
/// embedding vector (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedFace {
    pub bbox: (f32, f32, f32, f32),
    pub vector: Vec<f32>,
    pub detection_score: f32,
    pub sharpness: f32,
    pub frontality: f32,
}

/// The external vision model boundary. The core only ever holds a handle to
/// this trait object; it never loads or owns model weights itself (§5).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, image: &[u8]) -> Result<Vec<DetectedFace>, AppError>;
}

/// Test/dev implementation that returns a pre-programmed response instead of
/// running real inference, so the rest of the pipeline can be exercised
/// deterministically (§4.3).
pub struct StubEmbeddingProvider {
    response: Vec<DetectedFace>,
}

impl StubEmbeddingProvider {
    pub fn new(response: Vec<DetectedFace>) -> Self {
        Self { response }
    }

    pub fn one_face(vector: Vec<f32>) -> Self {
        Self::new(vec![DetectedFace {
            bbox: (0.0, 0.0, 1.0, 1.0),
            vector,
            detection_score: 0.99,
            sharpness: 0.9,
            frontality: 0.9,
        }])
    }

    pub fn no_face() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, _image: &[u8]) -> Result<Vec<DetectedFace>, AppError> {
        Ok(self.response.clone())
    }
}

/// Unit-normalizes a vector in place; panics only on a genuinely
/// zero-length vector, which the provider contract (§4.3) rules out.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    debug_assert!(norm.is_finite() && norm > 0.0, "embedding provider returned a degenerate vector");
    if norm <= f32::EPSILON {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_length() {
        let v = normalize(&[3.0, 4.0]);
        let len = (v[0] * v[0] + v[1] * v[1]).sqrt();
        assert!((len - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn stub_provider_returns_programmed_faces() {
        let provider = StubEmbeddingProvider::one_face(vec![1.0, 0.0]);
        let faces = provider.embed(&[]).await.unwrap();
        assert_eq!(faces.len(), 1);

        let empty = StubEmbeddingProvider::no_face();
        assert!(empty.embed(&[]).await.unwrap().is_empty());
    }
}
