use crate::embedding_provider::{normalize, DetectedFace, EmbeddingProvider};
use chrono::NaiveDateTime;
use common::AppError;
use db::{EnrollmentMode, Store};
use log::{info, warn};

/// One frame submitted for enrollment: raw bytes plus whatever the caller
/// already knows about it before it reaches the embedding provider.
pub struct Frame {
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct EnrollmentWeights {
    pub detection: f32,
    pub sharpness: f32,
    pub frontality: f32,
}

impl Default for EnrollmentWeights {
    fn default() -> Self {
        Self { detection: 0.5, sharpness: 0.3, frontality: 0.2 }
    }
}

#[derive(Debug, Clone)]
pub struct QualityGates {
    pub min_detection_score: f32,
    pub min_sharpness: f32,
    pub min_frontality: f32,
}

impl Default for QualityGates {
    fn default() -> Self {
        Self { min_detection_score: 0.5, min_sharpness: 0.3, min_frontality: 0.3 }
    }
}

#[derive(Debug)]
pub enum EnrollmentOutcome {
    Enrolled { embedding_count: usize },
    InsufficientQuality { survivors: usize, required: usize },
}

struct Scored {
    vector: Vec<f32>,
    score: f32,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Runs the enrollment pipeline end to end (§4.4): detect → quality-gate →
/// score → select top K, deduplicated → attach. Stateless aside from the
/// injected provider and Store; `k_min`/`k_max` and the weights/gates come
/// from the caller's current `Settings` snapshot.
pub async fn enroll(
    store: &Store,
    provider: &dyn EmbeddingProvider,
    student_id: i64,
    frames: &[Frame],
    mode: EnrollmentMode,
    k_min: usize,
    k_max: usize,
    weights: &EnrollmentWeights,
    gates: &QualityGates,
    now: NaiveDateTime,
) -> Result<EnrollmentOutcome, AppError> {
    let mut scored: Vec<Scored> = Vec::new();

    for frame in frames {
        let faces = provider.embed(&frame.bytes).await?;
        let face = match faces.len() {
            1 => &faces[0],
            0 => continue,
            _ => continue,
        };
        if !passes_gates(face, gates) {
            continue;
        }
        let score = weights.detection * face.detection_score
            + weights.sharpness * face.sharpness
            + weights.frontality * face.frontality;
        scored.push(Scored { vector: normalize(&face.vector), score });
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let mut selected: Vec<Scored> = Vec::new();
    for candidate in scored {
        if selected.len() >= k_max {
            break;
        }
        let is_duplicate = selected.iter().any(|kept| cosine(&kept.vector, &candidate.vector) > 0.995);
        if !is_duplicate {
            selected.push(candidate);
        }
    }

    if selected.len() < k_min {
        warn!(
            "enrollment for student {student_id} produced only {} of {k_min} required embeddings",
            selected.len()
        );
        return Ok(EnrollmentOutcome::InsufficientQuality { survivors: selected.len(), required: k_min });
    }

    let vectors: Vec<(Vec<f32>, f32)> = selected.into_iter().map(|s| (s.vector, s.score)).collect();
    let count = vectors.len();
    store.attach_embeddings(student_id, vectors, mode, now).await?;

    info!("enrolled student {student_id} with {count} embeddings");
    Ok(EnrollmentOutcome::Enrolled { embedding_count: count })
}

fn passes_gates(face: &DetectedFace, gates: &QualityGates) -> bool {
    face.detection_score >= gates.min_detection_score
        && face.sharpness >= gates.min_sharpness
        && face.frontality >= gates.min_frontality
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding_provider::StubEmbeddingProvider;
    use db::test_utils::setup_test_db;

    fn frame() -> Frame {
        Frame { bytes: vec![0u8; 4] }
    }

    #[tokio::test]
    async fn enrolls_when_enough_frames_survive() {
        let db_conn = setup_test_db().await;
        let store = Store::new(db_conn);
        let now = chrono::NaiveDate::from_ymd_opt(2026, 2, 2).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let student = store.create_student("ST12345678", "Jane", None, now).await.unwrap();

        let provider = StubEmbeddingProvider::one_face(vec![1.0, 0.0, 0.0]);
        let frames: Vec<Frame> = (0..6).map(|_| frame()).collect();

        let outcome = enroll(
            &store,
            &provider,
            student.id,
            &frames,
            EnrollmentMode::Append,
            5,
            15,
            &EnrollmentWeights::default(),
            &QualityGates::default(),
            now,
        )
        .await
        .unwrap();

        match outcome {
            EnrollmentOutcome::Enrolled { embedding_count } => assert_eq!(embedding_count, 1),
            other => panic!("expected Enrolled (deduped to 1), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn too_few_surviving_frames_is_insufficient_quality() {
        let db_conn = setup_test_db().await;
        let store = Store::new(db_conn);
        let now = chrono::NaiveDate::from_ymd_opt(2026, 2, 2).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let student = store.create_student("ST87654321", "No Face", None, now).await.unwrap();

        let provider = StubEmbeddingProvider::no_face();
        let frames: Vec<Frame> = (0..6).map(|_| frame()).collect();

        let outcome = enroll(
            &store,
            &provider,
            student.id,
            &frames,
            EnrollmentMode::Append,
            5,
            15,
            &EnrollmentWeights::default(),
            &QualityGates::default(),
            now,
        )
        .await
        .unwrap();

        assert!(matches!(outcome, EnrollmentOutcome::InsufficientQuality { survivors: 0, required: 5 }));
    }
}
