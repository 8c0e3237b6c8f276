/// One candidate embedding in the matcher's search space: a student id, an
/// embedding id (for tie-breaking), and the stored unit-normalized vector.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub student_id: i64,
    pub embedding_id: i64,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub student_id: i64,
    pub similarity: f32,
    pub is_match: bool,
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "embedding dimensionality mismatch");
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Pure, deterministic, zero-state: no Store access, so it is trivially
/// unit-testable against hand-built vectors (§4.5). `query` must already be
/// unit-normalized, as must every candidate vector.
pub fn best_match(query: &[f32], candidates: &[Candidate], threshold: f32) -> Option<MatchResult> {
    let mut best: Option<(i64, f32, i64)> = None; // (student_id, similarity, embedding_id)

    for candidate in candidates {
        let similarity = cosine_similarity(query, &candidate.vector);
        best = match best {
            None => Some((candidate.student_id, similarity, candidate.embedding_id)),
            Some((_, best_sim, best_embedding_id)) => {
                if similarity > best_sim + 1e-6 {
                    Some((candidate.student_id, similarity, candidate.embedding_id))
                } else if (similarity - best_sim).abs() <= 1e-6 && candidate.embedding_id < best_embedding_id {
                    Some((candidate.student_id, similarity, candidate.embedding_id))
                } else {
                    best
                }
            }
        };
    }

    best.map(|(student_id, similarity, _)| MatchResult {
        student_id,
        similarity,
        is_match: similarity >= threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(student_id: i64, embedding_id: i64, vector: Vec<f32>) -> Candidate {
        Candidate { student_id, embedding_id, vector }
    }

    #[test]
    fn no_candidates_is_no_match() {
        assert!(best_match(&[1.0, 0.0], &[], 0.6).is_none());
    }

    #[test]
    fn picks_highest_similarity_student() {
        let candidates = vec![
            candidate(1, 1, vec![0.0, 1.0]),
            candidate(2, 2, vec![1.0, 0.0]),
        ];
        let result = best_match(&[0.9, 0.1], &candidates, 0.6).unwrap();
        assert_eq!(result.student_id, 2);
        assert!(result.is_match);
    }

    #[test]
    fn below_threshold_is_not_a_match_but_still_reports_best() {
        let candidates = vec![candidate(1, 1, vec![0.0, 1.0])];
        let result = best_match(&[1.0, 0.0], &candidates, 0.6).unwrap();
        assert!(!result.is_match);
        assert_eq!(result.student_id, 1);
    }

    #[test]
    fn a_student_is_scored_by_their_best_embedding() {
        let candidates = vec![
            candidate(1, 1, vec![0.0, 1.0]),
            candidate(1, 2, vec![1.0, 0.0]),
            candidate(2, 3, vec![0.7071, 0.7071]),
        ];
        let result = best_match(&[1.0, 0.0], &candidates, 0.6).unwrap();
        assert_eq!(result.student_id, 1);
        assert!((result.similarity - 1.0).abs() < 1e-3);
    }

    #[test]
    fn ties_within_epsilon_favor_smaller_embedding_id() {
        let candidates = vec![
            candidate(1, 5, vec![0.6, 0.8]),
            candidate(2, 2, vec![0.6, 0.8]),
        ];
        let result = best_match(&[0.6, 0.8], &candidates, 0.6).unwrap();
        assert_eq!(result.student_id, 2);
    }
}
