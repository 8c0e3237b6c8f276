use crate::embedding_provider::{normalize, EmbeddingProvider};
use crate::matcher::{self, Candidate};
use chrono::NaiveDateTime;
use common::{AppError, Clock};
use db::models::attendance;
use db::Store;
use log::info;
use std::time::Duration;

/// Typed result family for `recognize`/`mark` (§6, §7). Domain outcomes, not
/// errors — every variant is a valid, expected response.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizeResult {
    Marked { student_id: i64, status: attendance::Status, confidence: Option<f32>, session_id: i64 },
    ReEntry { student_id: i64, session_id: i64 },
    Intruder { student_id: i64, session_id: i64 },
    UnknownFace,
    NoActiveSession,
    NoFace,
    MultipleFaces,
    Timeout,
    AmbiguousSession,
    NoEnrolled,
    SessionClosed,
}

const RECOGNIZE_DEADLINE: Duration = Duration::from_secs(5);

/// Runs the full `recognize` pipeline (§4.7) against whichever single active
/// session matches `course_scope` (or the only active session, if there is
/// exactly one and no scope was given).
pub async fn recognize(
    store: &Store,
    clock: &dyn Clock,
    provider: &dyn EmbeddingProvider,
    confidence_threshold: f32,
    image: &[u8],
    course_scope: Option<i64>,
) -> Result<RecognizeResult, AppError> {
    let now = clock.now();

    let active_sessions = store.list_active_sessions(now).await?;
    let session = match select_session(&active_sessions, course_scope) {
        SessionSelection::None => return Ok(RecognizeResult::NoActiveSession),
        SessionSelection::Ambiguous => return Ok(RecognizeResult::AmbiguousSession),
        SessionSelection::One(session) => session,
    };

    let faces = match tokio::time::timeout(RECOGNIZE_DEADLINE, provider.embed(image)).await {
        Ok(result) => result?,
        Err(_) => return Ok(RecognizeResult::Timeout),
    };

    if faces.is_empty() {
        return Ok(RecognizeResult::NoFace);
    }
    if faces.len() > 1 {
        return Ok(RecognizeResult::MultipleFaces);
    }
    let query = normalize(&faces[0].vector);

    let enrolled = store.enrolled_students_with_embeddings(session.course_id).await?;
    let candidates: Vec<Candidate> = enrolled
        .iter()
        .flat_map(|(student, embeddings)| {
            embeddings.iter().map(move |e| Candidate {
                student_id: student.id,
                embedding_id: e.id,
                vector: e.vector(),
            })
        })
        .collect();

    if candidates.is_empty() {
        return Ok(RecognizeResult::NoEnrolled);
    }

    let matched = match matcher::best_match(&query, &candidates, confidence_threshold) {
        Some(m) if m.is_match => m,
        _ => return Ok(RecognizeResult::UnknownFace),
    };

    let confidence = Some(matched.similarity);
    commit(store, now, session.id, matched.student_id, true, confidence, attendance::Method::Auto).await
}

/// Manual `mark` endpoint (§4.7 final paragraph): identical uniqueness and
/// enrollment checks as `recognize`, but the caller supplies `student_id`
/// directly — no embedding/matcher step.
pub async fn mark(
    store: &Store,
    clock: &dyn Clock,
    session_id: i64,
    student_id: i64,
) -> Result<RecognizeResult, AppError> {
    let now = clock.now();
    let session = store
        .find_session(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;

    let enrolled = store.is_enrolled(student_id, session.course_id).await?;
    commit(store, now, session_id, student_id, enrolled, None, attendance::Method::Manual).await
}

async fn commit(
    store: &Store,
    now: NaiveDateTime,
    session_id: i64,
    student_id: i64,
    enrolled: bool,
    confidence: Option<f32>,
    method: attendance::Method,
) -> Result<RecognizeResult, AppError> {
    use db::store::AttendanceOutcome;

    let outcome = store.commit_recognition(now, session_id, student_id, enrolled, confidence, method).await?;
    Ok(match outcome {
        AttendanceOutcome::Marked(row) => {
            info!("marked student {student_id} {:?} for session {session_id}", row.status);
            RecognizeResult::Marked { student_id, status: row.status, confidence: row.confidence, session_id }
        }
        AttendanceOutcome::ReEntry(_) => RecognizeResult::ReEntry { student_id, session_id },
        AttendanceOutcome::Intruder(_) => RecognizeResult::Intruder { student_id, session_id },
        AttendanceOutcome::SessionClosed => RecognizeResult::SessionClosed,
    })
}

enum SessionSelection<'a> {
    None,
    One(&'a db::models::session::Model),
    Ambiguous,
}

fn select_session(sessions: &[db::models::session::Model], course_scope: Option<i64>) -> SessionSelection<'_> {
    if let Some(course_id) = course_scope {
        return match sessions.iter().find(|s| s.course_id == course_id) {
            Some(session) => SessionSelection::One(session),
            None => SessionSelection::None,
        };
    }

    match sessions.len() {
        0 => SessionSelection::None,
        1 => SessionSelection::One(&sessions[0]),
        _ => SessionSelection::Ambiguous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding_provider::StubEmbeddingProvider;
    use common::FixedClock;
    use db::test_utils::setup_test_db;

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 2, 6).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    async fn setup() -> (Store, db::models::course::Model, db::models::session::Model) {
        let store = Store::new(setup_test_db().await);
        let now = dt(8, 0);
        let course = store.create_course("COS301", "SE", None, now).await.unwrap();
        let session = store
            .create_manual_session(course.id, None, now, dt(11, 0), 5, 5, now)
            .await
            .unwrap();
        store.activate_session(session.id).await.unwrap();
        (store, course, session)
    }

    #[tokio::test]
    async fn no_active_session_short_circuits() {
        let store = Store::new(setup_test_db().await);
        let clock = FixedClock::new(dt(8, 0));
        let provider = StubEmbeddingProvider::no_face();
        let result = recognize(&store, &clock, &provider, 0.6, &[], None).await.unwrap();
        assert_eq!(result, RecognizeResult::NoActiveSession);
    }

    #[tokio::test]
    async fn recognized_enrolled_student_is_marked_present() {
        let (store, course, session) = setup().await;
        let now = dt(10, 2);
        let student = store.create_student("ST11111111", "A", None, now).await.unwrap();
        store.create_enrollment(student.id, course.id, now).await.unwrap();
        store
            .attach_embeddings(student.id, vec![(vec![1.0, 0.0], 0.9)], db::EnrollmentMode::Append, now)
            .await
            .unwrap();

        let clock = FixedClock::new(now);
        let provider = StubEmbeddingProvider::one_face(vec![1.0, 0.0]);
        let result = recognize(&store, &clock, &provider, 0.6, &[], None).await.unwrap();

        match result {
            RecognizeResult::Marked { student_id, status, session_id, .. } => {
                assert_eq!(student_id, student.id);
                assert_eq!(status, attendance::Status::Present);
                assert_eq!(session_id, session.id);
            }
            other => panic!("expected Marked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn manual_mark_on_already_attended_student_degrades_to_reentry() {
        let (store, course, session) = setup().await;
        let now = dt(10, 2);
        let student = store.create_student("ST22222222", "B", None, now).await.unwrap();
        store.create_enrollment(student.id, course.id, now).await.unwrap();

        let clock = FixedClock::new(now);
        let first = mark(&store, &clock, session.id, student.id).await.unwrap();
        assert!(matches!(first, RecognizeResult::Marked { .. }));

        let clock2 = FixedClock::new(dt(10, 20));
        let second = mark(&store, &clock2, session.id, student.id).await.unwrap();
        assert_eq!(second, RecognizeResult::ReEntry { student_id: student.id, session_id: session.id });
    }
}
