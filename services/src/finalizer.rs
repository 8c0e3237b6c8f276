use chrono::NaiveDateTime;
use common::AppError;
use db::store::FinalizeOutcome;
use db::Store;

/// Thin wrapper over `Store::finalize_session` (§4.8): the transactional
/// logic itself lives on the Store since it is a single-transaction
/// Store-owned operation, but this is the entry point the scheduler and any
/// manual "finalize now" admin action call.
pub async fn finalize(store: &Store, session_id: i64, now: NaiveDateTime) -> Result<FinalizeOutcome, AppError> {
    store.finalize_session(session_id, now).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::test_utils::setup_test_db;

    fn dt(h: u32, m: u32) -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2026, 2, 6).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn finalizing_twice_is_a_no_op_the_second_time() {
        let store = Store::new(setup_test_db().await);
        let now = dt(8, 0);
        let course = store.create_course("COS301", "SE", None, now).await.unwrap();
        let student = store.create_student("ST11111111", "A", None, now).await.unwrap();
        store.create_enrollment(student.id, course.id, now).await.unwrap();
        let session = store.create_manual_session(course.id, None, now, dt(9, 0), 5, 5, now).await.unwrap();
        store.activate_session(session.id).await.unwrap();

        let first = finalize(&store, session.id, dt(8, 10)).await.unwrap();
        assert!(matches!(first, FinalizeOutcome::Finalized { absent_count: 1 }));

        let second = finalize(&store, session.id, dt(8, 11)).await.unwrap();
        assert!(matches!(second, FinalizeOutcome::AlreadyFinal));
    }
}
