use crate::models::{attendance, course, embedding, enrollment, reentry_event, session, setting, student, timetable_slot};
use crate::settings::Settings;
use chrono::{NaiveDate, NaiveDateTime};
use common::AppError;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionError,
    TransactionTrait,
};
use std::collections::HashMap;

fn flatten(err: TransactionError<AppError>) -> AppError {
    match err {
        TransactionError::Connection(db_err) => AppError::from(db_err),
        TransactionError::Transaction(app_err) => app_err,
    }
}

/// Whether newly-enrolled embeddings replace or append to a student's
/// existing set (§4.4 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentMode {
    Append,
    Replace,
}

/// Outcome of committing a single recognition/mark attempt (§4.7 step 7),
/// computed inside one transaction against the Store.
#[derive(Debug, Clone)]
pub enum AttendanceOutcome {
    Marked(attendance::Model),
    ReEntry(attendance::Model),
    Intruder(attendance::Model),
    /// The session was re-read inside the transaction and was no longer
    /// ACTIVE — the Finalizer won the race (§5).
    SessionClosed,
}

/// Outcome of running the Finalizer against one session (§4.8).
#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    /// Already COMPLETED/CANCELLED; no rows were touched (P3).
    AlreadyFinal,
    Finalized { absent_count: usize },
}

/// Owns the single `DatabaseConnection` and is the only thing that talks to
/// it — all mutations in the engine flow through here (§3 Ownership, §4.2).
/// Injected into every service rather than reached through global state.
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // ---------------------------------------------------------------
    // Students
    // ---------------------------------------------------------------

    pub async fn create_student(
        &self,
        external_id: &str,
        name: &str,
        department: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<student::Model, AppError> {
        let pattern = Regex::new(student::default_external_id_pattern()).expect("valid regex");
        if !pattern.is_match(external_id) {
            return Err(AppError::InvalidIdFormat(external_id.to_string()));
        }

        let active = student::ActiveModel {
            external_id: Set(external_id.to_string()),
            name: Set(name.to_string()),
            department: Set(department.map(str::to_string)),
            status: Set(student::Status::Active),
            deleted_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        };
        active.insert(&self.db).await.map_err(AppError::from)
    }

    pub async fn find_student(&self, id: i64) -> Result<Option<student::Model>, AppError> {
        student::Entity::find_by_id(id)
            .filter(student::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(AppError::from)
    }

    pub async fn find_student_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<student::Model>, AppError> {
        student::Entity::find()
            .filter(student::Column::ExternalId.eq(external_id))
            .filter(student::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .map_err(AppError::from)
    }

    pub async fn soft_delete_student(
        &self,
        id: i64,
        now: NaiveDateTime,
    ) -> Result<(), AppError> {
        self.db
            .transaction::<_, (), AppError>(|txn| {
                Box::pin(async move {
                    let mut active = student::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| AppError::NotFound(format!("student {id}")))?
                        .into_active_model();
                    active.deleted_at = Set(Some(now));
                    active.update(txn).await?;

                    let embeddings = embedding::Entity::find()
                        .filter(embedding::Column::StudentId.eq(id))
                        .filter(embedding::Column::DeletedAt.is_null())
                        .all(txn)
                        .await?;
                    for e in embeddings {
                        let mut e = e.into_active_model();
                        e.deleted_at = Set(Some(now));
                        e.update(txn).await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(flatten)
    }

    // ---------------------------------------------------------------
    // Embeddings
    // ---------------------------------------------------------------

    pub async fn student_embeddings(&self, student_id: i64) -> Result<Vec<embedding::Model>, AppError> {
        embedding::Entity::find()
            .filter(embedding::Column::StudentId.eq(student_id))
            .filter(embedding::Column::DeletedAt.is_null())
            .order_by_asc(embedding::Column::Id)
            .all(&self.db)
            .await
            .map_err(AppError::from)
    }

    /// Attaches the given `(vector, quality_score)` pairs to the student as
    /// new embeddings. In `Replace` mode, existing embeddings are
    /// soft-deleted first so history is preserved but matching only sees the
    /// fresh set (§4.4 step 5). Runs as one transaction.
    pub async fn attach_embeddings(
        &self,
        student_id: i64,
        vectors: Vec<(Vec<f32>, f32)>,
        mode: EnrollmentMode,
        now: NaiveDateTime,
    ) -> Result<Vec<embedding::Model>, AppError> {
        self.db
            .transaction::<_, Vec<embedding::Model>, AppError>(|txn| {
                Box::pin(async move {
                    if mode == EnrollmentMode::Replace {
                        let existing = embedding::Entity::find()
                            .filter(embedding::Column::StudentId.eq(student_id))
                            .filter(embedding::Column::DeletedAt.is_null())
                            .all(txn)
                            .await?;
                        for e in existing {
                            let mut e = e.into_active_model();
                            e.deleted_at = Set(Some(now));
                            e.update(txn).await?;
                        }
                    }

                    let mut inserted = Vec::with_capacity(vectors.len());
                    for (vector, quality_score) in vectors {
                        let active = embedding::ActiveModel {
                            student_id: Set(student_id),
                            vector_json: Set(embedding::Model::encode_vector(&vector)),
                            quality_score: Set(quality_score),
                            deleted_at: Set(None),
                            created_at: Set(now),
                            ..Default::default()
                        };
                        inserted.push(active.insert(txn).await?);
                    }
                    Ok(inserted)
                })
            })
            .await
            .map_err(flatten)
    }

    // ---------------------------------------------------------------
    // Courses
    // ---------------------------------------------------------------

    pub async fn create_course(
        &self,
        code: &str,
        name: &str,
        instructor: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<course::Model, AppError> {
        let active = course::ActiveModel {
            code: Set(code.to_string()),
            name: Set(name.to_string()),
            instructor: Set(instructor.map(str::to_string)),
            active: Set(true),
            created_at: Set(now),
            ..Default::default()
        };
        active.insert(&self.db).await.map_err(AppError::from)
    }

    pub async fn find_course(&self, id: i64) -> Result<Option<course::Model>, AppError> {
        course::Entity::find_by_id(id).one(&self.db).await.map_err(AppError::from)
    }

    // ---------------------------------------------------------------
    // Enrollments
    // ---------------------------------------------------------------

    pub async fn create_enrollment(
        &self,
        student_id: i64,
        course_id: i64,
        now: NaiveDateTime,
    ) -> Result<enrollment::Model, AppError> {
        let active = enrollment::ActiveModel {
            student_id: Set(student_id),
            course_id: Set(course_id),
            created_at: Set(now),
            ..Default::default()
        };
        active.insert(&self.db).await.map_err(AppError::from)
    }

    pub async fn is_enrolled(&self, student_id: i64, course_id: i64) -> Result<bool, AppError> {
        let count = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::CourseId.eq(course_id))
            .count(&self.db)
            .await
            .map_err(AppError::from)?;
        Ok(count > 0)
    }

    /// A dense view over every enrolled, non-deleted student and their
    /// unit-normalized embeddings — exactly the candidate set the Matcher
    /// needs (§4.2).
    pub async fn enrolled_students_with_embeddings(
        &self,
        course_id: i64,
    ) -> Result<Vec<(student::Model, Vec<embedding::Model>)>, AppError> {
        let students = student::Entity::find()
            .inner_join(enrollment::Entity)
            .filter(enrollment::Column::CourseId.eq(course_id))
            .filter(student::Column::DeletedAt.is_null())
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        let mut out = Vec::with_capacity(students.len());
        for s in students {
            let embeddings = self.student_embeddings(s.id).await?;
            out.push((s, embeddings));
        }
        Ok(out)
    }

    // ---------------------------------------------------------------
    // Timetable slots
    // ---------------------------------------------------------------

    pub async fn create_timetable_slot(
        &self,
        weekday: timetable_slot::Weekday,
        slot_index: i32,
        course_id: i64,
        start_time_of_day: i32,
        end_time_of_day: i32,
        late_threshold_minutes: i32,
    ) -> Result<timetable_slot::Model, AppError> {
        let active = timetable_slot::ActiveModel {
            weekday: Set(weekday),
            slot_index: Set(slot_index),
            course_id: Set(course_id),
            start_time_of_day: Set(start_time_of_day),
            end_time_of_day: Set(end_time_of_day),
            late_threshold_minutes: Set(late_threshold_minutes),
            active: Set(true),
            ..Default::default()
        };
        active.insert(&self.db).await.map_err(AppError::from)
    }

    pub async fn active_slots_for_weekday(
        &self,
        weekday: timetable_slot::Weekday,
    ) -> Result<Vec<timetable_slot::Model>, AppError> {
        timetable_slot::Entity::find()
            .filter(timetable_slot::Column::Weekday.eq(weekday))
            .filter(timetable_slot::Column::Active.eq(true))
            .all(&self.db)
            .await
            .map_err(AppError::from)
    }

    // ---------------------------------------------------------------
    // Sessions
    // ---------------------------------------------------------------

    /// Idempotent materialization for one slot on one date (§4.6 pass a).
    /// Returns `Ok(None)` if `now` falls outside the materialization window;
    /// returns the existing row if one already exists for `(slot, date)`.
    #[allow(clippy::too_many_arguments)]
    pub async fn materialize_session(
        &self,
        slot: &timetable_slot::Model,
        date: NaiveDate,
        now: NaiveDateTime,
        activation_window_minutes: i32,
        finalizer_buffer_minutes: i32,
    ) -> Result<Option<session::Model>, AppError> {
        let starts_at = NaiveDateTime::new(date, slot.start_time());
        let ends_at = NaiveDateTime::new(date, slot.end_time());
        let window_open = starts_at - chrono::Duration::minutes(2);

        if now < window_open || now >= ends_at {
            return Ok(None);
        }

        if let Some(existing) = session::Entity::find()
            .filter(session::Column::TimetableSlotId.eq(slot.id))
            .filter(session::Column::Status.ne(session::Status::Cancelled))
            .filter(session::Column::StartsAt.between(
                NaiveDateTime::new(date, chrono::NaiveTime::MIN),
                NaiveDateTime::new(date, chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap()),
            ))
            .one(&self.db)
            .await
            .map_err(AppError::from)?
        {
            return Ok(Some(existing));
        }

        let activation_window = chrono::Duration::minutes(activation_window_minutes as i64);
        let status = if (now - starts_at).abs() <= activation_window && now < ends_at {
            session::Status::Active
        } else {
            session::Status::Scheduled
        };

        let finalize_at = starts_at
            + chrono::Duration::minutes(slot.late_threshold_minutes as i64)
            + chrono::Duration::minutes(finalizer_buffer_minutes as i64);

        let active = session::ActiveModel {
            course_id: Set(slot.course_id),
            timetable_slot_id: Set(Some(slot.id)),
            starts_at: Set(starts_at),
            ends_at: Set(ends_at),
            late_threshold_minutes: Set(slot.late_threshold_minutes),
            status: Set(status),
            auto_created: Set(true),
            notes: Set(None),
            finalize_at: Set(finalize_at),
            finalized_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.db).await {
            Ok(model) => Ok(Some(model)),
            // Lost a race against another materialization pass for the same
            // (slot, date) — the partial unique index fired. Fetch and
            // return the winner instead of failing the tick.
            Err(DbErr::Query(_)) | Err(DbErr::Exec(_)) => session::Entity::find()
                .filter(session::Column::TimetableSlotId.eq(slot.id))
                .filter(session::Column::Status.ne(session::Status::Cancelled))
                .filter(session::Column::StartsAt.eq(starts_at))
                .one(&self.db)
                .await
                .map_err(AppError::from),
            Err(other) => Err(AppError::from(other)),
        }
    }

    /// Manual session creation (`POST /sessions`). Enforces `(slot, date)`
    /// uniqueness only when a `timetable_slot_id` is supplied, per §6.
    pub async fn create_manual_session(
        &self,
        course_id: i64,
        timetable_slot_id: Option<i64>,
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
        late_threshold_minutes: i32,
        finalizer_buffer_minutes: i32,
        now: NaiveDateTime,
    ) -> Result<session::Model, AppError> {
        if ends_at <= starts_at {
            return Err(AppError::Validation("ends_at must be after starts_at".into()));
        }

        let finalize_at = starts_at
            + chrono::Duration::minutes(late_threshold_minutes as i64)
            + chrono::Duration::minutes(finalizer_buffer_minutes as i64);

        let active = session::ActiveModel {
            course_id: Set(course_id),
            timetable_slot_id: Set(timetable_slot_id),
            starts_at: Set(starts_at),
            ends_at: Set(ends_at),
            late_threshold_minutes: Set(late_threshold_minutes),
            status: Set(session::Status::Scheduled),
            auto_created: Set(false),
            notes: Set(None),
            finalize_at: Set(finalize_at),
            finalized_at: Set(None),
            created_at: Set(now),
            ..Default::default()
        };
        active.insert(&self.db).await.map_err(AppError::from)
    }

    pub async fn find_session(&self, id: i64) -> Result<Option<session::Model>, AppError> {
        session::Entity::find_by_id(id).one(&self.db).await.map_err(AppError::from)
    }

    pub async fn list_active_sessions(&self, now: NaiveDateTime) -> Result<Vec<session::Model>, AppError> {
        session::Entity::find()
            .filter(session::Column::Status.eq(session::Status::Active))
            .filter(session::Column::StartsAt.lte(now))
            .filter(session::Column::EndsAt.gt(now))
            .all(&self.db)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_sessions_due_to_activate(&self, now: NaiveDateTime) -> Result<Vec<session::Model>, AppError> {
        session::Entity::find()
            .filter(session::Column::Status.eq(session::Status::Scheduled))
            .filter(session::Column::StartsAt.lte(now))
            .filter(session::Column::EndsAt.gt(now))
            .all(&self.db)
            .await
            .map_err(AppError::from)
    }

    /// Sessions whose one-shot finalization moment has arrived (§4.6).
    pub async fn list_sessions_due_to_finalize(&self, now: NaiveDateTime) -> Result<Vec<session::Model>, AppError> {
        session::Entity::find()
            .filter(session::Column::Status.eq(session::Status::Active))
            .filter(session::Column::FinalizeAt.lte(now))
            .filter(session::Column::FinalizedAt.is_null())
            .all(&self.db)
            .await
            .map_err(AppError::from)
    }

    /// Sessions that reached `ends_at` but, unusually, were already
    /// finalized without having their status flipped — the defensive half
    /// of pass (c).
    pub async fn list_sessions_due_to_close(&self, now: NaiveDateTime) -> Result<Vec<session::Model>, AppError> {
        session::Entity::find()
            .filter(session::Column::Status.eq(session::Status::Active))
            .filter(session::Column::EndsAt.lte(now))
            .filter(session::Column::FinalizedAt.is_not_null())
            .all(&self.db)
            .await
            .map_err(AppError::from)
    }

    pub async fn activate_session(&self, id: i64) -> Result<session::Model, AppError> {
        let model = session::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
        if model.status != session::Status::Scheduled {
            return Err(AppError::Validation("session is not SCHEDULED".into()));
        }
        let mut active = model.into_active_model();
        active.status = Set(session::Status::Active);
        active.update(&self.db).await.map_err(AppError::from)
    }

    pub async fn cancel_session(&self, id: i64) -> Result<session::Model, AppError> {
        let model = session::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
        if model.is_terminal() {
            return Err(AppError::Validation("session is already terminal".into()));
        }
        let mut active = model.into_active_model();
        active.status = Set(session::Status::Cancelled);
        active.update(&self.db).await.map_err(AppError::from)
    }

    pub async fn complete_session(&self, id: i64, now: NaiveDateTime) -> Result<session::Model, AppError> {
        let model = session::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
        let mut active = model.into_active_model();
        active.status = Set(session::Status::Completed);
        active.finalized_at = Set(Some(now));
        active.update(&self.db).await.map_err(AppError::from)
    }

    pub async fn list_sessions(
        &self,
        date: Option<NaiveDate>,
        status: Option<session::Status>,
    ) -> Result<Vec<session::Model>, AppError> {
        let mut query = session::Entity::find();
        if let Some(date) = date {
            query = query.filter(
                Condition::all()
                    .add(session::Column::StartsAt.gte(NaiveDateTime::new(date, chrono::NaiveTime::MIN)))
                    .add(session::Column::StartsAt.lte(NaiveDateTime::new(
                        date,
                        chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap(),
                    ))),
            );
        }
        if let Some(status) = status {
            query = query.filter(session::Column::Status.eq(status));
        }
        query
            .order_by_asc(session::Column::StartsAt)
            .all(&self.db)
            .await
            .map_err(AppError::from)
    }

    // ---------------------------------------------------------------
    // Attendance + recognition commit (§4.7 step 7, §5 ordering guarantees)
    // ---------------------------------------------------------------

    pub async fn find_attendance(
        &self,
        session_id: i64,
        student_id: i64,
    ) -> Result<Option<attendance::Model>, AppError> {
        attendance::Entity::find()
            .filter(attendance::Column::SessionId.eq(session_id))
            .filter(attendance::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await
            .map_err(AppError::from)
    }

    pub async fn list_attendance_for_session(&self, session_id: i64) -> Result<Vec<attendance::Model>, AppError> {
        attendance::Entity::find()
            .filter(attendance::Column::SessionId.eq(session_id))
            .all(&self.db)
            .await
            .map_err(AppError::from)
    }

    /// Commits the outcome of one recognition or manual-mark attempt in a
    /// single transaction, re-reading the session row to enforce the
    /// monotonic-status ordering guarantee in §5.
    pub async fn commit_recognition(
        &self,
        now: NaiveDateTime,
        session_id: i64,
        student_id: i64,
        enrolled: bool,
        confidence: Option<f32>,
        method: attendance::Method,
    ) -> Result<AttendanceOutcome, AppError> {
        self.db
            .transaction::<_, AttendanceOutcome, AppError>(|txn| {
                Box::pin(async move {
                    let session = session::Entity::find_by_id(session_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;

                    if !session.is_active() {
                        return Ok(AttendanceOutcome::SessionClosed);
                    }

                    let existing = attendance::Entity::find()
                        .filter(attendance::Column::SessionId.eq(session_id))
                        .filter(attendance::Column::StudentId.eq(student_id))
                        .one(txn)
                        .await?;

                    if let Some(row) = existing {
                        let mut active = row.into_active_model();
                        active.last_seen_time = Set(Some(now));
                        if confidence.is_some() {
                            active.confidence = Set(confidence);
                        }
                        let updated = active.update(txn).await?;

                        reentry_event::ActiveModel {
                            session_id: Set(session_id),
                            student_id: Set(student_id),
                            action: Set(reentry_event::Action::Reentry),
                            suspicious: Set(true),
                            created_at: Set(now),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;

                        return Ok(AttendanceOutcome::ReEntry(updated));
                    }

                    if !enrolled {
                        let row = attendance::ActiveModel {
                            session_id: Set(session_id),
                            student_id: Set(student_id),
                            status: Set(attendance::Status::Intruder),
                            check_in_time: Set(Some(now)),
                            last_seen_time: Set(Some(now)),
                            confidence: Set(confidence),
                            method: Set(method),
                            notes: Set(None),
                            created_at: Set(now),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;

                        reentry_event::ActiveModel {
                            session_id: Set(session_id),
                            student_id: Set(student_id),
                            action: Set(reentry_event::Action::Intruder),
                            suspicious: Set(true),
                            created_at: Set(now),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;

                        return Ok(AttendanceOutcome::Intruder(row));
                    }

                    let status = if now <= session.late_cutoff() {
                        attendance::Status::Present
                    } else {
                        attendance::Status::Late
                    };

                    let row = attendance::ActiveModel {
                        session_id: Set(session_id),
                        student_id: Set(student_id),
                        status: Set(status),
                        check_in_time: Set(Some(now)),
                        last_seen_time: Set(Some(now)),
                        confidence: Set(confidence),
                        method: Set(method),
                        notes: Set(None),
                        created_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    reentry_event::ActiveModel {
                        session_id: Set(session_id),
                        student_id: Set(student_id),
                        action: Set(reentry_event::Action::FirstIn),
                        suspicious: Set(false),
                        created_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;

                    Ok(AttendanceOutcome::Marked(row))
                })
            })
            .await
            .map_err(flatten)
    }

    // ---------------------------------------------------------------
    // Finalizer (§4.8)
    // ---------------------------------------------------------------

    pub async fn finalize_session(&self, session_id: i64, now: NaiveDateTime) -> Result<FinalizeOutcome, AppError> {
        self.db
            .transaction::<_, FinalizeOutcome, AppError>(|txn| {
                Box::pin(async move {
                    let session = session::Entity::find_by_id(session_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| AppError::NotFound(format!("session {session_id}")))?;

                    if session.is_terminal() {
                        return Ok(FinalizeOutcome::AlreadyFinal);
                    }

                    let enrolled_students = student::Entity::find()
                        .inner_join(enrollment::Entity)
                        .filter(enrollment::Column::CourseId.eq(session.course_id))
                        .filter(student::Column::DeletedAt.is_null())
                        .all(txn)
                        .await?;

                    let attendance_rows = attendance::Entity::find()
                        .filter(attendance::Column::SessionId.eq(session_id))
                        .all(txn)
                        .await?;

                    let attended: std::collections::HashSet<i64> = attendance_rows
                        .iter()
                        .filter(|a| {
                            matches!(a.status, attendance::Status::Present | attendance::Status::Late)
                        })
                        .map(|a| a.student_id)
                        .collect();

                    let mut absent_count = 0usize;
                    for s in &enrolled_students {
                        if attended.contains(&s.id) {
                            continue;
                        }
                        let already = attendance::Entity::find()
                            .filter(attendance::Column::SessionId.eq(session_id))
                            .filter(attendance::Column::StudentId.eq(s.id))
                            .one(txn)
                            .await?;
                        if already.is_some() {
                            continue;
                        }

                        attendance::ActiveModel {
                            session_id: Set(session_id),
                            student_id: Set(s.id),
                            status: Set(attendance::Status::Absent),
                            check_in_time: Set(None),
                            last_seen_time: Set(None),
                            confidence: Set(None),
                            method: Set(attendance::Method::Auto),
                            notes: Set(None),
                            created_at: Set(now),
                            ..Default::default()
                        }
                        .insert(txn)
                        .await?;
                        absent_count += 1;
                    }

                    let mut active = session.into_active_model();
                    active.status = Set(session::Status::Completed);
                    active.finalized_at = Set(Some(now));
                    active.update(txn).await?;

                    Ok(FinalizeOutcome::Finalized { absent_count })
                })
            })
            .await
            .map_err(flatten)
    }

    // ---------------------------------------------------------------
    // Reentry log (exposed directly for the defense-in-depth direct-upsert
    // path described in §4.7 step 7; the usual path goes through
    // `commit_recognition`, which logs reentry events itself).
    // ---------------------------------------------------------------

    pub async fn log_reentry(
        &self,
        session_id: i64,
        student_id: i64,
        action: reentry_event::Action,
        suspicious: bool,
        now: NaiveDateTime,
    ) -> Result<reentry_event::Model, AppError> {
        reentry_event::ActiveModel {
            session_id: Set(session_id),
            student_id: Set(student_id),
            action: Set(action),
            suspicious: Set(suspicious),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(AppError::from)
    }

    // ---------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------

    pub async fn get_settings(&self) -> Result<Settings, AppError> {
        let rows = setting::Entity::find().all(&self.db).await.map_err(AppError::from)?;
        let map: HashMap<String, String> = rows.into_iter().map(|r| (r.key, r.value)).collect();
        Ok(Settings::from_rows(map))
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        let existing = setting::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        match existing {
            Some(row) => {
                let mut active = row.into_active_model();
                active.value = Set(value.to_string());
                active.update(&self.db).await.map_err(AppError::from)?;
            }
            None => {
                setting::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(value.to_string()),
                }
                .insert(&self.db)
                .await
                .map_err(AppError::from)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::setup_test_db;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    async fn store() -> Store {
        Store::new(setup_test_db().await)
    }

    async fn seed_course_with_one_student(store: &Store, now: NaiveDateTime) -> (course::Model, student::Model) {
        let course = store.create_course("COS301", "Software Engineering", None, now).await.unwrap();
        let student = store.create_student("ST12345678", "Jane Doe", None, now).await.unwrap();
        store.create_enrollment(student.id, course.id, now).await.unwrap();
        (course, student)
    }

    #[tokio::test]
    async fn rejects_malformed_external_id() {
        let store = store().await;
        let now = dt(2026, 2, 2, 8, 0);
        let err = store.create_student("not-an-id", "X", None, now).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidIdFormat(_)));
    }

    #[tokio::test]
    async fn double_enrollment_is_rejected() {
        let store = store().await;
        let now = dt(2026, 2, 2, 8, 0);
        let (course, student) = seed_course_with_one_student(&store, now).await;
        let err = store.create_enrollment(student.id, course.id, now).await.unwrap_err();
        assert!(matches!(err, AppError::EnrollmentConflict));
    }

    #[tokio::test]
    async fn materialize_session_is_idempotent_for_same_slot_and_date() {
        let store = store().await;
        let now = dt(2026, 2, 2, 8, 0);
        let (course, _) = seed_course_with_one_student(&store, now).await;
        let slot = store
            .create_timetable_slot(timetable_slot::Weekday::Mon, 1, course.id, 8 * 3600, 9 * 3600, 5)
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();

        let first = store.materialize_session(&slot, date, now, 5, 5).await.unwrap().unwrap();
        let second = store.materialize_session(&slot, date, now, 5, 5).await.unwrap().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.status, session::Status::Active);
    }

    #[tokio::test]
    async fn materialize_session_outside_window_is_none() {
        let store = store().await;
        let now = dt(2026, 2, 2, 8, 0);
        let (course, _) = seed_course_with_one_student(&store, now).await;
        let slot = store
            .create_timetable_slot(timetable_slot::Weekday::Mon, 1, course.id, 10 * 3600, 11 * 3600, 5)
            .await
            .unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 2, 2).unwrap();

        let result = store.materialize_session(&slot, date, now, 5, 5).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn recognition_marks_present_before_late_cutoff_and_late_after() {
        let store = store().await;
        let now = dt(2026, 2, 2, 8, 0);
        let (course, student) = seed_course_with_one_student(&store, now).await;
        let session = store
            .create_manual_session(course.id, None, now, dt(2026, 2, 2, 9, 0), 5, 5, now)
            .await
            .unwrap();
        store.activate_session(session.id).await.unwrap();

        let on_time = store
            .commit_recognition(dt(2026, 2, 2, 8, 2), session.id, student.id, true, Some(0.9), attendance::Method::Auto)
            .await
            .unwrap();
        match on_time {
            AttendanceOutcome::Marked(row) => assert_eq!(row.status, attendance::Status::Present),
            other => panic!("expected Marked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_sighting_of_same_student_is_a_reentry_not_a_duplicate_row() {
        let store = store().await;
        let now = dt(2026, 2, 2, 8, 0);
        let (course, student) = seed_course_with_one_student(&store, now).await;
        let session = store
            .create_manual_session(course.id, None, now, dt(2026, 2, 2, 9, 0), 5, 5, now)
            .await
            .unwrap();
        store.activate_session(session.id).await.unwrap();

        store
            .commit_recognition(dt(2026, 2, 2, 8, 2), session.id, student.id, true, Some(0.9), attendance::Method::Auto)
            .await
            .unwrap();
        let second = store
            .commit_recognition(dt(2026, 2, 2, 8, 20), session.id, student.id, true, Some(0.9), attendance::Method::Auto)
            .await
            .unwrap();

        assert!(matches!(second, AttendanceOutcome::ReEntry(_)));
        let rows = store.list_attendance_for_session(session.id).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn unenrolled_recognized_face_is_an_intruder() {
        let store = store().await;
        let now = dt(2026, 2, 2, 8, 0);
        let course = store.create_course("COS301", "Software Engineering", None, now).await.unwrap();
        let outsider = store.create_student("ST99999999", "Outsider", None, now).await.unwrap();
        let session = store
            .create_manual_session(course.id, None, now, dt(2026, 2, 2, 9, 0), 5, 5, now)
            .await
            .unwrap();
        store.activate_session(session.id).await.unwrap();

        let outcome = store
            .commit_recognition(dt(2026, 2, 2, 8, 2), session.id, outsider.id, false, Some(0.9), attendance::Method::Auto)
            .await
            .unwrap();
        match outcome {
            AttendanceOutcome::Intruder(row) => assert_eq!(row.status, attendance::Status::Intruder),
            other => panic!("expected Intruder, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recognition_against_closed_session_is_rejected() {
        let store = store().await;
        let now = dt(2026, 2, 2, 8, 0);
        let (course, student) = seed_course_with_one_student(&store, now).await;
        let session = store
            .create_manual_session(course.id, None, now, dt(2026, 2, 2, 9, 0), 5, 5, now)
            .await
            .unwrap();
        // never activated: still SCHEDULED, not ACTIVE

        let outcome = store
            .commit_recognition(dt(2026, 2, 2, 8, 2), session.id, student.id, true, Some(0.9), attendance::Method::Auto)
            .await
            .unwrap();
        assert!(matches!(outcome, AttendanceOutcome::SessionClosed));
    }

    #[tokio::test]
    async fn finalizer_marks_absent_students_and_is_idempotent() {
        let store = store().await;
        let now = dt(2026, 2, 2, 8, 0);
        let (course, present_student) = seed_course_with_one_student(&store, now).await;
        let absent_student = store.create_student("ST22222222", "Absent Guy", None, now).await.unwrap();
        store.create_enrollment(absent_student.id, course.id, now).await.unwrap();

        let session = store
            .create_manual_session(course.id, None, now, dt(2026, 2, 2, 9, 0), 5, 5, now)
            .await
            .unwrap();
        store.activate_session(session.id).await.unwrap();
        store
            .commit_recognition(dt(2026, 2, 2, 8, 2), session.id, present_student.id, true, Some(0.9), attendance::Method::Auto)
            .await
            .unwrap();

        let outcome = store.finalize_session(session.id, dt(2026, 2, 2, 8, 10)).await.unwrap();
        match outcome {
            FinalizeOutcome::Finalized { absent_count } => assert_eq!(absent_count, 1),
            other => panic!("expected Finalized, got {other:?}"),
        }

        let again = store.finalize_session(session.id, dt(2026, 2, 2, 8, 11)).await.unwrap();
        assert!(matches!(again, FinalizeOutcome::AlreadyFinal));

        let rows = store.list_attendance_for_session(session.id).await.unwrap();
        assert_eq!(rows.len(), 2);
        let completed = store.find_session(session.id).await.unwrap().unwrap();
        assert_eq!(completed.status, session::Status::Completed);
    }

    #[tokio::test]
    async fn settings_round_trip_defaults_and_overrides() {
        let store = store().await;
        let settings = store.get_settings().await.unwrap();
        assert_eq!(settings, Settings::default());

        store.set_setting("confidence_threshold", "0.75").await.unwrap();
        let updated = store.get_settings().await.unwrap();
        assert_eq!(updated.confidence_threshold, 0.75);
    }
}
