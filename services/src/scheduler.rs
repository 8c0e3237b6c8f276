use crate::finalizer;
use crate::settings_cache::SettingsCache;
use chrono::NaiveDate;
use common::Clock;
use db::models::timetable_slot::Weekday;
use db::Store;
use log::{info, trace, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time;

/// Ticks that run noticeably past half the tick interval are logged at WARN
/// (§5).
fn slow_tick_threshold(tick: Duration) -> Duration {
    tick / 2
}

/// Drives the three materialize/activate/close passes on a fixed interval,
/// guarded so overlapping ticks are impossible (§4.6), in the style of the
/// teacher's scraper scheduler: a `tokio::select!` loop around
/// `time::sleep_until`, an in-flight `JoinHandle` checked with
/// `is_finished()`, and a broadcast shutdown channel.
pub struct Scheduler {
    store: Arc<Store>,
    clock: Arc<dyn Clock>,
    settings: Arc<SettingsCache>,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, clock: Arc<dyn Clock>, settings: Arc<SettingsCache>) -> Self {
        Self { store, clock, settings }
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("scheduler started");

        let mut current_work: Option<tokio::task::JoinHandle<()>> = None;
        let mut tick_interval = Duration::from_secs(self.settings.current().await.scheduler_tick_seconds);
        let mut next_run = time::Instant::now();

        loop {
            tokio::select! {
                _ = time::sleep_until(next_run) => {
                    if let Some(handle) = &current_work {
                        if !handle.is_finished() {
                            trace!("previous scheduler tick still running, skipping this one");
                            next_run = time::Instant::now() + tick_interval;
                            continue;
                        }
                    }

                    let store = self.store.clone();
                    let clock = self.clock.clone();
                    let slow_threshold = slow_tick_threshold(tick_interval);

                    let handle = tokio::spawn(async move {
                        let start = Instant::now();
                        run_tick(&store, clock.as_ref()).await;
                        let elapsed = start.elapsed();
                        if elapsed > slow_threshold {
                            warn!("scheduler tick took {elapsed:?}, exceeding half the tick interval");
                        }
                    });
                    current_work = Some(handle);

                    if let Err(e) = self.settings.refresh().await {
                        warn!("failed to refresh settings cache: {e}");
                    }
                    tick_interval = Duration::from_secs(self.settings.current().await.scheduler_tick_seconds);
                    next_run = time::Instant::now() + tick_interval;
                }
                _ = shutdown_rx.recv() => {
                    info!("scheduler received shutdown signal");
                    if let Some(handle) = current_work.take() {
                        let _ = handle.await;
                    }
                    info!("scheduler exiting");
                    break;
                }
            }
        }
    }
}

/// One tick: materialize, activate, close/finalize — each its own
/// transaction, run via the Store (§4.6).
async fn run_tick(store: &Store, clock: &dyn Clock) {
    let now = clock.now();
    let settings = match store.get_settings().await {
        Ok(s) => s,
        Err(e) => {
            warn!("scheduler tick aborted: failed to read settings: {e}");
            return;
        }
    };

    materialize_pass(store, now, &settings).await;
    activate_pass(store, now).await;
    close_pass(store, now).await;
}

async fn materialize_pass(store: &Store, now: chrono::NaiveDateTime, settings: &db::Settings) {
    let Some(weekday) = Weekday::from_chrono(now.date().weekday()) else {
        return;
    };
    let date: NaiveDate = now.date();

    let slots = match store.active_slots_for_weekday(weekday).await {
        Ok(slots) => slots,
        Err(e) => {
            warn!("materialize pass: failed to list active slots: {e}");
            return;
        }
    };

    for slot in &slots {
        match store
            .materialize_session(slot, date, now, settings.activation_window_minutes, settings.finalizer_buffer_minutes)
            .await
        {
            Ok(Some(session)) => {
                trace!("materialized session {} for slot {} on {date}", session.id, slot.id);
            }
            Ok(None) => {}
            Err(e) => warn!("materialize pass: slot {} failed: {e}", slot.id),
        }
    }
}

async fn activate_pass(store: &Store, now: chrono::NaiveDateTime) {
    let due = match store.list_sessions_due_to_activate(now).await {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!("activate pass: failed to list due sessions: {e}");
            return;
        }
    };

    for session in due {
        match store.activate_session(session.id).await {
            Ok(activated) => info!("session {} (course {}) activated", activated.id, activated.course_id),
            Err(e) => warn!("activate pass: failed to activate session {}: {e}", session.id),
        }
    }
}

async fn close_pass(store: &Store, now: chrono::NaiveDateTime) {
    let due_finalize = match store.list_sessions_due_to_finalize(now).await {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!("close pass: failed to list sessions due to finalize: {e}");
            Vec::new()
        }
    };
    for session in due_finalize {
        match finalizer::finalize(store, session.id, now).await {
            Ok(outcome) => info!("session {} finalized: {outcome:?}", session.id),
            Err(e) => warn!("close pass: failed to finalize session {}: {e}", session.id),
        }
    }

    let due_close = match store.list_sessions_due_to_close(now).await {
        Ok(sessions) => sessions,
        Err(e) => {
            warn!("close pass: failed to list sessions due to close: {e}");
            Vec::new()
        }
    };
    for session in due_close {
        if let Err(e) = store.complete_session(session.id, now).await {
            warn!("close pass: failed to complete session {}: {e}", session.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use db::models::timetable_slot;
    use db::test_utils::setup_test_db;

    fn dt(h: u32, m: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 6).unwrap().and_hms_opt(h, m, 0).unwrap() // a Friday
    }

    #[tokio::test]
    async fn tick_materializes_activates_and_catches_up_finalization() {
        let store = Store::new(setup_test_db().await);
        let course = store.create_course("COS301", "SE", None, dt(0, 0)).await.unwrap();
        let student = store.create_student("ST11111111", "A", None, dt(0, 0)).await.unwrap();
        store.create_enrollment(student.id, course.id, dt(0, 0)).await.unwrap();
        store
            .create_timetable_slot(timetable_slot::Weekday::Fri, 1, course.id, 10 * 3600, 11 * 3600, 5)
            .await
            .unwrap();

        // Scheduler process "started late", at 10:30 — after the finalize
        // deadline (10:10) but before the session ends (11:00).
        let now = dt(10, 30);
        run_tick(&store, &common::FixedClock::new(now)).await;

        let sessions = store.list_sessions(Some(NaiveDate::from_ymd_opt(2026, 2, 6).unwrap()), None).await.unwrap();
        assert_eq!(sessions.len(), 1);
        let session = &sessions[0];
        assert_eq!(session.status, db::models::session::Status::Completed);

        let attendance = store.list_attendance_for_session(session.id).await.unwrap();
        assert_eq!(attendance.len(), 1);
        assert_eq!(attendance[0].status, db::models::attendance::Status::Absent);
    }
}
