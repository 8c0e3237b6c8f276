pub mod m20260101_000001_create_students;
pub mod m20260101_000002_create_embeddings;
pub mod m20260101_000003_create_courses;
pub mod m20260101_000004_create_enrollments;
pub mod m20260101_000005_create_timetable_slots;
pub mod m20260101_000006_create_sessions;
pub mod m20260101_000007_create_attendance;
pub mod m20260101_000008_create_reentry_events;
pub mod m20260101_000009_create_settings;
