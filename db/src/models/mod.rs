pub mod attendance;
pub mod course;
pub mod embedding;
pub mod enrollment;
pub mod reentry_event;
pub mod session;
pub mod setting;
pub mod student;
pub mod timetable_slot;
