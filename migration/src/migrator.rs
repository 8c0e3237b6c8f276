use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m20260101_000001_create_students::Migration),
            Box::new(migrations::m20260101_000002_create_embeddings::Migration),
            Box::new(migrations::m20260101_000003_create_courses::Migration),
            Box::new(migrations::m20260101_000004_create_enrollments::Migration),
            Box::new(migrations::m20260101_000005_create_timetable_slots::Migration),
            Box::new(migrations::m20260101_000006_create_sessions::Migration),
            Box::new(migrations::m20260101_000007_create_attendance::Migration),
            Box::new(migrations::m20260101_000008_create_reentry_events::Migration),
            Box::new(migrations::m20260101_000009_create_settings::Migration),
        ]
    }
}
