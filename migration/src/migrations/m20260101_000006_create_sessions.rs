use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20260101_000006_create_sessions"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("sessions"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("id"))
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("course_id"))
                            .big_integer()
                            .not_null(),
                    )
                    // Nullable, no FK action: a slot deleted out from under a
                    // session should not cascade-delete attendance history,
                    // see SPEC_FULL.md §3 (ownership).
                    .col(
                        ColumnDef::new(Alias::new("timetable_slot_id"))
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("starts_at"))
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Alias::new("ends_at")).timestamp().not_null())
                    .col(
                        ColumnDef::new(Alias::new("late_threshold_minutes"))
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("status"))
                            .string()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(
                        ColumnDef::new(Alias::new("auto_created"))
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Alias::new("notes")).text().null())
                    .col(
                        ColumnDef::new(Alias::new("finalize_at"))
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("finalized_at"))
                            .timestamp()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Alias::new("created_at"))
                            .timestamp()
                            .not_null()
                            .default(Expr::cust("CURRENT_TIMESTAMP")),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sessions_course")
                            .from(Alias::new("sessions"), Alias::new("course_id"))
                            .to(Alias::new("courses"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_status_starts_at")
                    .table(Alias::new("sessions"))
                    .col(Alias::new("status"))
                    .col(Alias::new("starts_at"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sessions_slot_starts_at")
                    .table(Alias::new("sessions"))
                    .col(Alias::new("timetable_slot_id"))
                    .col(Alias::new("starts_at"))
                    .to_owned(),
            )
            .await?;

        // At most one non-cancelled session per (slot, date) — P4. Expressed
        // as a partial unique index rather than an application-level check so
        // it fails closed even under concurrent materialization.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX idx_sessions_slot_date_live ON sessions \
                 (timetable_slot_id, date(starts_at)) \
                 WHERE status != 'cancelled' AND timetable_slot_id IS NOT NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("sessions")).to_owned())
            .await
    }
}
