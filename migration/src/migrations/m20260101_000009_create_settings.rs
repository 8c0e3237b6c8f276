use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20260101_000009_create_settings"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Alias::new("settings"))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Alias::new("key"))
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Alias::new("value")).string().not_null())
                    .to_owned(),
            )
            .await?;

        let defaults: &[(&str, &str)] = &[
            ("confidence_threshold", "0.60"),
            ("late_threshold_default_minutes", "5"),
            ("finalizer_buffer_minutes", "5"),
            ("scheduler_tick_seconds", "60"),
            ("activation_window_minutes", "5"),
            ("enrollment_k_min", "5"),
            ("enrollment_k_max", "15"),
        ];

        for (key, value) in defaults {
            manager
                .exec_stmt(
                    Query::insert()
                        .into_table(Alias::new("settings"))
                        .columns([Alias::new("key"), Alias::new("value")])
                        .values_panic([(*key).into(), (*value).into()])
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Alias::new("settings")).to_owned())
            .await
    }
}
