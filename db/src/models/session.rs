use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_id: i64,
    pub timetable_slot_id: Option<i64>,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
    pub late_threshold_minutes: i32,
    pub status: Status,
    pub auto_created: bool,
    pub notes: Option<String>,
    /// `starts_at + late_threshold_minutes + finalizer_buffer_minutes`,
    /// computed once at materialization time (§4.6).
    pub finalize_at: NaiveDateTime,
    pub finalized_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Model {
    pub fn late_cutoff(&self) -> NaiveDateTime {
        self.starts_at + chrono::Duration::minutes(self.late_threshold_minutes as i64)
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, Status::Completed | Status::Cancelled)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "session_status")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(has_many = "super::attendance::Entity")]
    Attendance,
    #[sea_orm(has_many = "super::reentry_event::Entity")]
    ReentryEvents,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::attendance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl Related<super::reentry_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReentryEvents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
