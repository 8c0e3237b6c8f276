use chrono::{NaiveTime, Timelike};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "timetable_slots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub weekday: Weekday,
    pub slot_index: i32,
    pub course_id: i64,
    /// Seconds since local midnight.
    pub start_time_of_day: i32,
    pub end_time_of_day: i32,
    pub late_threshold_minutes: i32,
    pub active: bool,
}

impl Model {
    pub fn start_time(&self) -> NaiveTime {
        seconds_to_time(self.start_time_of_day)
    }

    pub fn end_time(&self) -> NaiveTime {
        seconds_to_time(self.end_time_of_day)
    }
}

pub fn seconds_to_time(seconds: i32) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt(seconds.max(0) as u32, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap())
}

pub fn time_to_seconds(time: NaiveTime) -> i32 {
    time.num_seconds_from_midnight() as i32
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "weekday")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Weekday {
    #[sea_orm(string_value = "MON")]
    Mon,
    #[sea_orm(string_value = "TUE")]
    Tue,
    #[sea_orm(string_value = "WED")]
    Wed,
    #[sea_orm(string_value = "THU")]
    Thu,
    #[sea_orm(string_value = "FRI")]
    Fri,
}

impl Weekday {
    pub fn from_chrono(day: chrono::Weekday) -> Option<Self> {
        match day {
            chrono::Weekday::Mon => Some(Weekday::Mon),
            chrono::Weekday::Tue => Some(Weekday::Tue),
            chrono::Weekday::Wed => Some(Weekday::Wed),
            chrono::Weekday::Thu => Some(Weekday::Thu),
            chrono::Weekday::Fri => Some(Weekday::Fri),
            chrono::Weekday::Sat | chrono::Weekday::Sun => None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
