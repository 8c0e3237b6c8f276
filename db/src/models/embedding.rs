use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "embeddings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub student_id: i64,
    pub vector_json: String,
    pub quality_score: f32,
    pub deleted_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

impl Model {
    /// Decodes the stored JSON array back into a unit-normalized vector.
    /// The vector is stored already-normalized (§4.3), so this is a plain
    /// parse, not a re-normalization.
    pub fn vector(&self) -> Vec<f32> {
        serde_json::from_str(&self.vector_json).unwrap_or_default()
    }

    pub fn encode_vector(vector: &[f32]) -> String {
        serde_json::to_string(vector).expect("f32 vector serialization cannot fail")
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
