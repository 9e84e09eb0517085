//! Class entity - A subject taught to a year group by one teacher.
//!
//! The display name is generated at creation: year group, subject initial,
//! then the teacher's initials, with a numeric suffix on collision
//! (e.g. `"9MAB"`, `"9MAB1"`). Students relate many-to-many through
//! [`super::enrollment`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Class database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "classes")]
pub struct Model {
    /// Unique identifier for the class
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Generated display name, globally unique
    #[sea_orm(unique)]
    pub name: String,
    /// Subject taught in this class
    pub subject_id: i64,
    /// School year group (e.g., 9 for Year 9)
    pub year_group: i32,
    /// Teacher who owns the class
    pub teacher_id: i64,
}

/// Defines relationships between Class and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each class teaches one subject
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id"
    )]
    Subject,
    /// Each class is owned by one teacher
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id"
    )]
    Teacher,
    /// One class receives many join requests
    #[sea_orm(has_many = "super::join_request::Entity")]
    JoinRequests,
    /// One class has many enrollments
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teacher.def()
    }
}

impl Related<super::join_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JoinRequests.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
