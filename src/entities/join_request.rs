//! Join request entity - A student's request to enroll in a class.
//!
//! State machine: `pending -> accepted | rejected`, both terminal. The
//! composite unique index on (`student_id`, `class_id`) means a student gets
//! exactly one request per class ever - there is no re-request path after a
//! rejection.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a join request
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum JoinRequestStatus {
    /// Awaiting a response from the class teacher
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Accepted; the student is enrolled
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Rejected; terminal, no re-request
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Join request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "join_requests")]
pub struct Model {
    /// Unique identifier for the join request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Requesting student
    pub student_id: i64,
    /// Class the student wants to join
    pub class_id: i64,
    /// Current lifecycle state
    pub status: JoinRequestStatus,
}

/// Defines relationships between JoinRequest and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request was filed by one student
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
    /// Each request targets one class
    #[sea_orm(
        belongs_to = "super::school_class::Entity",
        from = "Column::ClassId",
        to = "super::school_class::Column::Id"
    )]
    Class,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::school_class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
