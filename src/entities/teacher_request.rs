//! Teacher request entity - The teacher-role approval state machine.
//!
//! A pending row is created when a user registers requesting the teacher
//! role; an admin later transitions it to accepted or rejected, recording who
//! resolved it and when. This table is the single source of truth for the
//! approval workflow; the cached flags on [`super::user`] are updated
//! alongside it in the same transaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a teacher role request
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum TeacherRequestStatus {
    /// Awaiting an admin decision
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Approved; the user may log in as a teacher
    #[sea_orm(string_value = "accepted")]
    Accepted,
    /// Rejected by an admin
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// Teacher request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "teacher_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User requesting the teacher role
    pub user_id: i64,
    /// Current lifecycle state
    pub status: TeacherRequestStatus,
    /// When an admin resolved the request, None while pending
    pub date_resolved: Option<DateTimeUtc>,
    /// Admin who resolved the request, None while pending
    pub resolved_by_id: Option<i64>,
}

/// Defines relationships between TeacherRequest and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request belongs to the user who filed it
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// The admin who resolved the request
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ResolvedById",
        to = "super::user::Column::Id"
    )]
    ResolvedBy,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
