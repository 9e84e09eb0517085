//! User entity - Identity, role reference, and weekly award bookkeeping.
//!
//! The `role_approved`/`role_request`/`role_rejected` flags are a derived
//! cache of the teacher-request state machine (see
//! [`super::teacher_request`]); they exist so login checks never need to join
//! the request history. The weekly cap fields (`weekly_point_limit`,
//! `points_awarded_this_week`, `last_award_date`) reset lazily on read when
//! the ISO week changes - there is no scheduled job.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Default weekly point limit granted to teachers at registration
pub const DEFAULT_WEEKLY_POINT_LIMIT: i64 = 100;

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Login email address
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC-format password hash (never the plaintext)
    pub password_hash: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Generated display username, globally unique
    #[sea_orm(unique)]
    pub user_name: String,
    /// Foreign key into the seeded `roles` table
    pub role_id: i64,
    /// Cache: the teacher role request was approved
    pub role_approved: bool,
    /// Cache: a teacher role request is pending
    pub role_request: bool,
    /// Cache: the teacher role request was rejected
    pub role_rejected: bool,
    /// When the teacher role was requested, if ever
    pub role_requested_on: Option<DateTimeUtc>,
    /// Maximum points a teacher may award per ISO week
    pub weekly_point_limit: i64,
    /// Points awarded in the week of `last_award_date`
    pub points_awarded_this_week: i64,
    /// Date of the most recent award, None until the first award
    pub last_award_date: Option<Date>,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each user has exactly one role
    #[sea_orm(
        belongs_to = "super::role::Entity",
        from = "Column::RoleId",
        to = "super::role::Column::Id"
    )]
    Role,
    /// Each user owns one account
    #[sea_orm(has_one = "super::account::Entity")]
    Account,
    /// A teacher owns many classes
    #[sea_orm(has_many = "super::school_class::Entity")]
    Classes,
    /// A student files many join requests
    #[sea_orm(has_many = "super::join_request::Entity")]
    JoinRequests,
    /// A student owns many coupons
    #[sea_orm(has_many = "super::coupon::Entity")]
    Coupons,
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::school_class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Classes.def()
    }
}

impl Related<super::join_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::JoinRequests.def()
    }
}

impl Related<super::coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coupons.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
