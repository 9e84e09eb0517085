//! Account entity - One-to-one point balance per user.
//!
//! `balance` holds points available to spend; `points_awarded` is the
//! lifetime total a teacher has given out. Balance non-negativity is enforced
//! by the award/purchase operations inside their transactions, not by a
//! storage constraint.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Unique identifier for the account
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning user, exactly one account per user
    #[sea_orm(unique)]
    pub user_id: i64,
    /// Points available to spend, never negative
    pub balance: i64,
    /// Lifetime points given out (meaningful for teachers only)
    pub points_awarded: i64,
}

/// Defines relationships between Account and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each account belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
