//! Coupon entity - A redeemable token purchased with points.
//!
//! Name, description, and cost are snapshots of the catalog item at purchase
//! time, so later catalog edits never rewrite sold coupons. The unique
//! 8-character code is generated at purchase and only revealed - never
//! regenerated - at redemption.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coupon database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    /// Unique identifier for the coupon
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student who purchased the coupon
    pub student_id: i64,
    /// Catalog item name at purchase time
    pub name: String,
    /// Catalog item description at purchase time
    pub description: String,
    /// Points paid for the coupon
    pub points_cost: i64,
    /// Unique 8-character redemption code (A-Z, 0-9)
    #[sea_orm(unique)]
    pub code: String,
    /// Whether the coupon has been redeemed
    pub redeemed: bool,
    /// When the coupon was redeemed, None until then
    pub redeem_date: Option<DateTimeUtc>,
}

/// Defines relationships between Coupon and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each coupon belongs to one student
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id"
    )]
    Student,
    /// One coupon is referenced by the purchase ledger entry
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntries,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
