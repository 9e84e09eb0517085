//! Ledger entry entity - Immutable record of every balance change.
//!
//! Awards carry a positive amount from a teacher account to a student
//! account; purchases carry a negative amount with no destination and an
//! optional coupon link. Rows are append-only; the single exception is
//! `date_redeemed`, back-filled when a linked coupon is redeemed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    /// Unique identifier for the ledger entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// When the balance change happened
    pub timestamp: DateTimeUtc,
    /// Debited account, None for system-originated entries
    pub from_account_id: Option<i64>,
    /// Credited account, None for purchases
    pub to_account_id: Option<i64>,
    /// Point delta: positive for awards, negative for purchases
    pub amount: i64,
    /// Coupon code snapshot for purchase entries
    pub code: Option<String>,
    /// Linked coupon for purchase entries
    pub coupon_id: Option<i64>,
    /// Set when the linked coupon is redeemed
    pub date_redeemed: Option<DateTimeUtc>,
}

/// Defines relationships between LedgerEntry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A purchase entry links to the coupon it bought
    #[sea_orm(
        belongs_to = "super::coupon::Entity",
        from = "Column::CouponId",
        to = "super::coupon::Column::Id"
    )]
    Coupon,
}

impl Related<super::coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coupon.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
