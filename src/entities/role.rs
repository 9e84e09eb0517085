//! Role entity - The fixed set of user roles.
//!
//! Seeded once at startup with {admin, teacher, student} and immutable
//! afterwards. Users reference a role by foreign key; code never matches on
//! numeric role ids, only on [`RoleKind`] resolved from the name.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    /// Unique identifier for the role
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Role name: `"admin"`, `"teacher"`, or `"student"`
    #[sea_orm(unique)]
    pub name: String,
}

/// Defines relationships between Role and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One role has many users
    #[sea_orm(has_many = "super::user::Entity")]
    Users,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// The three roles a user can hold, mirrored from the seeded `roles` table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoleKind {
    /// Full administrative access, resolves teacher role requests
    Admin,
    /// Awards points and manages classes; requires admin approval
    Teacher,
    /// Earns points and purchases rewards
    Student,
}

impl RoleKind {
    /// The role name as stored in the `roles` table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    /// Parses a stored role name, returning None for anything unseeded.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Self::Admin),
            "teacher" => Some(Self::Teacher),
            "student" => Some(Self::Student),
            _ => None,
        }
    }

    /// All seeded roles, in seeding order.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Teacher, Self::Student];
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
