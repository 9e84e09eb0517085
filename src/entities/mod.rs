//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod coupon;
pub mod enrollment;
pub mod join_request;
pub mod ledger_entry;
pub mod role;
pub mod school_class;
pub mod subject;
pub mod teacher_request;
pub mod user;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use coupon::{Column as CouponColumn, Entity as Coupon, Model as CouponModel};
pub use enrollment::{Column as EnrollmentColumn, Entity as Enrollment, Model as EnrollmentModel};
pub use join_request::{
    Column as JoinRequestColumn, Entity as JoinRequest, JoinRequestStatus,
    Model as JoinRequestModel,
};
pub use ledger_entry::{
    Column as LedgerEntryColumn, Entity as LedgerEntry, Model as LedgerEntryModel,
};
pub use role::{Column as RoleColumn, Entity as Role, Model as RoleModel, RoleKind};
pub use school_class::{Column as SchoolClassColumn, Entity as SchoolClass, Model as SchoolClassModel};
pub use subject::{Column as SubjectColumn, Entity as Subject, Model as SubjectModel};
pub use teacher_request::{
    Column as TeacherRequestColumn, Entity as TeacherRequest, Model as TeacherRequestModel,
    TeacherRequestStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
