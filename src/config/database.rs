//! Database configuration module.
//!
//! Handles `SQLite` connection and table creation using `SeaORM`. Tables are
//! generated from the entity definitions via `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs; the composite unique
//! indexes that the entity derive cannot express (join-request and enrollment
//! pairs) are created explicitly afterwards. Also seeds the immutable
//! reference data: the three roles and the default subject list.

use crate::entities::{
    Account, Coupon, Enrollment, JoinRequest, LedgerEntry, Role, RoleKind, SchoolClass, Subject,
    TeacherRequest, User, enrollment, join_request, role, subject,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use tracing::info;

/// Subjects seeded on first run; the admin can extend the table later.
const DEFAULT_SUBJECTS: [&str; 6] = [
    "Maths",
    "English",
    "Science",
    "History",
    "Geography",
    "Art",
];

/// Gets the database URL from environment variable or returns default `SQLite` path.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/house_points.sqlite".to_string())
}

/// Establishes a connection using the `DATABASE_URL` environment variable,
/// falling back to a default local `SQLite` file.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all tables from the entity definitions, plus the composite unique
/// indexes backing the at-most-one-request-per-class and single-enrollment
/// invariants.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = sea_orm::Schema::new(builder);

    db.execute(builder.build(&schema.create_table_from_entity(Role)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(User)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(Account)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(LedgerEntry)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(Subject)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(SchoolClass)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(Enrollment)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(JoinRequest)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(Coupon)))
        .await?;
    db.execute(builder.build(&schema.create_table_from_entity(TeacherRequest)))
        .await?;

    // Composite uniques: the entity derive only covers single columns.
    let join_request_pair = Index::create()
        .name("uidx_join_requests_student_class")
        .table(JoinRequest)
        .col(join_request::Column::StudentId)
        .col(join_request::Column::ClassId)
        .unique()
        .to_owned();
    db.execute(builder.build(&join_request_pair)).await?;

    let enrollment_pair = Index::create()
        .name("uidx_enrollments_student_class")
        .table(Enrollment)
        .col(enrollment::Column::StudentId)
        .col(enrollment::Column::ClassId)
        .unique()
        .to_owned();
    db.execute(builder.build(&enrollment_pair)).await?;

    Ok(())
}

/// Seeds the fixed role set {admin, teacher, student}. Idempotent: roles that
/// already exist are left untouched.
pub async fn seed_roles(db: &DatabaseConnection) -> Result<()> {
    for kind in RoleKind::ALL {
        let existing = Role::find()
            .filter(role::Column::Name.eq(kind.as_str()))
            .one(db)
            .await?;
        if existing.is_none() {
            role::ActiveModel {
                name: Set(kind.as_str().to_string()),
                ..Default::default()
            }
            .insert(db)
            .await?;
            info!(role = kind.as_str(), "seeded role");
        }
    }
    Ok(())
}

/// Seeds the default subject list. Idempotent.
pub async fn seed_subjects(db: &DatabaseConnection) -> Result<()> {
    for name in DEFAULT_SUBJECTS {
        let existing = Subject::find()
            .filter(subject::Column::Name.eq(name))
            .one(db)
            .await?;
        if existing.is_none() {
            subject::ActiveModel {
                name: Set(name.to_string()),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{RoleModel, SubjectModel, UserModel};
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Tables exist and are queryable
        let _: Vec<UserModel> = User::find().limit(1).all(&db).await?;
        let _: Vec<RoleModel> = Role::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_roles_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        seed_roles(&db).await?;
        seed_roles(&db).await?;

        let roles: Vec<RoleModel> = Role::find().all(&db).await?;
        assert_eq!(roles.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_subjects_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        seed_subjects(&db).await?;
        seed_subjects(&db).await?;

        let subjects: Vec<SubjectModel> = Subject::find().all(&db).await?;
        assert_eq!(subjects.len(), DEFAULT_SUBJECTS.len());
        Ok(())
    }

    #[tokio::test]
    async fn test_enrollment_pair_unique_index() -> Result<()> {
        let (db, _teacher, class) = crate::test_utils::setup_with_class().await?;
        let student = crate::test_utils::create_test_student(&db, "student@school.test").await?;

        enrollment::ActiveModel {
            student_id: Set(student.id),
            class_id: Set(class.id),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let dup = enrollment::ActiveModel {
            student_id: Set(student.id),
            class_id: Set(class.id),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(dup.is_err());
        assert!(crate::errors::is_unique_violation(&dup.unwrap_err()));
        Ok(())
    }
}
