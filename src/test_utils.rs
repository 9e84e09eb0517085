//! Shared helpers for tests. Every test runs against a fresh in-memory
//! SQLite database with the schema created and roles/subjects seeded.

use crate::{
    config::database::{create_tables, seed_roles, seed_subjects},
    core::{
        classes::create_class,
        identity::{ensure_admin, register},
    },
    entities::{
        Account, RoleKind, Subject, TeacherRequest, TeacherRequestStatus, account, school_class,
        subject, teacher_request, user,
    },
    errors::{Error, Result},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
    sea_query::Expr,
};

/// Password satisfying every strength requirement
pub const TEST_PASSWORD: &str = "Str0ng!pass";

/// Fresh in-memory database with schema, roles, and subjects in place.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    create_tables(&db).await?;
    seed_roles(&db).await?;
    seed_subjects(&db).await?;
    Ok(db)
}

/// Registers a student with a fixed name.
pub async fn create_test_student(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    register(db, email, "Stu", "Dent", TEST_PASSWORD, RoleKind::Student).await
}

/// Registers a teacher and approves them, so they can act immediately.
pub async fn create_custom_teacher(
    db: &DatabaseConnection,
    email: &str,
    first_name: &str,
    last_name: &str,
) -> Result<user::Model> {
    let teacher = register(db, email, first_name, last_name, TEST_PASSWORD, RoleKind::Teacher)
        .await?;

    let request = TeacherRequest::find()
        .filter(teacher_request::Column::UserId.eq(teacher.id))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "teacher request",
            id: teacher.id.to_string(),
        })?;
    let mut request_update: teacher_request::ActiveModel = request.into();
    request_update.status = Set(TeacherRequestStatus::Accepted);
    request_update.date_resolved = Set(Some(chrono::Utc::now()));
    request_update.update(db).await?;

    let mut user_update: user::ActiveModel = teacher.into();
    user_update.role_approved = Set(true);
    user_update.role_request = Set(false);
    user_update.update(db).await.map_err(Into::into)
}

/// Approved teacher with a fixed name.
pub async fn create_test_teacher(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    create_custom_teacher(db, email, "Tess", "Moor").await
}

/// Seeded admin user.
pub async fn create_test_admin(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    ensure_admin(db, email, "Ada", "Root", TEST_PASSWORD).await
}

/// Overwrites a user's account balance directly.
pub async fn set_balance(db: &DatabaseConnection, user_id: i64, amount: i64) -> Result<()> {
    Account::update_many()
        .col_expr(account::Column::Balance, Expr::value(amount))
        .filter(account::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Looks up a seeded subject by name.
pub async fn subject_named(db: &DatabaseConnection, name: &str) -> Result<subject::Model> {
    Subject::find()
        .filter(subject::Column::Name.eq(name))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "subject",
            id: name.to_string(),
        })
}

/// Database with one approved teacher owning one year 9 Maths class.
pub async fn setup_with_class()
-> Result<(DatabaseConnection, user::Model, school_class::Model)> {
    let db = setup_test_db().await?;
    let teacher = create_test_teacher(&db, "teacher@school.test").await?;
    let maths = subject_named(&db, "Maths").await?;
    let class = create_class(&db, &teacher, maths.id, 9).await?;
    Ok((db, teacher, class))
}
