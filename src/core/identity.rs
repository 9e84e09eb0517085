//! Identity business logic - registration, authentication, and the
//! username/password policies.
//!
//! Registration creates the user, their account, and (for teacher requests)
//! the pending approval row inside one transaction, so a duplicate email can
//! never leave an orphan account behind. Roles are always resolved through
//! the seeded `roles` table by name; no numeric role id appears in any check.

use crate::{
    entities::{
        Role, RoleKind, User, account, role, teacher_request, user,
        user::DEFAULT_WEEKLY_POINT_LIMIT,
    },
    errors::{Error, Result, is_unique_violation},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::info;

/// Symbols accepted by the password strength check
const PASSWORD_SYMBOLS: &str = "!@#$%^&*()/";

/// Validates a password against the acceptance policy.
///
/// Basic bounds first: length must be in [7, 25]. Then the strength score,
/// one point each for length >= 8, a digit, an uppercase letter, and a symbol
/// from `!@#$%^&*()/`; all four are required. The error message lists every
/// missing requirement, not just the first.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 7 {
        return Err(Error::Validation {
            message: "Password must be at least 7 characters.".to_string(),
        });
    }
    if password.len() > 25 {
        return Err(Error::Validation {
            message: "Password can only be 25 or less characters.".to_string(),
        });
    }

    let mut missing = Vec::new();
    if password.len() < 8 {
        missing.push("Password must be at least 8 characters.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        missing.push("Password must contain at least one digit.");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        missing.push("Password must contain at least one uppercase letter.");
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        missing.push("Password must contain at least one symbol (!@#$%^&*()/).");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation {
            message: missing.join(", "),
        })
    }
}

/// Hashes a password into PHC string format.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Verifies a password against a stored PHC hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Generates a globally unique username: lowercase first three letters of
/// each name (shorter names are used whole), with an increasing numeric
/// suffix on collision ("annlee", "annlee1", "annlee2", ...).
pub async fn generate_username<C>(db: &C, first_name: &str, last_name: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    let prefix = |s: &str| s.chars().take(3).collect::<String>().to_lowercase();
    let base = format!("{}{}", prefix(first_name), prefix(last_name));

    let mut candidate = base.clone();
    let mut counter = 1;
    loop {
        let taken = User::find()
            .filter(user::Column::UserName.eq(&candidate))
            .one(db)
            .await?
            .is_some();
        if !taken {
            return Ok(candidate);
        }
        candidate = format!("{base}{counter}");
        counter += 1;
    }
}

fn validate_names(first_name: &str, last_name: &str) -> Result<()> {
    let bad = |s: &str| s.len() < 2 || s.chars().any(|c| c.is_ascii_digit());
    if bad(first_name) || bad(last_name) {
        return Err(Error::Validation {
            message: "First name and last name must not contain numbers and should be at least 2 characters long.".to_string(),
        });
    }
    Ok(())
}

/// Resolves a user's role through the `roles` table.
pub async fn role_kind<C>(db: &C, target: &user::Model) -> Result<RoleKind>
where
    C: ConnectionTrait,
{
    let role = Role::find_by_id(target.role_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "role",
            id: target.role_id.to_string(),
        })?;
    RoleKind::from_name(&role.name).ok_or_else(|| Error::Config {
        message: format!("Unknown role name in database: {}", role.name),
    })
}

/// Registers a new user with the requested role.
///
/// Only `student` and `teacher` are requestable; `admin` accounts are seeded.
/// A teacher registration is created unapproved with a pending
/// [`teacher_request`] row, and cannot authenticate until an admin approves
/// it. The user, their account, and the optional request row are inserted in
/// one transaction; a duplicate email rolls all of it back and returns
/// [`Error::Conflict`].
pub async fn register(
    db: &DatabaseConnection,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
    requested_role: RoleKind,
) -> Result<user::Model> {
    if requested_role == RoleKind::Admin {
        return Err(Error::Validation {
            message: "Invalid role selected".to_string(),
        });
    }
    if email.len() < 4 {
        return Err(Error::Validation {
            message: "Email must be greater than 3 characters.".to_string(),
        });
    }
    validate_names(first_name, last_name)?;
    validate_password(password)?;

    let password_hash = hash_password(password)?;
    let is_teacher_request = requested_role == RoleKind::Teacher;

    let txn = db.begin().await?;

    let role_row = Role::find()
        .filter(role::Column::Name.eq(requested_role.as_str()))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::Config {
            message: format!("Role '{requested_role}' has not been seeded"),
        })?;

    // Pre-check for a friendly error; the unique index is the backstop.
    let duplicate = User::find()
        .filter(user::Column::Email.eq(email))
        .one(&txn)
        .await?;
    if duplicate.is_some() {
        return Err(Error::Conflict {
            message: "Email address already exists".to_string(),
        });
    }

    let user_name = generate_username(&txn, first_name, last_name).await?;
    let now = chrono::Utc::now();

    let new_user = user::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        user_name: Set(user_name),
        role_id: Set(role_row.id),
        role_approved: Set(false),
        role_request: Set(is_teacher_request),
        role_rejected: Set(false),
        role_requested_on: Set(is_teacher_request.then_some(now)),
        weekly_point_limit: Set(DEFAULT_WEEKLY_POINT_LIMIT),
        points_awarded_this_week: Set(0),
        last_award_date: Set(None),
        ..Default::default()
    };
    let created = match new_user.insert(&txn).await {
        Ok(model) => model,
        Err(e) if is_unique_violation(&e) => {
            return Err(Error::Conflict {
                message: "Email address already exists".to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    account::ActiveModel {
        user_id: Set(created.id),
        balance: Set(0),
        points_awarded: Set(0),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if is_teacher_request {
        teacher_request::ActiveModel {
            user_id: Set(created.id),
            status: Set(teacher_request::TeacherRequestStatus::Pending),
            date_resolved: Set(None),
            resolved_by_id: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    info!(
        user_id = created.id,
        role = requested_role.as_str(),
        "registered user"
    );
    Ok(created)
}

/// Authenticates a user by email and password.
///
/// Unknown email and wrong password are distinct failures; a teacher whose
/// role request has not been approved is refused with an authorization error
/// even when the password is correct.
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> Result<user::Model> {
    let found = User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "user",
            id: email.to_string(),
        })?;

    if !verify_password(password, &found.password_hash)? {
        return Err(Error::Validation {
            message: "Incorrect password, try again.".to_string(),
        });
    }

    if role_kind(db, &found).await? == RoleKind::Teacher && !found.role_approved {
        return Err(Error::Authorization {
            message: "Teacher role not approved yet.".to_string(),
        });
    }

    Ok(found)
}

/// Creates an admin user with an account if no user with this email exists,
/// returning the existing user otherwise. Used by the setup binary; admins
/// are never created through [`register`].
pub async fn ensure_admin(
    db: &DatabaseConnection,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: &str,
) -> Result<user::Model> {
    if let Some(existing) = User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    validate_password(password)?;
    let password_hash = hash_password(password)?;

    let txn = db.begin().await?;

    let admin_role = Role::find()
        .filter(role::Column::Name.eq(RoleKind::Admin.as_str()))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::Config {
            message: "Role 'admin' has not been seeded".to_string(),
        })?;

    let user_name = generate_username(&txn, first_name, last_name).await?;
    let admin = user::ActiveModel {
        email: Set(email.to_string()),
        password_hash: Set(password_hash),
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        user_name: Set(user_name),
        role_id: Set(admin_role.id),
        role_approved: Set(true),
        role_request: Set(false),
        role_rejected: Set(false),
        role_requested_on: Set(None),
        weekly_point_limit: Set(DEFAULT_WEEKLY_POINT_LIMIT),
        points_awarded_this_week: Set(0),
        last_award_date: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    account::ActiveModel {
        user_id: Set(admin.id),
        balance: Set(0),
        points_awarded: Set(0),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(user_id = admin.id, "seeded admin user");
    Ok(admin)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{Account, TeacherRequest};
    use crate::test_utils::*;

    #[test]
    fn test_validate_password_accepts_strong() {
        assert!(validate_password("Str0ng!pass").is_ok());
    }

    #[test]
    fn test_validate_password_length_bounds() {
        let result = validate_password("Ab1!x");
        assert!(matches!(result, Err(Error::Validation { .. })));

        let long = format!("A1!{}", "x".repeat(30));
        let result = validate_password(&long);
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[test]
    fn test_validate_password_lists_every_missing_requirement() {
        // 7 chars, no digit, no uppercase, no symbol: all four rules fail
        let err = validate_password("abcdefg").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("at least 8 characters"));
        assert!(message.contains("one digit"));
        assert!(message.contains("one uppercase letter"));
        assert!(message.contains("one symbol"));
    }

    #[test]
    fn test_validate_password_single_missing_requirement() {
        let err = validate_password("Abcdefg1").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("one symbol"));
        assert!(!message.contains("one digit"));
    }

    #[test]
    fn test_password_hash_round_trip() -> Result<()> {
        let hash = hash_password("Str0ng!pass")?;
        assert!(verify_password("Str0ng!pass", &hash)?);
        assert!(!verify_password("wrong-password", &hash)?);
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_username_basic_and_collision() -> Result<()> {
        let db = setup_test_db().await?;

        assert_eq!(generate_username(&db, "Ann", "Lee").await?, "annlee");

        register(&db, "ann1@school.test", "Ann", "Lee", "Str0ng!pass", RoleKind::Student).await?;
        assert_eq!(generate_username(&db, "Ann", "Lee").await?, "annlee1");

        register(&db, "ann2@school.test", "Ann", "Lee", "Str0ng!pass", RoleKind::Student).await?;
        assert_eq!(generate_username(&db, "Ann", "Lee").await?, "annlee2");
        Ok(())
    }

    #[tokio::test]
    async fn test_generate_username_truncates_long_names() -> Result<()> {
        let db = setup_test_db().await?;
        assert_eq!(
            generate_username(&db, "Alexandra", "Fitzgerald").await?,
            "alefit"
        );
        // Names shorter than three characters are used whole
        assert_eq!(generate_username(&db, "Jo", "Ng").await?, "jong");
        Ok(())
    }

    #[tokio::test]
    async fn test_register_student() -> Result<()> {
        let db = setup_test_db().await?;

        let student = register(
            &db,
            "sam@school.test",
            "Sam",
            "Hill",
            "Str0ng!pass",
            RoleKind::Student,
        )
        .await?;

        assert_eq!(student.user_name, "samhil");
        assert!(!student.role_request);
        assert_eq!(role_kind(&db, &student).await?, RoleKind::Student);

        // Account created in the same transaction with zero balance
        let account = crate::core::ledger::account_for_user(&db, student.id).await?;
        assert_eq!(account.balance, 0);
        assert_eq!(account.points_awarded, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_rejects_admin_role() -> Result<()> {
        let db = setup_test_db().await?;
        let result = register(
            &db,
            "evil@school.test",
            "Eve",
            "Adams",
            "Str0ng!pass",
            RoleKind::Admin,
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_duplicate_email_no_partial_state() -> Result<()> {
        let db = setup_test_db().await?;

        register(&db, "dup@school.test", "Ann", "Lee", "Str0ng!pass", RoleKind::Student).await?;
        let result = register(
            &db,
            "dup@school.test",
            "Bob",
            "Ray",
            "Str0ng!pass",
            RoleKind::Teacher,
        )
        .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        // Exactly one user, one account, and no stray teacher request
        assert_eq!(User::find().all(&db).await?.len(), 1);
        assert_eq!(Account::find().all(&db).await?.len(), 1);
        assert_eq!(TeacherRequest::find().all(&db).await?.len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_teacher_creates_pending_request() -> Result<()> {
        let db = setup_test_db().await?;

        let teacher = register(
            &db,
            "teach@school.test",
            "Tom",
            "Barnes",
            "Str0ng!pass",
            RoleKind::Teacher,
        )
        .await?;

        assert!(teacher.role_request);
        assert!(!teacher.role_approved);
        assert!(teacher.role_requested_on.is_some());

        let requests = TeacherRequest::find().all(&db).await?;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user_id, teacher.id);
        assert_eq!(
            requests[0].status,
            teacher_request::TeacherRequestStatus::Pending
        );
        assert!(requests[0].date_resolved.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_authenticate_paths() -> Result<()> {
        let db = setup_test_db().await?;
        register(&db, "ann@school.test", "Ann", "Lee", "Str0ng!pass", RoleKind::Student).await?;

        // Success
        let user = authenticate(&db, "ann@school.test", "Str0ng!pass").await?;
        assert_eq!(user.email, "ann@school.test");

        // Wrong password is distinct from unknown email
        let result = authenticate(&db, "ann@school.test", "wrong-password").await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = authenticate(&db, "nobody@school.test", "Str0ng!pass").await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_authenticate_blocks_unapproved_teacher() -> Result<()> {
        let db = setup_test_db().await?;
        register(
            &db,
            "teach@school.test",
            "Tom",
            "Barnes",
            "Str0ng!pass",
            RoleKind::Teacher,
        )
        .await?;

        let result = authenticate(&db, "teach@school.test", "Str0ng!pass").await;
        assert!(matches!(result, Err(Error::Authorization { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_admin_idempotent() -> Result<()> {
        let db = setup_test_db().await?;

        let first = ensure_admin(&db, "admin@school.test", "Ada", "Root", "Str0ng!pass").await?;
        let second = ensure_admin(&db, "admin@school.test", "Ada", "Root", "Str0ng!pass").await?;
        assert_eq!(first.id, second.id);
        assert_eq!(role_kind(&db, &first).await?, RoleKind::Admin);
        Ok(())
    }
}
