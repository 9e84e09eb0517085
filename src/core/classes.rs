//! Class and enrollment business logic.
//!
//! Classes get a generated display name (year group + subject initial +
//! teacher initials, numeric suffix on collision). Students ask to join via
//! a join request that the owning teacher accepts or rejects; the
//! (student, class) pair is unique for all time, so a rejected student
//! cannot re-request.

use crate::{
    core::identity::role_kind,
    entities::{
        Enrollment, JoinRequest, JoinRequestStatus, RoleKind, SchoolClass, Subject, enrollment,
        join_request, school_class, subject, user,
    },
    errors::{Error, Result, is_unique_violation},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::info;

/// Optional conjunctive filters for browsing classes. Empty filter matches
/// every class.
#[derive(Debug, Clone, Default)]
pub struct ClassFilter {
    /// Restrict to one year group
    pub year_group: Option<i32>,
    /// Restrict to one subject
    pub subject_id: Option<i64>,
    /// Restrict to one teacher
    pub teacher_id: Option<i64>,
}

/// Teacher's decision on a join request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JoinAction {
    /// Enroll the student
    Accept,
    /// Refuse the student (terminal - no re-request)
    Reject,
}

/// Scope for listing a teacher's incoming join requests
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum JoinRequestScope {
    /// All requests regardless of status
    #[default]
    All,
    /// Only unresolved requests
    Pending,
    /// Only accepted or rejected requests
    Resolved,
}

/// All subjects, alphabetically.
pub async fn list_subjects(db: &DatabaseConnection) -> Result<Vec<subject::Model>> {
    Subject::find()
        .order_by_asc(subject::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Generates a unique class display name: year group, subject initial, then
/// the teacher's initials, all uppercase, with an increasing numeric suffix
/// on collision ("9MTB", "9MTB1", ...).
pub async fn generate_class_name<C>(
    db: &C,
    year_group: i32,
    subject_name: &str,
    teacher: &user::Model,
) -> Result<String>
where
    C: ConnectionTrait,
{
    let initial = |s: &str| {
        s.chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_default()
    };
    let base = format!(
        "{year_group}{}{}{}",
        initial(subject_name),
        initial(&teacher.first_name),
        initial(&teacher.last_name)
    );

    let mut candidate = base.clone();
    let mut counter = 1;
    loop {
        let taken = SchoolClass::find()
            .filter(school_class::Column::Name.eq(&candidate))
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

/// Creates a class for the acting teacher.
///
/// If the exact (subject, year group, teacher) triple already exists the
/// existing class is returned instead of an error. Otherwise a display name
/// is generated and the class inserted; the unique index on the name is the
/// backstop against concurrent name generation.
pub async fn create_class(
    db: &DatabaseConnection,
    teacher: &user::Model,
    subject_id: i64,
    year_group: i32,
) -> Result<school_class::Model> {
    if role_kind(db, teacher).await? != RoleKind::Teacher {
        return Err(Error::Authorization {
            message: "You must be a teacher to create a class".to_string(),
        });
    }
    if !(1..=13).contains(&year_group) {
        return Err(Error::Validation {
            message: format!("Year group must be between 1 and 13, got {year_group}"),
        });
    }

    let txn = db.begin().await?;

    let subject = Subject::find_by_id(subject_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "subject",
            id: subject_id.to_string(),
        })?;

    // Soft duplicate: an identical triple hands back the existing class
    if let Some(existing) = SchoolClass::find()
        .filter(school_class::Column::SubjectId.eq(subject_id))
        .filter(school_class::Column::YearGroup.eq(year_group))
        .filter(school_class::Column::TeacherId.eq(teacher.id))
        .one(&txn)
        .await?
    {
        return Ok(existing);
    }

    let name = generate_class_name(&txn, year_group, &subject.name, teacher).await?;
    let created = match (school_class::ActiveModel {
        name: Set(name),
        subject_id: Set(subject_id),
        year_group: Set(year_group),
        teacher_id: Set(teacher.id),
        ..Default::default()
    })
    .insert(&txn)
    .await
    {
        Ok(model) => model,
        Err(e) if is_unique_violation(&e) => {
            return Err(Error::Conflict {
                message: "Class name already taken".to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    txn.commit().await?;
    info!(class_id = created.id, name = %created.name, "created class");
    Ok(created)
}

/// Browses classes with optional conjunctive filters.
pub async fn search_classes(
    db: &DatabaseConnection,
    filter: &ClassFilter,
) -> Result<Vec<school_class::Model>> {
    let mut query = SchoolClass::find();
    if let Some(year_group) = filter.year_group {
        query = query.filter(school_class::Column::YearGroup.eq(year_group));
    }
    if let Some(subject_id) = filter.subject_id {
        query = query.filter(school_class::Column::SubjectId.eq(subject_id));
    }
    if let Some(teacher_id) = filter.teacher_id {
        query = query.filter(school_class::Column::TeacherId.eq(teacher_id));
    }
    query
        .order_by_asc(school_class::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Files a join request from the acting student for a class.
///
/// At most one request per (student, class) pair ever exists, whatever its
/// status - a rejection is final. The composite unique index backs this up
/// under concurrent requests.
pub async fn request_join(
    db: &DatabaseConnection,
    student: &user::Model,
    class_id: i64,
) -> Result<join_request::Model> {
    if role_kind(db, student).await? != RoleKind::Student {
        return Err(Error::Authorization {
            message: "Only students may request to join a class".to_string(),
        });
    }

    SchoolClass::find_by_id(class_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "class",
            id: class_id.to_string(),
        })?;

    let existing = JoinRequest::find()
        .filter(join_request::Column::StudentId.eq(student.id))
        .filter(join_request::Column::ClassId.eq(class_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(Error::Conflict {
            message: "You already have a join request for this class.".to_string(),
        });
    }

    match (join_request::ActiveModel {
        student_id: Set(student.id),
        class_id: Set(class_id),
        status: Set(JoinRequestStatus::Pending),
        ..Default::default()
    })
    .insert(db)
    .await
    {
        Ok(model) => Ok(model),
        Err(e) if is_unique_violation(&e) => Err(Error::Conflict {
            message: "You already have a join request for this class.".to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Resolves a pending join request.
///
/// Only the teacher owning the class may respond. Accepting enrolls the
/// student in the same transaction; a request already accepted or rejected
/// returns [`Error::AlreadyProcessed`] and is left untouched.
pub async fn respond_to_join_request(
    db: &DatabaseConnection,
    teacher: &user::Model,
    join_request_id: i64,
    action: JoinAction,
) -> Result<join_request::Model> {
    let txn = db.begin().await?;

    let request = JoinRequest::find_by_id(join_request_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "join request",
            id: join_request_id.to_string(),
        })?;

    let class = SchoolClass::find_by_id(request.class_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "class",
            id: request.class_id.to_string(),
        })?;
    if class.teacher_id != teacher.id {
        return Err(Error::Authorization {
            message: "You are not authorized to respond to this join request!".to_string(),
        });
    }

    if request.status != JoinRequestStatus::Pending {
        return Err(Error::AlreadyProcessed {
            message: format!("Join request {join_request_id} has already been resolved"),
        });
    }

    let student_id = request.student_id;
    let mut update: join_request::ActiveModel = request.into();
    update.status = Set(match action {
        JoinAction::Accept => JoinRequestStatus::Accepted,
        JoinAction::Reject => JoinRequestStatus::Rejected,
    });
    let updated = update.update(&txn).await?;

    if action == JoinAction::Accept {
        enrollment::ActiveModel {
            student_id: Set(student_id),
            class_id: Set(class.id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    info!(
        join_request_id,
        accepted = action == JoinAction::Accept,
        "resolved join request"
    );
    Ok(updated)
}

/// A student's own join requests.
pub async fn join_requests_for_student(
    db: &DatabaseConnection,
    student_id: i64,
) -> Result<Vec<join_request::Model>> {
    JoinRequest::find()
        .filter(join_request::Column::StudentId.eq(student_id))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Join requests targeting any class owned by a teacher, optionally limited
/// to pending or resolved ones.
pub async fn join_requests_for_teacher(
    db: &DatabaseConnection,
    teacher_id: i64,
    scope: JoinRequestScope,
) -> Result<Vec<join_request::Model>> {
    let class_ids: Vec<i64> = SchoolClass::find()
        .filter(school_class::Column::TeacherId.eq(teacher_id))
        .all(db)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut query = JoinRequest::find().filter(join_request::Column::ClassId.is_in(class_ids));
    query = match scope {
        JoinRequestScope::All => query,
        JoinRequestScope::Pending => {
            query.filter(join_request::Column::Status.eq(JoinRequestStatus::Pending))
        }
        JoinRequestScope::Resolved => {
            query.filter(join_request::Column::Status.ne(JoinRequestStatus::Pending))
        }
    };
    query.all(db).await.map_err(Into::into)
}

/// Students enrolled in a class.
pub async fn enrollments_for_class(
    db: &DatabaseConnection,
    class_id: i64,
) -> Result<Vec<enrollment::Model>> {
    Enrollment::find()
        .filter(enrollment::Column::ClassId.eq(class_id))
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_class_generates_name() -> Result<()> {
        let db = setup_test_db().await?;
        let teacher = create_custom_teacher(&db, "tom@school.test", "Tom", "Barnes").await?;
        let maths = subject_named(&db, "Maths").await?;

        let class = create_class(&db, &teacher, maths.id, 9).await?;
        assert_eq!(class.name, "9MTB");
        assert_eq!(class.teacher_id, teacher.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_class_duplicate_triple_returns_existing() -> Result<()> {
        let db = setup_test_db().await?;
        let teacher = create_custom_teacher(&db, "tom@school.test", "Tom", "Barnes").await?;
        let maths = subject_named(&db, "Maths").await?;

        let first = create_class(&db, &teacher, maths.id, 9).await?;
        let second = create_class(&db, &teacher, maths.id, 9).await?;
        assert_eq!(first.id, second.id);

        let all = search_classes(&db, &ClassFilter::default()).await?;
        assert_eq!(all.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_class_name_collision_gets_suffix() -> Result<()> {
        let db = setup_test_db().await?;
        // Different teachers sharing initials produce the same base name
        let tom = create_custom_teacher(&db, "tom@school.test", "Tom", "Barnes").await?;
        let tia = create_custom_teacher(&db, "tia@school.test", "Tia", "Brown").await?;
        let maths = subject_named(&db, "Maths").await?;

        let first = create_class(&db, &tom, maths.id, 9).await?;
        let second = create_class(&db, &tia, maths.id, 9).await?;
        assert_eq!(first.name, "9MTB");
        assert_eq!(second.name, "9MTB1");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_class_requires_teacher_role() -> Result<()> {
        let db = setup_test_db().await?;
        let student = create_test_student(&db, "stu@school.test").await?;
        let maths = subject_named(&db, "Maths").await?;

        let result = create_class(&db, &student, maths.id, 9).await;
        assert!(matches!(result, Err(Error::Authorization { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_class_validates_inputs() -> Result<()> {
        let db = setup_test_db().await?;
        let teacher = create_test_teacher(&db, "teach@school.test").await?;
        let maths = subject_named(&db, "Maths").await?;

        let result = create_class(&db, &teacher, maths.id, 0).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let result = create_class(&db, &teacher, 9999, 9).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "subject",
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_search_classes_conjunctive_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let tom = create_custom_teacher(&db, "tom@school.test", "Tom", "Barnes").await?;
        let sue = create_custom_teacher(&db, "sue@school.test", "Sue", "Ellis").await?;
        let maths = subject_named(&db, "Maths").await?;
        let art = subject_named(&db, "Art").await?;

        create_class(&db, &tom, maths.id, 9).await?;
        create_class(&db, &tom, art.id, 10).await?;
        create_class(&db, &sue, maths.id, 9).await?;

        // No filter returns everything
        let all = search_classes(&db, &ClassFilter::default()).await?;
        assert_eq!(all.len(), 3);

        let year_nine = search_classes(
            &db,
            &ClassFilter {
                year_group: Some(9),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(year_nine.len(), 2);

        // Filters combine with AND
        let toms_year_nine = search_classes(
            &db,
            &ClassFilter {
                year_group: Some(9),
                teacher_id: Some(tom.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(toms_year_nine.len(), 1);
        assert_eq!(toms_year_nine[0].teacher_id, tom.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_request_join_duplicate_rejected() -> Result<()> {
        let (db, teacher, class) = setup_with_class().await?;
        let _ = teacher;
        let student = create_test_student(&db, "stu@school.test").await?;

        request_join(&db, &student, class.id).await?;
        let result = request_join(&db, &student, class.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_request_join_after_rejection_still_conflicts() -> Result<()> {
        let (db, teacher, class) = setup_with_class().await?;
        let student = create_test_student(&db, "stu@school.test").await?;

        let request = request_join(&db, &student, class.id).await?;
        respond_to_join_request(&db, &teacher, request.id, JoinAction::Reject).await?;

        // Rejection is final
        let result = request_join(&db, &student, class.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_request_join_requires_student_role() -> Result<()> {
        let (db, teacher, class) = setup_with_class().await?;
        let result = request_join(&db, &teacher, class.id).await;
        assert!(matches!(result, Err(Error::Authorization { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_request_join_unknown_class() -> Result<()> {
        let db = setup_test_db().await?;
        let student = create_test_student(&db, "stu@school.test").await?;

        let result = request_join(&db, &student, 9999).await;
        assert!(matches!(
            result,
            Err(Error::NotFound { entity: "class", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_respond_accept_enrolls_student() -> Result<()> {
        let (db, teacher, class) = setup_with_class().await?;
        let student = create_test_student(&db, "stu@school.test").await?;
        let request = request_join(&db, &student, class.id).await?;

        let updated =
            respond_to_join_request(&db, &teacher, request.id, JoinAction::Accept).await?;
        assert_eq!(updated.status, JoinRequestStatus::Accepted);

        let enrolled = enrollments_for_class(&db, class.id).await?;
        assert_eq!(enrolled.len(), 1);
        assert_eq!(enrolled[0].student_id, student.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_respond_reject_does_not_enroll() -> Result<()> {
        let (db, teacher, class) = setup_with_class().await?;
        let student = create_test_student(&db, "stu@school.test").await?;
        let request = request_join(&db, &student, class.id).await?;

        let updated =
            respond_to_join_request(&db, &teacher, request.id, JoinAction::Reject).await?;
        assert_eq!(updated.status, JoinRequestStatus::Rejected);
        assert!(enrollments_for_class(&db, class.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_respond_requires_owning_teacher() -> Result<()> {
        let (db, _teacher, class) = setup_with_class().await?;
        let student = create_test_student(&db, "stu@school.test").await?;
        let interloper = create_custom_teacher(&db, "other@school.test", "Ole", "Vik").await?;
        let request = request_join(&db, &student, class.id).await?;

        let result =
            respond_to_join_request(&db, &interloper, request.id, JoinAction::Accept).await;
        assert!(matches!(result, Err(Error::Authorization { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_respond_to_resolved_request_already_processed() -> Result<()> {
        let (db, teacher, class) = setup_with_class().await?;
        let student = create_test_student(&db, "stu@school.test").await?;
        let request = request_join(&db, &student, class.id).await?;

        respond_to_join_request(&db, &teacher, request.id, JoinAction::Accept).await?;
        let result = respond_to_join_request(&db, &teacher, request.id, JoinAction::Reject).await;
        assert!(matches!(result, Err(Error::AlreadyProcessed { .. })));

        // The accepted state survived the second call
        let requests = join_requests_for_student(&db, student.id).await?;
        assert_eq!(requests[0].status, JoinRequestStatus::Accepted);
        Ok(())
    }

    #[tokio::test]
    async fn test_join_requests_for_teacher_scopes() -> Result<()> {
        let (db, teacher, class) = setup_with_class().await?;
        let ann = create_test_student(&db, "ann@school.test").await?;
        let bob = create_test_student(&db, "bob@school.test").await?;

        let first = request_join(&db, &ann, class.id).await?;
        request_join(&db, &bob, class.id).await?;
        respond_to_join_request(&db, &teacher, first.id, JoinAction::Accept).await?;

        let all = join_requests_for_teacher(&db, teacher.id, JoinRequestScope::All).await?;
        assert_eq!(all.len(), 2);

        let pending = join_requests_for_teacher(&db, teacher.id, JoinRequestScope::Pending).await?;
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].student_id, bob.id);

        let resolved =
            join_requests_for_teacher(&db, teacher.id, JoinRequestScope::Resolved).await?;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].student_id, ann.id);
        Ok(())
    }
}
