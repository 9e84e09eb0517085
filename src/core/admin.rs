//! Admin business logic - the teacher role approval workflow.
//!
//! The `teacher_requests` row is the single source of truth: it moves from
//! pending to accepted or rejected exactly once, recording the resolving
//! admin and time. The cached flags on the user row are refreshed in the
//! same transaction so login checks stay cheap.

use crate::{
    core::identity::role_kind,
    entities::{
        RoleKind, TeacherRequest, TeacherRequestStatus, User, teacher_request, user,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

/// Admin's decision on a teacher role request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResolveAction {
    /// Grant the teacher role
    Approve,
    /// Refuse the teacher role
    Reject,
}

/// Pending teacher role requests joined with the requesting user, oldest
/// request first.
pub async fn list_pending_teacher_requests(
    db: &DatabaseConnection,
) -> Result<Vec<(teacher_request::Model, user::Model)>> {
    let rows = TeacherRequest::find()
        .filter(teacher_request::Column::Status.eq(TeacherRequestStatus::Pending))
        .find_also_related(User)
        .order_by_asc(user::Column::RoleRequestedOn)
        .all(db)
        .await?;

    rows.into_iter()
        .map(|(request, requester)| {
            let id = request.user_id;
            requester
                .map(|u| (request, u))
                .ok_or_else(|| Error::NotFound {
                    entity: "user",
                    id: id.to_string(),
                })
        })
        .collect()
}

/// Resolves a user's pending teacher role request, stamped with the current
/// time.
pub async fn resolve_teacher_request(
    db: &DatabaseConnection,
    admin: &user::Model,
    user_id: i64,
    action: ResolveAction,
) -> Result<teacher_request::Model> {
    resolve_teacher_request_at(db, admin, user_id, action, Utc::now()).await
}

/// Resolves a pending teacher role request with an explicit timestamp.
///
/// Only admins may call this. The pending request row transitions to
/// accepted or rejected with the resolving admin and time recorded, and the
/// user's cached role flags are updated in the same transaction. A user with
/// no request at all is [`Error::NotFound`]; one whose request was already
/// resolved is [`Error::AlreadyProcessed`].
pub async fn resolve_teacher_request_at(
    db: &DatabaseConnection,
    admin: &user::Model,
    user_id: i64,
    action: ResolveAction,
    now: DateTime<Utc>,
) -> Result<teacher_request::Model> {
    if role_kind(db, admin).await? != RoleKind::Admin {
        return Err(Error::Authorization {
            message: "You are not authorized to approve or reject teacher requests.".to_string(),
        });
    }

    let txn = db.begin().await?;

    let target = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "user",
            id: user_id.to_string(),
        })?;

    let request = TeacherRequest::find()
        .filter(teacher_request::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "teacher request",
            id: user_id.to_string(),
        })?;
    if request.status != TeacherRequestStatus::Pending {
        return Err(Error::AlreadyProcessed {
            message: format!("Teacher request for user {user_id} has already been resolved"),
        });
    }

    let approved = action == ResolveAction::Approve;
    let mut request_update: teacher_request::ActiveModel = request.into();
    request_update.status = Set(if approved {
        TeacherRequestStatus::Accepted
    } else {
        TeacherRequestStatus::Rejected
    });
    request_update.date_resolved = Set(Some(now));
    request_update.resolved_by_id = Set(Some(admin.id));
    let resolved = request_update.update(&txn).await?;

    // Refresh the derived cache on the user row
    let mut user_update: user::ActiveModel = target.into();
    user_update.role_approved = Set(approved);
    user_update.role_rejected = Set(!approved);
    user_update.role_request = Set(false);
    user_update.update(&txn).await?;

    txn.commit().await?;
    info!(user_id, approved, resolved_by = admin.id, "resolved teacher request");
    Ok(resolved)
}

/// The full request history joined with requester identity, ordered by when
/// the role was originally requested.
pub async fn teacher_request_history(
    db: &DatabaseConnection,
) -> Result<Vec<(teacher_request::Model, user::Model)>> {
    let rows = TeacherRequest::find()
        .find_also_related(User)
        .order_by_asc(user::Column::RoleRequestedOn)
        .all(db)
        .await?;

    rows.into_iter()
        .map(|(request, requester)| {
            let id = request.user_id;
            requester
                .map(|u| (request, u))
                .ok_or_else(|| Error::NotFound {
                    entity: "user",
                    id: id.to_string(),
                })
        })
        .collect()
}
