//! Ledger business logic - point awards, weekly caps, and account history.
//!
//! The weekly cap resets lazily: no scheduled job, just a pure comparison of
//! the last award date against today's ISO week at read time. Awards apply
//! all four mutations (student balance, teacher lifetime total, teacher
//! weekly counter, ledger entry) in a single transaction; a failure anywhere
//! rolls the whole award back.

use crate::{
    core::identity::role_kind,
    entities::{
        Account, LedgerEntry, RoleKind, User, account, ledger_entry, user,
    },
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::info;

/// True when both dates fall in the same ISO-8601 week (week-year and week
/// number both match).
pub fn same_iso_week(a: NaiveDate, b: NaiveDate) -> bool {
    a.iso_week().year() == b.iso_week().year() && a.iso_week().week() == b.iso_week().week()
}

/// Points a teacher may still award, as of `today`.
///
/// Pure derived read: the full limit when no award has happened or the last
/// award was in a different ISO week, otherwise the limit minus what was
/// already awarded this week, floored at zero.
pub fn remaining_points(
    weekly_limit: i64,
    awarded_this_week: i64,
    last_award_date: Option<NaiveDate>,
    today: NaiveDate,
) -> i64 {
    match last_award_date {
        Some(last) if same_iso_week(last, today) => (weekly_limit - awarded_this_week).max(0),
        _ => weekly_limit,
    }
}

/// Remaining points as an integer percentage of the weekly limit (floor
/// division). A zero limit yields 0 rather than dividing by zero.
pub fn remaining_point_percentage(weekly_limit: i64, remaining: i64) -> i64 {
    if weekly_limit == 0 {
        return 0;
    }
    remaining * 100 / weekly_limit
}

/// Convenience wrapper computing [`remaining_points`] from a user row.
pub fn remaining_points_for(teacher: &user::Model, today: NaiveDate) -> i64 {
    remaining_points(
        teacher.weekly_point_limit,
        teacher.points_awarded_this_week,
        teacher.last_award_date,
        today,
    )
}

/// Fetches the account owned by a user.
pub async fn account_for_user<C>(db: &C, user_id: i64) -> Result<account::Model>
where
    C: ConnectionTrait,
{
    Account::find()
        .filter(account::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "account",
            id: user_id.to_string(),
        })
}

/// Ledger history touching an account (either side), newest first.
pub async fn entries_for_account(
    db: &DatabaseConnection,
    account_id: i64,
) -> Result<Vec<ledger_entry::Model>> {
    LedgerEntry::find()
        .filter(
            Condition::any()
                .add(ledger_entry::Column::FromAccountId.eq(account_id))
                .add(ledger_entry::Column::ToAccountId.eq(account_id)),
        )
        .order_by_desc(ledger_entry::Column::Timestamp)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Awards points from the acting teacher (or admin) to a student, stamping
/// the award with the current time.
pub async fn award_points(
    db: &DatabaseConnection,
    awarder: &user::Model,
    student_id: i64,
    amount: i64,
) -> Result<ledger_entry::Model> {
    award_points_at(db, awarder, student_id, amount, Utc::now()).await
}

/// Awards points with an explicit timestamp.
///
/// Authorization: the acting principal must hold the admin or teacher role
/// (an award always debits the acting principal's own quota - there is no
/// award-on-behalf). Validates `amount >= 1` and `amount <= remaining`
/// against a fresh read of the awarder's row inside the transaction, then
/// atomically:
/// - credits the student's account balance,
/// - increments the awarder's lifetime `points_awarded`,
/// - bumps the weekly counter (resetting it first when the ISO week changed)
///   and sets `last_award_date`,
/// - appends an immutable ledger entry.
pub async fn award_points_at(
    db: &DatabaseConnection,
    awarder: &user::Model,
    student_id: i64,
    amount: i64,
    now: chrono::DateTime<Utc>,
) -> Result<ledger_entry::Model> {
    let awarder_role = role_kind(db, awarder).await?;
    if awarder_role != RoleKind::Admin && awarder_role != RoleKind::Teacher {
        return Err(Error::Authorization {
            message: "Only teachers and admins may award points".to_string(),
        });
    }
    if awarder_role == RoleKind::Teacher && !awarder.role_approved {
        return Err(Error::Authorization {
            message: "Teacher role not approved yet.".to_string(),
        });
    }
    if amount < 1 {
        return Err(Error::Validation {
            message: format!("Award amount must be at least 1 point, got {amount}"),
        });
    }

    let today = now.date_naive();
    let txn = db.begin().await?;

    // Fresh read of the awarder inside the transaction so concurrent awards
    // cannot race past the weekly cap check.
    let fresh = User::find_by_id(awarder.id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "user",
            id: awarder.id.to_string(),
        })?;

    let remaining = remaining_points_for(&fresh, today);
    if amount > remaining {
        return Err(Error::QuotaExceeded {
            remaining,
            requested: amount,
        });
    }

    let student = User::find_by_id(student_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "student",
            id: student_id.to_string(),
        })?;
    if role_kind(&txn, &student).await? != RoleKind::Student {
        return Err(Error::Validation {
            message: format!("User {student_id} is not a student"),
        });
    }

    let student_account = account_for_user(&txn, student.id).await?;
    let awarder_account = account_for_user(&txn, fresh.id).await?;

    // Atomic column updates, not read-modify-write
    Account::update_many()
        .col_expr(
            account::Column::Balance,
            Expr::col(account::Column::Balance).add(amount),
        )
        .filter(account::Column::Id.eq(student_account.id))
        .exec(&txn)
        .await?;

    Account::update_many()
        .col_expr(
            account::Column::PointsAwarded,
            Expr::col(account::Column::PointsAwarded).add(amount),
        )
        .filter(account::Column::Id.eq(awarder_account.id))
        .exec(&txn)
        .await?;

    // The weekly counter restarts from zero when the ISO week has rolled over
    let carried = match fresh.last_award_date {
        Some(last) if same_iso_week(last, today) => fresh.points_awarded_this_week,
        _ => 0,
    };
    let mut awarder_update: user::ActiveModel = fresh.into();
    awarder_update.points_awarded_this_week = Set(carried + amount);
    awarder_update.last_award_date = Set(Some(today));
    awarder_update.update(&txn).await?;

    let entry = ledger_entry::ActiveModel {
        timestamp: Set(now),
        from_account_id: Set(Some(awarder_account.id)),
        to_account_id: Set(Some(student_account.id)),
        amount: Set(amount),
        code: Set(None),
        coupon_id: Set(None),
        date_redeemed: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        awarder_id = awarder.id,
        student_id, amount, "awarded points"
    );
    Ok(entry)
}
