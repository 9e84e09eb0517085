//! Reward business logic - catalog purchases and coupon redemption.
//!
//! A purchase debits the student's balance, mints a coupon with a unique
//! 8-character code, and appends a negative ledger entry, all in one
//! transaction. Codes are generated at purchase time and only revealed at
//! redemption; redemption is idempotent in the sense that a second attempt
//! fails cleanly without touching state.

use crate::{
    config::catalog::Catalog,
    core::identity::role_kind,
    core::ledger::account_for_user,
    entities::{
        Account, Coupon, LedgerEntry, RoleKind, account, coupon, ledger_entry, user,
    },
    errors::{Error, Result, is_unique_violation},
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::info;

/// Redemption codes are 8 characters drawn from A-Z and 0-9
const CODE_LENGTH: usize = 8;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Coupons expire this long after redemption
const EXPIRY_DAYS: i64 = 2;

/// Draws one candidate redemption code. Uniqueness is the caller's problem;
/// see [`generate_unique_code`].
pub fn random_code(rng: &mut impl Rng) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// Generates a redemption code that no existing coupon uses, retrying on
/// collision. The unique index on the code column is the backstop for two
/// purchases racing through this check with the same draw.
pub async fn generate_unique_code<C>(db: &C) -> Result<String>
where
    C: ConnectionTrait,
{
    let mut rng = rand::thread_rng();
    loop {
        let candidate = random_code(&mut rng);
        let taken = Coupon::find()
            .filter(coupon::Column::Code.eq(&candidate))
            .one(db)
            .await?
            .is_some();
        if !taken {
            return Ok(candidate);
        }
    }
}

/// Purchases a catalog item for the acting student, stamped with the current
/// time.
pub async fn purchase(
    db: &DatabaseConnection,
    student: &user::Model,
    item_index: usize,
    catalog: &Catalog,
) -> Result<coupon::Model> {
    purchase_at(db, student, item_index, catalog, Utc::now()).await
}

/// Purchases a catalog item with an explicit timestamp.
///
/// Validates the student role and item index, then in one transaction:
/// checks the balance against a fresh account read, debits it atomically,
/// inserts a coupon snapshotting the item's name/description/cost with a
/// fresh unique code, and appends a negative ledger entry linking to the
/// coupon. Insufficient balance leaves everything untouched.
pub async fn purchase_at(
    db: &DatabaseConnection,
    student: &user::Model,
    item_index: usize,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Result<coupon::Model> {
    if role_kind(db, student).await? != RoleKind::Student {
        return Err(Error::Authorization {
            message: "Only students may purchase rewards".to_string(),
        });
    }
    let item = catalog.item(item_index).ok_or_else(|| Error::NotFound {
        entity: "catalog item",
        id: item_index.to_string(),
    })?;

    let txn = db.begin().await?;

    // Fresh balance read inside the transaction so concurrent purchases
    // cannot both pass the check.
    let student_account = account_for_user(&txn, student.id).await?;
    if student_account.balance < item.points_cost {
        return Err(Error::InsufficientBalance {
            current: student_account.balance,
            required: item.points_cost,
        });
    }

    Account::update_many()
        .col_expr(
            account::Column::Balance,
            Expr::col(account::Column::Balance).sub(item.points_cost),
        )
        .filter(account::Column::Id.eq(student_account.id))
        .exec(&txn)
        .await?;

    let code = generate_unique_code(&txn).await?;
    let new_coupon = match (coupon::ActiveModel {
        student_id: Set(student.id),
        name: Set(item.name.clone()),
        description: Set(item.description.clone()),
        points_cost: Set(item.points_cost),
        code: Set(code.clone()),
        redeemed: Set(false),
        redeem_date: Set(None),
        ..Default::default()
    })
    .insert(&txn)
    .await
    {
        Ok(model) => model,
        Err(e) if is_unique_violation(&e) => {
            return Err(Error::Conflict {
                message: "Coupon code collision, please retry".to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    ledger_entry::ActiveModel {
        timestamp: Set(now),
        from_account_id: Set(Some(student_account.id)),
        to_account_id: Set(None),
        amount: Set(-item.points_cost),
        code: Set(Some(code)),
        coupon_id: Set(Some(new_coupon.id)),
        date_redeemed: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(
        student_id = student.id,
        coupon_id = new_coupon.id,
        item = %new_coupon.name,
        "purchased reward"
    );
    Ok(new_coupon)
}

/// Redeems a coupon, stamped with the current time.
pub async fn redeem(db: &DatabaseConnection, coupon_id: i64) -> Result<coupon::Model> {
    redeem_at(db, coupon_id, Utc::now()).await
}

/// Redeems a coupon with an explicit timestamp.
///
/// A missing coupon is [`Error::NotFound`]; one already redeemed is
/// [`Error::AlreadyProcessed`] and the second call changes nothing. On
/// success the coupon's redemption state is set and `date_redeemed` is
/// back-filled onto the purchase ledger entry when one exists. The code was
/// assigned at purchase and is never regenerated here.
pub async fn redeem_at(
    db: &DatabaseConnection,
    coupon_id: i64,
    now: DateTime<Utc>,
) -> Result<coupon::Model> {
    let txn = db.begin().await?;

    let found = Coupon::find_by_id(coupon_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "coupon",
            id: coupon_id.to_string(),
        })?;
    if found.redeemed {
        return Err(Error::AlreadyProcessed {
            message: format!("Coupon {coupon_id} has already been redeemed"),
        });
    }

    let mut update: coupon::ActiveModel = found.into();
    update.redeemed = Set(true);
    update.redeem_date = Set(Some(now));
    let redeemed = update.update(&txn).await?;

    if let Some(entry) = LedgerEntry::find()
        .filter(ledger_entry::Column::CouponId.eq(coupon_id))
        .one(&txn)
        .await?
    {
        let mut entry_update: ledger_entry::ActiveModel = entry.into();
        entry_update.date_redeemed = Set(Some(now));
        entry_update.update(&txn).await?;
    }

    txn.commit().await?;
    info!(coupon_id, "redeemed coupon");
    Ok(redeemed)
}

/// True iff the coupon was redeemed more than two days before `now`.
/// Unredeemed coupons never expire.
pub fn is_expired(target: &coupon::Model, now: DateTime<Utc>) -> bool {
    target
        .redeem_date
        .is_some_and(|redeemed_at| now - redeemed_at > Duration::days(EXPIRY_DAYS))
}

/// A student's coupons, newest first.
pub async fn coupons_for_student(
    db: &DatabaseConnection,
    student_id: i64,
) -> Result<Vec<coupon::Model>> {
    Coupon::find()
        .filter(coupon::Column::StudentId.eq(student_id))
        .order_by_desc(coupon::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
