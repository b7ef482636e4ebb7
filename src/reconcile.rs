//! Goal snapshot reconciliation.
//!
//! Goals carry `current_amount`/`current_count` snapshots of the current
//! month's ledger activity in a category. The checker recomputes that
//! aggregate and reports goals whose snapshot disagrees; the sync path writes
//! the aggregate back. Ledger writes call [`refresh_linked_goals`] inside
//! their own transaction, so the aggregate is the source of truth and the
//! snapshot is a cache of it.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use libsql::Connection;
use time::Date;
use tower_sessions::Session;

use crate::auth::get_current_user;
use crate::categories::{find_category, find_category_by_name};
use crate::error::DomainError;
use crate::goals::load_active_goals;
use crate::models::{
    Category, Goal, GoalMismatch, ReconcileQuery, ReconcileResponse, SyncGoalsResponse,
    TransactionKind,
};
use crate::utils::{MonthRange, now_rfc3339, round_cents, today};
use crate::{AppState, with_transaction};

/// Sum and row count of one category's ledger rows over a date range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub amount: f64,
    pub count: i64,
}

fn cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

impl Aggregate {
    /// Compares at cent precision so float summation noise is not reported as drift.
    pub fn matches(&self, goal: &Goal) -> bool {
        cents(self.amount) == cents(goal.current_amount) && self.count == goal.current_count
    }
}

pub async fn month_aggregate(
    conn: &Connection,
    user_id: &str,
    kind: TransactionKind,
    category_id: &str,
    range: &MonthRange,
) -> Result<Aggregate, DomainError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT COALESCE(SUM(amount), 0.0), COUNT(*) FROM {} WHERE owner_user_id = ? AND category_id = ? AND date BETWEEN ? AND ?",
                kind.table()
            ),
            (user_id, category_id, range.start.as_str(), range.end.as_str()),
        )
        .await
        .map_err(DomainError::query("failed to aggregate transactions"))?;

    let row = rows
        .next()
        .await
        .map_err(DomainError::query("failed to read aggregate"))?
        .ok_or_else(|| DomainError::Query("empty aggregate".to_string()))?;

    let amount: f64 = row
        .get(0)
        .map_err(DomainError::query("invalid aggregate data"))?;
    let count: i64 = row
        .get(1)
        .map_err(DomainError::query("invalid aggregate data"))?;

    Ok(Aggregate {
        amount: round_cents(amount),
        count,
    })
}

/// Active goals whose stored snapshot disagrees with the current-month
/// aggregate of `category_id`.
///
/// Every active goal is a candidate, linked or not; each is compared against
/// the given category, read from the ledger its type tracks. Any query error
/// aborts the whole check.
pub async fn find_mismatched_goals(
    conn: &Connection,
    user_id: &str,
    category_id: &str,
    today: Date,
) -> Result<Vec<GoalMismatch>, DomainError> {
    let range = MonthRange::containing(today);
    let goals = load_active_goals(conn, user_id).await?;

    let mut income: Option<Aggregate> = None;
    let mut expense: Option<Aggregate> = None;
    let mut mismatched = Vec::new();

    for goal in goals {
        let kind = goal.goal_type.source_kind();
        let slot = match kind {
            TransactionKind::Income => &mut income,
            TransactionKind::Expense => &mut expense,
        };
        let aggregate = match slot {
            Some(aggregate) => *aggregate,
            None => {
                let aggregate = month_aggregate(conn, user_id, kind, category_id, &range).await?;
                *slot = Some(aggregate);
                aggregate
            }
        };

        if !aggregate.matches(&goal) {
            mismatched.push(GoalMismatch {
                stored_amount: goal.current_amount,
                stored_count: goal.current_count,
                actual_amount: aggregate.amount,
                actual_count: aggregate.count,
                goal,
            });
        }
    }

    Ok(mismatched)
}

/// Rewrites the snapshot of every active goal linked to `category_id` (or to
/// any category when `None`) from its own category's month aggregate.
/// Returns the goals that changed.
pub async fn refresh_linked_goals(
    conn: &Connection,
    user_id: &str,
    category_id: Option<&str>,
    today: Date,
) -> Result<Vec<Goal>, DomainError> {
    let range = MonthRange::containing(today);
    let goals = load_active_goals(conn, user_id).await?;
    let mut updated = Vec::new();

    for mut goal in goals {
        let Some(goal_category) = goal.category_id.clone() else {
            continue;
        };
        if category_id.is_some_and(|c| c != goal_category) {
            continue;
        }

        let aggregate = month_aggregate(
            conn,
            user_id,
            goal.goal_type.source_kind(),
            &goal_category,
            &range,
        )
        .await?;
        if aggregate.matches(&goal) {
            continue;
        }

        let now = now_rfc3339().map_err(|(_, msg)| DomainError::Query(msg))?;
        conn.execute(
            "UPDATE goals SET current_amount = ?, current_count = ?, updated_at = ? WHERE id = ? AND owner_user_id = ?",
            (
                aggregate.amount,
                aggregate.count,
                now.as_str(),
                goal.id.as_str(),
                user_id,
            ),
        )
        .await
        .map_err(DomainError::query("failed to refresh goal snapshot"))?;

        tracing::debug!(
            goal_id = %goal.id,
            stored_amount = goal.current_amount,
            actual_amount = aggregate.amount,
            "goal snapshot refreshed"
        );
        goal.current_amount = aggregate.amount;
        goal.current_count = aggregate.count;
        goal.updated_at = now;
        updated.push(goal);
    }

    Ok(updated)
}

/// Resolves the category a check is scoped to. Ids win over names; names are
/// unique per owner, so either identifies one category.
async fn resolve_category(
    conn: &Connection,
    user_id: &str,
    query: &ReconcileQuery,
) -> Result<Category, DomainError> {
    if let Some(id) = query.category_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return find_category(conn, user_id, id)
            .await
            .map_err(|(_, msg)| DomainError::Query(msg))?
            .ok_or(DomainError::NotFound("Category"));
    }
    if let Some(name) = query.category_name.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return find_category_by_name(conn, user_id, name)
            .await?
            .ok_or(DomainError::NotFound("Category"));
    }
    Err(DomainError::Validation(
        "category_id or category_name is required".to_string(),
    ))
}

pub async fn check_goals(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<ReconcileQuery>,
) -> Result<(StatusCode, Json<ReconcileResponse>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let today = today();
    let range = MonthRange::containing(today);

    let conn = app_state.main_db.read().await;
    let category = resolve_category(&conn, &user.id, &query).await?;
    let mismatched_goals = find_mismatched_goals(&conn, &user.id, &category.id, today).await?;

    if !mismatched_goals.is_empty() {
        tracing::info!(
            user_id = %user.id,
            category_id = %category.id,
            mismatched = mismatched_goals.len(),
            "goal snapshots out of sync"
        );
    }

    Ok((
        StatusCode::OK,
        Json(ReconcileResponse {
            category_id: category.id,
            category_name: category.name,
            month_start: range.start,
            month_end: range.end,
            mismatched_goals,
        }),
    ))
}

pub async fn sync_goals(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<(StatusCode, Json<SyncGoalsResponse>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let today = today();
    let user_id = user.id.clone();

    let updated_goals = with_transaction(&app_state.main_db, |conn| {
        Box::pin(async move { refresh_linked_goals(conn, &user_id, None, today).await })
    })
    .await
    .map_err(|e: DomainError| -> (StatusCode, String) { e.into() })?;

    Ok((StatusCode::OK, Json(SyncGoalsResponse { updated_goals })))
}
