use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use libsql::Connection;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::get_current_user;
use crate::categories::find_category;
use crate::constants::*;
use crate::error::DomainError;
use crate::goal_progress::{GoalProgress, goal_progress};
use crate::models::{
    ChallengeMode, CreateGoalPayload, GetGoalsQuery, GetGoalsResponse, Goal, GoalStatus, GoalType,
    UpdateGoalPayload, UpdateGoalStatusPayload,
};
use crate::reconcile::{month_aggregate, refresh_linked_goals};
use crate::utils::{
    MonthRange, first_count, format_date, normalize_optional, now_rfc3339, round_cents, today,
    validate_amount, validate_date, validate_limit, validate_offset, validate_optional_length,
    validate_string_length,
};
use crate::{AppState, with_transaction};

pub const GOAL_COLUMNS: &str = "id, category_id, title, description, reason, type, target_amount, current_amount, target_count, current_count, target_date, status, created_from_date, challenge_mode, created_at, updated_at";

fn invalid_goal(e: libsql::Error) -> DomainError {
    tracing::error!(error = %e, "invalid goal row");
    DomainError::Query("invalid goal data".to_string())
}

pub fn extract_goal_from_row(row: &libsql::Row) -> Result<Goal, DomainError> {
    let unknown = || DomainError::Query("invalid goal data".to_string());

    let goal_type: String = row.get(5).map_err(invalid_goal)?;
    let status: String = row.get(11).map_err(invalid_goal)?;
    let challenge_mode: String = row.get(13).map_err(invalid_goal)?;

    Ok(Goal {
        id: row.get(0).map_err(invalid_goal)?,
        category_id: row.get(1).map_err(invalid_goal)?,
        title: row.get(2).map_err(invalid_goal)?,
        description: row.get(3).map_err(invalid_goal)?,
        reason: row.get(4).map_err(invalid_goal)?,
        goal_type: GoalType::parse(&goal_type).ok_or_else(unknown)?,
        target_amount: row.get(6).map_err(invalid_goal)?,
        current_amount: row.get(7).map_err(invalid_goal)?,
        target_count: row.get(8).map_err(invalid_goal)?,
        current_count: row.get(9).map_err(invalid_goal)?,
        target_date: row.get(10).map_err(invalid_goal)?,
        status: GoalStatus::parse(&status).ok_or_else(unknown)?,
        created_from_date: row.get(12).map_err(invalid_goal)?,
        challenge_mode: ChallengeMode::parse(&challenge_mode).ok_or_else(unknown)?,
        created_at: row.get(14).map_err(invalid_goal)?,
        updated_at: row.get(15).map_err(invalid_goal)?,
    })
}

async fn collect_goals(mut rows: libsql::Rows) -> Result<Vec<Goal>, DomainError> {
    let mut goals = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(DomainError::query("failed to read goals"))?
    {
        goals.push(extract_goal_from_row(&row)?);
    }
    Ok(goals)
}

pub async fn load_goal(
    conn: &Connection,
    user_id: &str,
    goal_id: &str,
) -> Result<Option<Goal>, DomainError> {
    let rows = conn
        .query(
            &format!(
                "SELECT {} FROM goals WHERE id = ? AND owner_user_id = ?",
                GOAL_COLUMNS
            ),
            (goal_id, user_id),
        )
        .await
        .map_err(DomainError::query("failed to query goal"))?;
    Ok(collect_goals(rows).await?.into_iter().next())
}

pub async fn load_active_goals(conn: &Connection, user_id: &str) -> Result<Vec<Goal>, DomainError> {
    load_goals_by_status(conn, user_id, Some(GoalStatus::Active)).await
}

pub async fn load_goals_by_status(
    conn: &Connection,
    user_id: &str,
    status: Option<GoalStatus>,
) -> Result<Vec<Goal>, DomainError> {
    let rows = conn
        .query(
            &format!(
                "SELECT {} FROM goals WHERE owner_user_id = ?1 AND (?2 IS NULL OR status = ?2) ORDER BY created_at ASC",
                GOAL_COLUMNS
            ),
            (user_id, status.map(|s| s.as_str())),
        )
        .await
        .map_err(DomainError::query("failed to query goals"))?;
    collect_goals(rows).await
}

/// Every target the challenge mode tracks must be present and positive.
pub fn validate_goal_targets(
    mode: ChallengeMode,
    target_amount: Option<f64>,
    target_count: Option<i64>,
) -> Result<(), (StatusCode, String)> {
    if mode.tracks_amount() {
        match target_amount {
            Some(amount) => validate_amount(amount, "Target amount")?,
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("Target amount is required for {} challenges", mode.as_str()),
                ));
            }
        }
    }
    if mode.tracks_count() {
        match target_count {
            Some(count) if count > 0 => {}
            _ => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!(
                        "Target count must be a positive number for {} challenges",
                        mode.as_str()
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// A linked category has to feed the ledger the goal type reads from.
async fn ensure_goal_category(
    conn: &Connection,
    user_id: &str,
    goal_type: GoalType,
    category_id: &str,
) -> Result<(), DomainError> {
    let category = find_category(conn, user_id, category_id)
        .await
        .map_err(|(_, msg)| DomainError::Query(msg))?
        .ok_or_else(|| DomainError::Validation("Category does not exist".to_string()))?;

    if category.category_type.transaction_kind() != goal_type.source_kind() {
        return Err(DomainError::Validation(format!(
            "A {} goal cannot track a {} category",
            goal_type.as_str(),
            category.category_type.as_str()
        )));
    }
    Ok(())
}

pub async fn create_goal(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateGoalPayload>,
) -> Result<(StatusCode, Json<Goal>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;

    validate_string_length(&payload.title, "Goal title", MAX_GOAL_TITLE_LENGTH)?;
    validate_optional_length(payload.description.as_deref(), "Description", MAX_DESCRIPTION_LENGTH)?;
    validate_optional_length(payload.reason.as_deref(), "Reason", MAX_DESCRIPTION_LENGTH)?;
    validate_goal_targets(payload.challenge_mode, payload.target_amount, payload.target_count)?;
    if let Some(ref date) = payload.target_date {
        validate_date(date)?;
    }
    if let Some(ref date) = payload.created_from_date {
        validate_date(date)?;
    }
    if let Some(amount) = payload.current_amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "Current amount cannot be negative".to_string(),
            ));
        }
    }
    if payload.current_count.is_some_and(|c| c < 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            "Current count cannot be negative".to_string(),
        ));
    }

    let today = today();
    let now = now_rfc3339()?;
    let category_id = normalize_optional(payload.category_id);

    let goal = Goal {
        id: Uuid::new_v4().to_string(),
        category_id,
        title: payload.title.trim().to_string(),
        description: normalize_optional(payload.description),
        reason: normalize_optional(payload.reason),
        goal_type: payload.goal_type,
        target_amount: payload.target_amount,
        current_amount: payload.current_amount.unwrap_or(0.0),
        target_count: payload.target_count,
        current_count: payload.current_count.unwrap_or(0),
        target_date: normalize_optional(payload.target_date),
        status: GoalStatus::Active,
        created_from_date: payload
            .created_from_date
            .map(|d| d.trim().to_string())
            .unwrap_or_else(|| format_date(today)),
        challenge_mode: payload.challenge_mode,
        created_at: now.clone(),
        updated_at: now,
    };

    let user_id = user.id.clone();
    let goal = with_transaction(&app_state.main_db, |conn| {
        Box::pin(async move {
            let mut goal = goal;
            // Linked goals start from the live aggregate, not from client input.
            if let Some(ref category_id) = goal.category_id {
                ensure_goal_category(conn, &user_id, goal.goal_type, category_id).await?;
                let aggregate = month_aggregate(
                    conn,
                    &user_id,
                    goal.goal_type.source_kind(),
                    category_id,
                    &MonthRange::containing(today),
                )
                .await?;
                goal.current_amount = aggregate.amount;
                goal.current_count = aggregate.count;
            }

            conn.execute(
                "INSERT INTO goals (id, owner_user_id, category_id, title, description, reason, type, target_amount, current_amount, target_count, current_count, target_date, status, created_from_date, challenge_mode, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    goal.id.as_str(),
                    user_id.as_str(),
                    goal.category_id.as_deref(),
                    goal.title.as_str(),
                    goal.description.as_deref(),
                    goal.reason.as_deref(),
                    goal.goal_type.as_str(),
                    goal.target_amount,
                    goal.current_amount,
                    goal.target_count,
                    goal.current_count,
                    goal.target_date.as_deref(),
                    goal.status.as_str(),
                    goal.created_from_date.as_str(),
                    goal.challenge_mode.as_str(),
                    goal.created_at.as_str(),
                    goal.updated_at.as_str(),
                ],
            )
            .await
            .map_err(DomainError::query("goal creation failed"))?;

            Ok(goal)
        })
    })
    .await
    .map_err(|e: DomainError| -> (StatusCode, String) { e.into() })?;

    tracing::info!(goal_id = %goal.id, goal_type = goal.goal_type.as_str(), "goal created");
    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn get_goals(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<GetGoalsQuery>,
) -> Result<(StatusCode, Json<GetGoalsResponse>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let limit = validate_limit(query.limit, DEFAULT_GOALS_LIMIT)?;
    let offset = validate_offset(query.offset)?;
    let status = query.status.map(|s| s.as_str());

    let conn = app_state.main_db.read().await;

    let mut count_rows = conn
        .query(
            "SELECT COUNT(*) FROM goals WHERE owner_user_id = ?1 AND (?2 IS NULL OR status = ?2)",
            (user.id.as_str(), status),
        )
        .await
        .map_err(DomainError::query("failed to count goals"))?;
    let total_count = first_count(&mut count_rows)
        .await
        .map_err(DomainError::query("failed to count goals"))?;

    let rows = conn
        .query(
            &format!(
                "SELECT {} FROM goals WHERE owner_user_id = ?1 AND (?2 IS NULL OR status = ?2) ORDER BY created_at DESC LIMIT ?3 OFFSET ?4",
                GOAL_COLUMNS
            ),
            (user.id.as_str(), status, limit, offset),
        )
        .await
        .map_err(DomainError::query("failed to query goals"))?;
    let goals = collect_goals(rows).await?;

    Ok((StatusCode::OK, Json(GetGoalsResponse { goals, total_count })))
}

pub async fn get_goal(
    State(app_state): State<AppState>,
    session: Session,
    Path(goal_id): Path<String>,
) -> Result<(StatusCode, Json<Goal>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.read().await;
    let goal = load_goal(&conn, &user.id, &goal_id)
        .await?
        .ok_or(DomainError::NotFound("Goal"))?;
    Ok((StatusCode::OK, Json(goal)))
}

pub async fn update_goal(
    State(app_state): State<AppState>,
    session: Session,
    Path(goal_id): Path<String>,
    Json(payload): Json<UpdateGoalPayload>,
) -> Result<(StatusCode, Json<Goal>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;

    if let Some(ref title) = payload.title {
        validate_string_length(title, "Goal title", MAX_GOAL_TITLE_LENGTH)?;
    }
    validate_optional_length(payload.description.as_deref(), "Description", MAX_DESCRIPTION_LENGTH)?;
    validate_optional_length(payload.reason.as_deref(), "Reason", MAX_DESCRIPTION_LENGTH)?;
    if let Some(ref date) = payload.target_date {
        if !date.trim().is_empty() {
            validate_date(date)?;
        }
    }

    let now = now_rfc3339()?;
    let conn = app_state.main_db.write().await;

    let existing = load_goal(&conn, &user.id, &goal_id)
        .await?
        .ok_or(DomainError::NotFound("Goal"))?;

    if existing.category_id.is_some()
        && (payload.current_amount.is_some() || payload.current_count.is_some())
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "Progress of a goal linked to a category is computed from its transactions".to_string(),
        ));
    }
    if payload.current_amount.is_some_and(|a| !a.is_finite() || a < 0.0)
        || payload.current_count.is_some_and(|c| c < 0)
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "Current progress cannot be negative".to_string(),
        ));
    }

    let updated = Goal {
        title: payload
            .title
            .map(|t| t.trim().to_string())
            .unwrap_or(existing.title),
        description: match payload.description {
            Some(d) => normalize_optional(Some(d)),
            None => existing.description,
        },
        reason: match payload.reason {
            Some(r) => normalize_optional(Some(r)),
            None => existing.reason,
        },
        target_amount: payload.target_amount.or(existing.target_amount),
        target_count: payload.target_count.or(existing.target_count),
        target_date: match payload.target_date {
            Some(d) => normalize_optional(Some(d)),
            None => existing.target_date,
        },
        current_amount: payload.current_amount.unwrap_or(existing.current_amount),
        current_count: payload.current_count.unwrap_or(existing.current_count),
        updated_at: now,
        ..existing
    };
    validate_goal_targets(updated.challenge_mode, updated.target_amount, updated.target_count)?;

    conn.execute(
        "UPDATE goals SET title = ?, description = ?, reason = ?, target_amount = ?, target_count = ?, target_date = ?, current_amount = ?, current_count = ?, updated_at = ? WHERE id = ? AND owner_user_id = ?",
        libsql::params![
            updated.title.as_str(),
            updated.description.as_deref(),
            updated.reason.as_deref(),
            updated.target_amount,
            updated.target_count,
            updated.target_date.as_deref(),
            round_cents(updated.current_amount),
            updated.current_count,
            updated.updated_at.as_str(),
            updated.id.as_str(),
            user.id.as_str(),
        ],
    )
    .await
    .map_err(DomainError::query("failed to update goal"))?;

    Ok((StatusCode::OK, Json(updated)))
}

/// Moves a goal through its lifecycle. A linked goal coming back to `active`
/// missed every ledger refresh while it was paused, so its snapshot is
/// recomputed in the same transaction.
pub async fn update_goal_status(
    State(app_state): State<AppState>,
    session: Session,
    Path(goal_id): Path<String>,
    Json(payload): Json<UpdateGoalStatusPayload>,
) -> Result<(StatusCode, Json<Goal>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let now = now_rfc3339()?;
    let today = today();
    let next = payload.status;
    let user_id = user.id.clone();

    let (goal, previous) = with_transaction(&app_state.main_db, |conn| {
        Box::pin(async move {
            let mut goal = load_goal(conn, &user_id, &goal_id)
                .await?
                .ok_or(DomainError::NotFound("Goal"))?;
            let previous = goal.status;

            if !previous.can_transition_to(next) {
                return Err(DomainError::Validation(format!(
                    "Invalid goal status transition from {} to {}",
                    previous.as_str(),
                    next.as_str()
                )));
            }

            conn.execute(
                "UPDATE goals SET status = ?, updated_at = ? WHERE id = ? AND owner_user_id = ?",
                (next.as_str(), now.as_str(), goal.id.as_str(), user_id.as_str()),
            )
            .await
            .map_err(DomainError::query("failed to update goal status"))?;
            goal.status = next;
            goal.updated_at = now;

            if next == GoalStatus::Active {
                if let Some(category_id) = goal.category_id.clone() {
                    let refreshed =
                        refresh_linked_goals(conn, &user_id, Some(&category_id), today).await?;
                    if let Some(fresh) = refreshed.into_iter().find(|g| g.id == goal.id) {
                        goal = fresh;
                    }
                }
            }
            Ok((goal, previous))
        })
    })
    .await
    .map_err(|e: DomainError| -> (StatusCode, String) { e.into() })?;

    tracing::info!(goal_id = %goal.id, from = previous.as_str(), to = goal.status.as_str(), "goal status changed");
    Ok((StatusCode::OK, Json(goal)))
}

pub async fn delete_goal(
    State(app_state): State<AppState>,
    session: Session,
    Path(goal_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.write().await;

    let affected_rows = conn
        .execute(
            "DELETE FROM goals WHERE id = ? AND owner_user_id = ?",
            (goal_id.as_str(), user.id.as_str()),
        )
        .await
        .map_err(DomainError::query("failed to delete goal"))?;

    if affected_rows == 0 {
        return Err((StatusCode::NOT_FOUND, "Goal not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Progress of a goal. Linked goals are rendered from the live month aggregate
/// rather than the stored snapshot.
pub async fn get_goal_progress(
    State(app_state): State<AppState>,
    session: Session,
    Path(goal_id): Path<String>,
) -> Result<(StatusCode, Json<GoalProgress>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.read().await;

    let mut goal = load_goal(&conn, &user.id, &goal_id)
        .await?
        .ok_or(DomainError::NotFound("Goal"))?;

    if let Some(ref category_id) = goal.category_id {
        let aggregate = month_aggregate(
            &conn,
            &user.id,
            goal.goal_type.source_kind(),
            category_id,
            &MonthRange::containing(today()),
        )
        .await?;
        goal.current_amount = aggregate.amount;
        goal.current_count = aggregate.count;
    }

    Ok((StatusCode::OK, Json(goal_progress(&goal))))
}
