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
use crate::models::{
    CreateTransactionPayload, GetTransactionsQuery, GetTransactionsResponse, Transaction,
    TransactionKind, UpdateTransactionPayload,
};
use crate::reconcile::refresh_linked_goals;
use crate::utils::{
    db_error, db_error_with_context, normalize_optional, today, validate_amount,
    validate_date, validate_limit, validate_offset, validate_optional_length,
    validate_string_length,
};
use crate::{AppState, with_transaction};

pub fn validate_transaction_name(name: &str) -> Result<(), (StatusCode, String)> {
    validate_string_length(name, "Transaction name", MAX_TRANSACTION_NAME_LENGTH)
}

pub fn extract_transaction_from_row(row: libsql::Row) -> Result<Transaction, (StatusCode, String)> {
    let invalid = |_| db_error_with_context("invalid transaction data");
    let id: String = row.get(0).map_err(invalid)?;
    let category_id: String = row.get(1).map_err(invalid)?;
    let name: String = row.get(2).map_err(invalid)?;
    let amount: f64 = row.get(3).map_err(invalid)?;
    let date: String = row.get(4).map_err(invalid)?;
    let description: Option<String> = row.get(5).map_err(invalid)?;

    Ok(Transaction {
        id,
        category_id,
        name,
        amount,
        date,
        description,
    })
}

/// Checks that the category belongs to the user and matches the ledger direction.
async fn ensure_category_for_kind(
    conn: &Connection,
    kind: TransactionKind,
    user_id: &str,
    category_id: &str,
) -> Result<(), DomainError> {
    let category = find_category(conn, user_id, category_id)
        .await
        .map_err(|(_, msg)| DomainError::Query(msg))?
        .ok_or_else(|| DomainError::Validation("Category does not exist".to_string()))?;

    if !kind.accepts(category.category_type) {
        return Err(DomainError::Validation(format!(
            "{} cannot use a {} category",
            kind.label(),
            category.category_type.as_str()
        )));
    }
    Ok(())
}

async fn find_transaction(
    conn: &Connection,
    kind: TransactionKind,
    user_id: &str,
    id: &str,
) -> Result<Option<Transaction>, DomainError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT id, category_id, name, amount, date, description FROM {} WHERE id = ? AND owner_user_id = ?",
                kind.table()
            ),
            (id, user_id),
        )
        .await
        .map_err(DomainError::query("failed to query existing transaction"))?;

    match rows
        .next()
        .await
        .map_err(DomainError::query("failed to read transaction"))?
    {
        Some(row) => extract_transaction_from_row(row)
            .map(Some)
            .map_err(|(_, msg)| DomainError::Query(msg)),
        None => Ok(None),
    }
}

/// Inserts a ledger row and refreshes the snapshots of goals linked to its category.
pub async fn create_transaction_for_user(
    app_state: &AppState,
    kind: TransactionKind,
    user_id: &str,
    payload: CreateTransactionPayload,
) -> Result<Transaction, (StatusCode, String)> {
    validate_transaction_name(&payload.name)?;
    validate_amount(payload.amount, "Amount")?;
    validate_date(&payload.date)?;
    validate_optional_length(payload.description.as_deref(), "Description", MAX_DESCRIPTION_LENGTH)?;

    let transaction = Transaction {
        id: Uuid::new_v4().to_string(),
        category_id: payload.category_id.trim().to_string(),
        name: payload.name.trim().to_string(),
        amount: payload.amount,
        date: payload.date.trim().to_string(),
        description: normalize_optional(payload.description),
    };
    let today = today();

    let created = with_transaction(&app_state.main_db, |conn| {
        let user_id = user_id.to_string();
        let transaction = transaction.clone();
        Box::pin(async move {
            ensure_category_for_kind(conn, kind, &user_id, &transaction.category_id).await?;

            conn.execute(
                &format!(
                    "INSERT INTO {} (id, owner_user_id, category_id, name, amount, date, description) VALUES (?, ?, ?, ?, ?, ?, ?)",
                    kind.table()
                ),
                (
                    transaction.id.as_str(),
                    user_id.as_str(),
                    transaction.category_id.as_str(),
                    transaction.name.as_str(),
                    transaction.amount,
                    transaction.date.as_str(),
                    transaction.description.as_deref(),
                ),
            )
            .await
            .map_err(DomainError::query("transaction creation failed"))?;

            refresh_linked_goals(conn, &user_id, Some(&transaction.category_id), today).await?;
            Ok(transaction)
        })
    })
    .await
    .map_err(|e: DomainError| -> (StatusCode, String) { e.into() })?;

    tracing::debug!(kind = kind.table(), id = %created.id, "transaction created");
    Ok(created)
}

async fn create_transaction(
    kind: TransactionKind,
    app_state: AppState,
    session: Session,
    payload: CreateTransactionPayload,
) -> Result<(StatusCode, Json<Transaction>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let transaction = create_transaction_for_user(&app_state, kind, &user.id, payload).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn get_transactions(
    kind: TransactionKind,
    app_state: AppState,
    session: Session,
    query: GetTransactionsQuery,
) -> Result<(StatusCode, Json<GetTransactionsResponse>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;

    let limit = validate_limit(query.limit, DEFAULT_TRANSACTIONS_LIMIT)?;
    let offset = validate_offset(query.offset)?;

    if let Some(ref start_date) = query.start_date {
        validate_date(start_date)?;
    }

    if let Some(ref end_date) = query.end_date {
        validate_date(end_date)?;
    }

    let start_date = query.start_date.unwrap_or_else(|| "0000-01-01".to_string());
    let end_date = query.end_date.unwrap_or_else(|| "9999-12-31".to_string());
    let category_id = query.category_id.as_deref().map(str::trim);

    let conn = app_state.main_db.read().await;

    let mut totals_rows = conn
        .query(
            &format!(
                "SELECT COUNT(*), COALESCE(SUM(amount), 0.0) FROM {} WHERE owner_user_id = ?1 AND date BETWEEN ?2 AND ?3 AND (?4 IS NULL OR category_id = ?4)",
                kind.table()
            ),
            (user.id.as_str(), start_date.as_str(), end_date.as_str(), category_id),
        )
        .await
        .map_err(|_| db_error_with_context("failed to count transactions"))?;

    let (total_count, total_amount): (u32, f64) =
        match totals_rows.next().await.map_err(|_| db_error())? {
            Some(row) => (
                row.get(0).map_err(|_| db_error())?,
                row.get(1).map_err(|_| db_error())?,
            ),
            None => (0, 0.0),
        };

    let mut rows = conn
        .query(
            &format!(
                "SELECT id, category_id, name, amount, date, description FROM {} WHERE owner_user_id = ?1 AND date BETWEEN ?2 AND ?3 AND (?4 IS NULL OR category_id = ?4) ORDER BY date DESC, rowid DESC LIMIT ?5 OFFSET ?6",
                kind.table()
            ),
            (
                user.id.as_str(),
                start_date.as_str(),
                end_date.as_str(),
                category_id,
                limit,
                offset,
            ),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query transactions"))?;

    let mut transactions = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        transactions.push(extract_transaction_from_row(row)?);
    }

    Ok((
        StatusCode::OK,
        Json(GetTransactionsResponse {
            transactions,
            total_count,
            total_amount,
        }),
    ))
}

async fn update_transaction(
    kind: TransactionKind,
    app_state: AppState,
    session: Session,
    transaction_id: String,
    payload: UpdateTransactionPayload,
) -> Result<(StatusCode, Json<Transaction>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;

    if payload.name.is_none()
        && payload.amount.is_none()
        && payload.category_id.is_none()
        && payload.date.is_none()
        && payload.description.is_none()
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "At least one field must be provided for update".to_string(),
        ));
    }

    if let Some(ref name) = payload.name {
        validate_transaction_name(name)?;
    }
    if let Some(amount) = payload.amount {
        validate_amount(amount, "Amount")?;
    }
    if let Some(ref date) = payload.date {
        validate_date(date)?;
    }
    validate_optional_length(payload.description.as_deref(), "Description", MAX_DESCRIPTION_LENGTH)?;

    let today = today();
    let user_id = user.id.clone();

    let updated = with_transaction(&app_state.main_db, |conn| {
        Box::pin(async move {
            let existing = find_transaction(conn, kind, &user_id, &transaction_id)
                .await?
                .ok_or(DomainError::NotFound("Transaction"))?;

            let category_id = payload
                .category_id
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|| existing.category_id.clone());
            if category_id != existing.category_id {
                ensure_category_for_kind(conn, kind, &user_id, &category_id).await?;
            }

            let updated = Transaction {
                id: existing.id.clone(),
                category_id,
                name: payload
                    .name
                    .map(|n| n.trim().to_string())
                    .unwrap_or_else(|| existing.name.clone()),
                amount: payload.amount.unwrap_or(existing.amount),
                date: payload
                    .date
                    .map(|d| d.trim().to_string())
                    .unwrap_or_else(|| existing.date.clone()),
                description: match payload.description {
                    Some(d) => normalize_optional(Some(d)),
                    None => existing.description.clone(),
                },
            };

            conn.execute(
                &format!(
                    "UPDATE {} SET category_id = ?, name = ?, amount = ?, date = ?, description = ? WHERE id = ? AND owner_user_id = ?",
                    kind.table()
                ),
                (
                    updated.category_id.as_str(),
                    updated.name.as_str(),
                    updated.amount,
                    updated.date.as_str(),
                    updated.description.as_deref(),
                    updated.id.as_str(),
                    user_id.as_str(),
                ),
            )
            .await
            .map_err(DomainError::query("failed to update transaction"))?;

            refresh_linked_goals(conn, &user_id, Some(&updated.category_id), today).await?;
            if existing.category_id != updated.category_id {
                refresh_linked_goals(conn, &user_id, Some(&existing.category_id), today).await?;
            }
            Ok(updated)
        })
    })
    .await
    .map_err(|e: DomainError| -> (StatusCode, String) { e.into() })?;

    Ok((StatusCode::OK, Json(updated)))
}

async fn delete_transaction(
    kind: TransactionKind,
    app_state: AppState,
    session: Session,
    transaction_id: String,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let today = today();
    let user_id = user.id.clone();

    with_transaction(&app_state.main_db, |conn| {
        Box::pin(async move {
            let existing = find_transaction(conn, kind, &user_id, &transaction_id)
                .await?
                .ok_or(DomainError::NotFound("Transaction"))?;

            conn.execute(
                &format!("DELETE FROM {} WHERE id = ? AND owner_user_id = ?", kind.table()),
                (existing.id.as_str(), user_id.as_str()),
            )
            .await
            .map_err(DomainError::query("failed to delete transaction"))?;

            refresh_linked_goals(conn, &user_id, Some(&existing.category_id), today).await?;
            Ok(())
        })
    })
    .await
    .map_err(|e: DomainError| -> (StatusCode, String) { e.into() })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_income(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateTransactionPayload>,
) -> Result<(StatusCode, Json<Transaction>), (StatusCode, String)> {
    create_transaction(TransactionKind::Income, app_state, session, payload).await
}

pub async fn get_incomes(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<GetTransactionsQuery>,
) -> Result<(StatusCode, Json<GetTransactionsResponse>), (StatusCode, String)> {
    get_transactions(TransactionKind::Income, app_state, session, query).await
}

pub async fn update_income(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTransactionPayload>,
) -> Result<(StatusCode, Json<Transaction>), (StatusCode, String)> {
    update_transaction(TransactionKind::Income, app_state, session, id, payload).await
}

pub async fn delete_income(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    delete_transaction(TransactionKind::Income, app_state, session, id).await
}

pub async fn create_expense(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateTransactionPayload>,
) -> Result<(StatusCode, Json<Transaction>), (StatusCode, String)> {
    create_transaction(TransactionKind::Expense, app_state, session, payload).await
}

pub async fn get_expenses(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<GetTransactionsQuery>,
) -> Result<(StatusCode, Json<GetTransactionsResponse>), (StatusCode, String)> {
    get_transactions(TransactionKind::Expense, app_state, session, query).await
}

pub async fn update_expense(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTransactionPayload>,
) -> Result<(StatusCode, Json<Transaction>), (StatusCode, String)> {
    update_transaction(TransactionKind::Expense, app_state, session, id, payload).await
}

pub async fn delete_expense(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    delete_transaction(TransactionKind::Expense, app_state, session, id).await
}
