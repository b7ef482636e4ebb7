use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use libsql::Connection;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::get_current_user;
use crate::constants::*;
use crate::error::DomainError;
use crate::models::{
    Category, CategoryType, CreateCategoryPayload, GetCategoriesQuery, GetCategoriesResponse,
    UpdateCategoryPayload,
};
use crate::utils::{
    db_error, db_error_with_context, first_count, validate_color, validate_limit, validate_offset,
    validate_string_length,
};
use crate::{AppState, TransactionError, with_transaction};

const CATEGORY_COLUMNS: &str = "id, name, type, color, is_default";

pub fn validate_category_name(name: &str) -> Result<(), (StatusCode, String)> {
    validate_string_length(name, "Category name", MAX_CATEGORY_NAME_LENGTH)
}

pub fn extract_category_from_row(row: libsql::Row) -> Result<Category, (StatusCode, String)> {
    let invalid = |_| db_error_with_context("invalid category data");
    let id: String = row.get(0).map_err(invalid)?;
    let name: String = row.get(1).map_err(invalid)?;
    let category_type: String = row.get(2).map_err(invalid)?;
    let color: String = row.get(3).map_err(invalid)?;
    let is_default: bool = row.get(4).map_err(invalid)?;

    let category_type = CategoryType::parse(&category_type)
        .ok_or_else(|| db_error_with_context("invalid category type"))?;

    Ok(Category {
        id,
        name,
        category_type,
        color,
        is_default,
    })
}

/// Fetches one of the user's categories by id.
pub async fn find_category(
    conn: &Connection,
    user_id: &str,
    category_id: &str,
) -> Result<Option<Category>, (StatusCode, String)> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM categories WHERE id = ? AND owner_user_id = ?",
                CATEGORY_COLUMNS
            ),
            (category_id, user_id),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query category"))?;

    match rows.next().await.map_err(|_| db_error())? {
        Some(row) => Ok(Some(extract_category_from_row(row)?)),
        None => Ok(None),
    }
}

/// Resolves a category name (case-insensitive, unique per owner) to its category.
pub async fn find_category_by_name(
    conn: &Connection,
    user_id: &str,
    name: &str,
) -> Result<Option<Category>, DomainError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM categories WHERE owner_user_id = ? AND LOWER(name) = LOWER(?)",
                CATEGORY_COLUMNS
            ),
            (user_id, name.trim()),
        )
        .await
        .map_err(DomainError::query("failed to query category by name"))?;

    match rows
        .next()
        .await
        .map_err(DomainError::query("failed to read category"))?
    {
        Some(row) => extract_category_from_row(row)
            .map(Some)
            .map_err(|(_, msg)| DomainError::Query(msg)),
        None => Ok(None),
    }
}

pub async fn validate_category_not_in_use(
    conn: &Connection,
    user_id: &str,
    category_id: &str,
) -> Result<(), (StatusCode, String)> {
    let mut rows = conn
        .query(
            "SELECT (SELECT COUNT(*) FROM incomes WHERE category_id = ?1 AND owner_user_id = ?2)
                  + (SELECT COUNT(*) FROM expenses WHERE category_id = ?1 AND owner_user_id = ?2)",
            (category_id, user_id),
        )
        .await
        .map_err(|_| db_error_with_context("failed to check category usage"))?;

    let count = first_count(&mut rows).await.map_err(|_| db_error())?;
    if count > 0 {
        return Err((
            StatusCode::CONFLICT,
            "Cannot delete category: it has associated transactions".to_string(),
        ));
    }

    Ok(())
}

enum CreateCategoryError {
    Transaction(TransactionError),
    DbCheck,
    DbInsert,
    Conflict,
}

impl From<TransactionError> for CreateCategoryError {
    fn from(e: TransactionError) -> Self {
        CreateCategoryError::Transaction(e)
    }
}

impl From<CreateCategoryError> for (StatusCode, String) {
    fn from(e: CreateCategoryError) -> Self {
        match e {
            CreateCategoryError::Transaction(TransactionError::Begin) => {
                db_error_with_context("failed to begin transaction")
            }
            CreateCategoryError::Transaction(TransactionError::Commit) => {
                db_error_with_context("failed to commit transaction")
            }
            CreateCategoryError::Transaction(TransactionError::Released) => {
                db_error_with_context("transaction connection already released")
            }
            CreateCategoryError::DbCheck => {
                db_error_with_context("failed to check existing category")
            }
            CreateCategoryError::DbInsert => db_error_with_context("category creation failed"),
            CreateCategoryError::Conflict => (
                StatusCode::CONFLICT,
                "Category name already exists (case-insensitive)".to_string(),
            ),
        }
    }
}

pub async fn create_category(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<(StatusCode, Json<Category>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    validate_category_name(&payload.name)?;
    if let Some(ref color) = payload.color {
        validate_color(color)?;
    }
    let category_name = payload.name.trim().to_string();
    let category_type = payload.category_type;
    let color = payload
        .color
        .map(|c| c.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string());
    let db = &app_state.main_db;

    let category = with_transaction(db, |conn| {
        let name = category_name.clone();
        let owner_user_id = user.id.clone();
        let color = color.clone();
        Box::pin(async move {
            let mut existing_rows = conn
                .query(
                    "SELECT id FROM categories WHERE owner_user_id = ? AND LOWER(name) = LOWER(?)",
                    (owner_user_id.as_str(), name.as_str()),
                )
                .await
                .map_err(|_| CreateCategoryError::DbCheck)?;

            if existing_rows
                .next()
                .await
                .map_err(|_| CreateCategoryError::DbCheck)?
                .is_some()
            {
                return Err(CreateCategoryError::Conflict);
            }

            let category_id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO categories (id, owner_user_id, name, type, color, is_default) VALUES (?, ?, ?, ?, ?, FALSE)",
                (
                    category_id.as_str(),
                    owner_user_id.as_str(),
                    name.as_str(),
                    category_type.as_str(),
                    color.as_str(),
                ),
            )
            .await
            .map_err(|_| CreateCategoryError::DbInsert)?;

            Ok(Category {
                id: category_id,
                name,
                category_type,
                color,
                is_default: false,
            })
        })
    })
    .await
    .map_err(|e: CreateCategoryError| -> (StatusCode, String) { e.into() })?;

    tracing::debug!(category_id = %category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_categories(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<GetCategoriesQuery>,
) -> Result<(StatusCode, Json<GetCategoriesResponse>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let limit = validate_limit(query.limit, DEFAULT_CATEGORIES_LIMIT)?;
    let offset = validate_offset(query.offset)?;

    let search_term = query
        .search
        .as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());
    if let Some(search) = &search_term {
        validate_string_length(search, "Search term", MAX_SEARCH_TERM_LENGTH)?;
    }

    // Optional filters collapse to always-true predicates when absent.
    let search_pattern = search_term.map(|s| format!("%{}%", s));
    let type_filter = query.category_type.map(|t| t.as_str());

    let conn = app_state.main_db.read().await;

    let mut count_rows = conn
        .query(
            "SELECT COUNT(*) FROM categories WHERE owner_user_id = ?1 AND (?2 IS NULL OR name LIKE ?2 COLLATE NOCASE) AND (?3 IS NULL OR type = ?3)",
            (user.id.as_str(), search_pattern.as_deref(), type_filter),
        )
        .await
        .map_err(|_| db_error_with_context("failed to count categories"))?;
    let total_count = first_count(&mut count_rows).await.map_err(|_| db_error())?;

    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM categories WHERE owner_user_id = ?1 AND (?2 IS NULL OR name LIKE ?2 COLLATE NOCASE) AND (?3 IS NULL OR type = ?3) ORDER BY type ASC, name ASC LIMIT ?4 OFFSET ?5",
                CATEGORY_COLUMNS
            ),
            (
                user.id.as_str(),
                search_pattern.as_deref(),
                type_filter,
                limit,
                offset,
            ),
        )
        .await
        .map_err(|_| db_error_with_context("failed to query categories"))?;

    let mut categories = Vec::new();
    while let Some(row) = rows.next().await.map_err(|_| db_error())? {
        categories.push(extract_category_from_row(row)?);
    }

    Ok((
        StatusCode::OK,
        Json(GetCategoriesResponse {
            categories,
            total_count,
            limit,
            offset,
        }),
    ))
}

pub async fn update_category(
    State(app_state): State<AppState>,
    session: Session,
    Path(category_id): Path<String>,
    Json(payload): Json<UpdateCategoryPayload>,
) -> Result<(StatusCode, Json<Category>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;

    if payload.name.is_none() && payload.color.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "At least one of name or color must be provided for update".to_string(),
        ));
    }
    if let Some(ref name) = payload.name {
        validate_category_name(name)?;
    }
    if let Some(ref color) = payload.color {
        validate_color(color)?;
    }

    let conn = app_state.main_db.write().await;

    let existing_category = find_category(&conn, &user.id, &category_id)
        .await?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Category not found".to_string()))?;

    let category_name = payload
        .name
        .map(|n| n.trim().to_string())
        .unwrap_or(existing_category.name);
    let color = payload
        .color
        .map(|c| c.trim().to_string())
        .unwrap_or(existing_category.color);

    let mut conflict_rows = conn
        .query(
            "SELECT id FROM categories WHERE owner_user_id = ? AND LOWER(name) = LOWER(?) AND id != ?",
            (user.id.as_str(), category_name.as_str(), category_id.as_str()),
        )
        .await
        .map_err(|_| db_error_with_context("failed to check name conflict"))?;

    if conflict_rows
        .next()
        .await
        .map_err(|_| db_error())?
        .is_some()
    {
        return Err((
            StatusCode::CONFLICT,
            "Category name already exists (case-insensitive)".to_string(),
        ));
    }

    let affected_rows = conn
        .execute(
            "UPDATE categories SET name = ?, color = ? WHERE id = ? AND owner_user_id = ?",
            (
                category_name.as_str(),
                color.as_str(),
                category_id.as_str(),
                user.id.as_str(),
            ),
        )
        .await
        .map_err(|_| db_error_with_context("failed to update category"))?;

    if affected_rows == 0 {
        return Err((
            StatusCode::NOT_FOUND,
            "Category not found or no changes made".to_string(),
        ));
    }

    let updated_category = Category {
        id: category_id,
        name: category_name,
        category_type: existing_category.category_type,
        color,
        is_default: existing_category.is_default,
    };

    Ok((StatusCode::OK, Json(updated_category)))
}

enum DeleteCategoryError {
    Transaction(TransactionError),
    Rejected((StatusCode, String)),
}

impl From<TransactionError> for DeleteCategoryError {
    fn from(e: TransactionError) -> Self {
        DeleteCategoryError::Transaction(e)
    }
}

impl From<(StatusCode, String)> for DeleteCategoryError {
    fn from(e: (StatusCode, String)) -> Self {
        DeleteCategoryError::Rejected(e)
    }
}

impl From<DeleteCategoryError> for (StatusCode, String) {
    fn from(e: DeleteCategoryError) -> Self {
        match e {
            DeleteCategoryError::Transaction(e) => db_error_with_context(&e.to_string()),
            DeleteCategoryError::Rejected(e) => e,
        }
    }
}

pub async fn delete_category(
    State(app_state): State<AppState>,
    session: Session,
    Path(category_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&session).await?;

    with_transaction(&app_state.main_db, |conn| {
        Box::pin(async move {
            if find_category(conn, &user.id, &category_id).await?.is_none() {
                return Err(DeleteCategoryError::Rejected((
                    StatusCode::NOT_FOUND,
                    "Category not found".to_string(),
                )));
            }

            validate_category_not_in_use(conn, &user.id, &category_id).await?;

            let affected_rows = conn
                .execute(
                    "DELETE FROM categories WHERE id = ? AND owner_user_id = ?",
                    (category_id.as_str(), user.id.as_str()),
                )
                .await
                .map_err(|_| db_error_with_context("failed to delete category"))?;

            if affected_rows == 0 {
                return Err(DeleteCategoryError::Rejected((
                    StatusCode::NOT_FOUND,
                    "Category not found".to_string(),
                )));
            }

            // Goals keep existing without a linked category.
            conn.execute(
                "UPDATE goals SET category_id = NULL WHERE category_id = ? AND owner_user_id = ?",
                (category_id.as_str(), user.id.as_str()),
            )
            .await
            .map_err(|_| db_error_with_context("failed to unlink goals"))?;

            Ok(())
        })
    })
    .await
    .map_err(|e: DeleteCategoryError| -> (StatusCode, String) { e.into() })?;

    Ok(StatusCode::NO_CONTENT)
}
