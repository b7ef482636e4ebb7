use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::AppState;
use crate::auth::get_current_user;
use crate::constants::*;
use crate::content::{can_view, load_post};
use crate::error::DomainError;
use crate::models::{ContentKind, CreateScrapPayload, GetPostsQuery, GetScrapsResponse, Scrap};
use crate::utils::{first_count, not_found, now_rfc3339, validate_limit, validate_offset};

/// First `SCRAP_PREVIEW_LENGTH` characters of the content, with an ellipsis when cut.
pub fn make_preview(content: &str) -> String {
    let content = content.trim();
    match content.char_indices().nth(SCRAP_PREVIEW_LENGTH) {
        Some((cut, _)) => format!("{}…", &content[..cut]),
        None => content.to_string(),
    }
}

fn extract_scrap_from_row(row: &libsql::Row) -> Result<Scrap, DomainError> {
    let invalid = || DomainError::query("invalid scrap data");
    let content_type: String = row.get(1).map_err(invalid())?;
    let content_type = ContentKind::parse(&content_type)
        .ok_or_else(|| DomainError::Query("invalid scrap content type".to_string()))?;

    Ok(Scrap {
        id: row.get(0).map_err(invalid())?,
        content_type,
        content_id: row.get(2).map_err(invalid())?,
        author_id: row.get(3).map_err(invalid())?,
        title: row.get(4).map_err(invalid())?,
        preview: row.get(5).map_err(invalid())?,
        created_at: row.get(6).map_err(invalid())?,
    })
}

pub async fn create_scrap(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateScrapPayload>,
) -> Result<(StatusCode, Json<Scrap>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let content_id = payload.content_id.trim();
    let conn = app_state.main_db.write().await;

    // Content the user cannot see is reported as missing.
    let post = match load_post(&conn, payload.content_type, content_id).await? {
        Some(post) if can_view(&conn, &user.id, &post).await? => post,
        _ => return Err(not_found(payload.content_type.label())),
    };

    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM scraps WHERE owner_user_id = ? AND content_type = ? AND content_id = ?",
            (user.id.as_str(), post.kind.as_str(), post.id.as_str()),
        )
        .await
        .map_err(DomainError::query("failed to check existing scrap"))?;
    if first_count(&mut rows)
        .await
        .map_err(DomainError::query("failed to read scrap count"))?
        > 0
    {
        return Err((StatusCode::CONFLICT, "Already scrapped".to_string()));
    }

    let scrap = Scrap {
        id: Uuid::new_v4().to_string(),
        content_type: post.kind,
        content_id: post.id.clone(),
        author_id: post.author_id.clone(),
        title: post.title.clone(),
        preview: make_preview(&post.content),
        created_at: now_rfc3339()?,
    };

    conn.execute(
        "INSERT INTO scraps (id, owner_user_id, content_type, content_id, author_id, title, preview, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        (
            scrap.id.as_str(),
            user.id.as_str(),
            scrap.content_type.as_str(),
            scrap.content_id.as_str(),
            scrap.author_id.as_str(),
            scrap.title.as_deref(),
            scrap.preview.as_str(),
            scrap.created_at.as_str(),
        ),
    )
    .await
    .map_err(DomainError::query("scrap creation failed"))?;

    tracing::debug!(scrap_id = %scrap.id, content_id = %scrap.content_id, "content scrapped");
    Ok((StatusCode::CREATED, Json(scrap)))
}

pub async fn get_scraps(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<GetPostsQuery>,
) -> Result<(StatusCode, Json<GetScrapsResponse>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let limit = validate_limit(query.limit, DEFAULT_POSTS_LIMIT)?;
    let offset = validate_offset(query.offset)?;

    let conn = app_state.main_db.read().await;

    let mut count_rows = conn
        .query(
            "SELECT COUNT(*) FROM scraps WHERE owner_user_id = ?",
            [user.id.as_str()],
        )
        .await
        .map_err(DomainError::query("failed to count scraps"))?;
    let total_count = first_count(&mut count_rows)
        .await
        .map_err(DomainError::query("failed to read scrap count"))?;

    let mut rows = conn
        .query(
            "SELECT id, content_type, content_id, author_id, title, preview, created_at FROM scraps WHERE owner_user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
            (user.id.as_str(), limit, offset),
        )
        .await
        .map_err(DomainError::query("failed to list scraps"))?;

    let mut scraps = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(DomainError::query("failed to read scraps"))?
    {
        scraps.push(extract_scrap_from_row(&row)?);
    }

    Ok((StatusCode::OK, Json(GetScrapsResponse { scraps, total_count })))
}

pub async fn delete_scrap(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.write().await;

    let deleted = conn
        .execute(
            "DELETE FROM scraps WHERE id = ? AND owner_user_id = ?",
            (id.as_str(), user.id.as_str()),
        )
        .await
        .map_err(DomainError::query("scrap deletion failed"))?;

    if deleted == 0 {
        return Err(not_found("Scrap"));
    }
    Ok(StatusCode::NO_CONTENT)
}
