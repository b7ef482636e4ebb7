use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use libsql::Connection;
use tower_sessions::Session;
use uuid::Uuid;

use crate::AppState;
use crate::auth::get_current_user;
use crate::constants::*;
use crate::error::DomainError;
use crate::models::{
    AnswerQuestionPayload, ContentKind, CreatePostPayload, GetPostsQuery, GetPostsResponse, Post,
    UpdatePostPayload,
};
use crate::neighbors::has_accepted_relationship;
use crate::utils::{
    bad_request, first_count, normalize_optional, not_found, now_rfc3339, validate_date,
    validate_limit, validate_offset, validate_optional_length, validate_string_length,
};

const POST_COLUMNS: &str = "p.id, p.owner_user_id, p.category_id, cc.name, p.title, p.content, p.date, p.is_public, p.is_neighbor_visible, p.keywords, p.created_at";

/// `SELECT ... FROM <table> p LEFT JOIN content_categories cc` for one content kind.
fn select_posts(kind: ContentKind) -> String {
    let extra = match kind {
        ContentKind::Reflection => "",
        ContentKind::Question => ", p.answer, p.is_answered",
    };
    format!(
        "SELECT {}{} FROM {} p LEFT JOIN content_categories cc ON cc.id = p.category_id",
        POST_COLUMNS,
        extra,
        kind.table()
    )
}

fn parse_keywords(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "stored keywords are not a JSON array");
        Vec::new()
    })
}

pub fn extract_post_from_row(kind: ContentKind, row: &libsql::Row) -> Result<Post, DomainError> {
    let invalid = || DomainError::query("invalid post data");
    let keywords: String = row.get(9).map_err(invalid())?;

    let (answer, is_answered) = match kind {
        ContentKind::Reflection => (None, None),
        ContentKind::Question => (
            row.get::<Option<String>>(11).map_err(invalid())?,
            Some(row.get::<bool>(12).map_err(invalid())?),
        ),
    };

    Ok(Post {
        id: row.get(0).map_err(invalid())?,
        kind,
        author_id: row.get(1).map_err(invalid())?,
        category_id: row.get(2).map_err(invalid())?,
        category_name: row.get(3).map_err(invalid())?,
        title: row.get(4).map_err(invalid())?,
        content: row.get(5).map_err(invalid())?,
        date: row.get(6).map_err(invalid())?,
        is_public: row.get(7).map_err(invalid())?,
        is_neighbor_visible: row.get(8).map_err(invalid())?,
        keywords: parse_keywords(&keywords),
        answer,
        is_answered,
        created_at: row.get(10).map_err(invalid())?,
    })
}

async fn collect_posts(kind: ContentKind, mut rows: libsql::Rows) -> Result<Vec<Post>, DomainError> {
    let mut posts = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(DomainError::query("failed to read posts"))?
    {
        posts.push(extract_post_from_row(kind, &row)?);
    }
    Ok(posts)
}

/// Trims keywords, drops blanks and duplicates, and enforces the keyword limits.
pub fn validate_keywords(keywords: Vec<String>) -> Result<Vec<String>, (StatusCode, String)> {
    let mut cleaned: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let keyword = keyword.trim().to_string();
        if keyword.is_empty() || cleaned.contains(&keyword) {
            continue;
        }
        if keyword.len() > MAX_KEYWORD_LENGTH {
            return Err(bad_request(format!(
                "Keyword must be less than {} characters",
                MAX_KEYWORD_LENGTH
            )));
        }
        cleaned.push(keyword);
    }
    if cleaned.len() > MAX_KEYWORDS {
        return Err(bad_request(format!(
            "Cannot have more than {} keywords",
            MAX_KEYWORDS
        )));
    }
    Ok(cleaned)
}

fn keywords_json(keywords: &[String]) -> Result<String, (StatusCode, String)> {
    serde_json::to_string(keywords)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn ensure_content_category(conn: &Connection, category_id: &str) -> Result<(), DomainError> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM content_categories WHERE id = ?",
            [category_id],
        )
        .await
        .map_err(DomainError::query("failed to check content category"))?;
    let count = first_count(&mut rows)
        .await
        .map_err(DomainError::query("failed to read content category"))?;
    if count == 0 {
        return Err(DomainError::Validation(
            "Content category does not exist".to_string(),
        ));
    }
    Ok(())
}

/// Loads a post by id regardless of owner. Callers apply [`can_view`].
pub async fn load_post(
    conn: &Connection,
    kind: ContentKind,
    id: &str,
) -> Result<Option<Post>, DomainError> {
    let mut rows = conn
        .query(&format!("{} WHERE p.id = ?", select_posts(kind)), [id])
        .await
        .map_err(DomainError::query("failed to query post"))?;

    match rows
        .next()
        .await
        .map_err(DomainError::query("failed to read post"))?
    {
        Some(row) => extract_post_from_row(kind, &row).map(Some),
        None => Ok(None),
    }
}

/// Owners see everything; others need `is_public`, or `is_neighbor_visible`
/// plus an accepted relationship with the author.
pub async fn can_view(conn: &Connection, viewer_id: &str, post: &Post) -> Result<bool, DomainError> {
    if post.author_id == viewer_id || post.is_public {
        return Ok(true);
    }
    if post.is_neighbor_visible {
        return has_accepted_relationship(conn, viewer_id, &post.author_id).await;
    }
    Ok(false)
}

/// Posts of `author_id` a neighbor may see, newest first.
pub async fn load_neighbor_visible_posts(
    conn: &Connection,
    kind: ContentKind,
    author_id: &str,
) -> Result<Vec<Post>, DomainError> {
    let rows = conn
        .query(
            &format!(
                "{} WHERE p.owner_user_id = ? AND (p.is_public = 1 OR p.is_neighbor_visible = 1) ORDER BY p.date DESC, p.created_at DESC",
                select_posts(kind)
            ),
            [author_id],
        )
        .await
        .map_err(DomainError::query("failed to load visible posts"))?;
    collect_posts(kind, rows).await
}

pub async fn count_neighbor_visible_posts(conn: &Connection, author_id: &str) -> Result<u32, DomainError> {
    let mut rows = conn
        .query(
            "SELECT (SELECT COUNT(*) FROM reflections WHERE owner_user_id = ?1 AND (is_public = 1 OR is_neighbor_visible = 1))
                  + (SELECT COUNT(*) FROM questions WHERE owner_user_id = ?1 AND (is_public = 1 OR is_neighbor_visible = 1))",
            [author_id],
        )
        .await
        .map_err(DomainError::query("failed to count visible posts"))?;
    first_count(&mut rows)
        .await
        .map_err(DomainError::query("failed to read visible post count"))
}

fn validate_post_fields(
    title: Option<&str>,
    content: &str,
    date: &str,
) -> Result<(), (StatusCode, String)> {
    validate_optional_length(title, "Title", MAX_POST_TITLE_LENGTH)?;
    validate_string_length(content, "Content", MAX_POST_CONTENT_LENGTH)?;
    validate_date(date)
}

async fn create_post(
    kind: ContentKind,
    app_state: AppState,
    session: Session,
    payload: CreatePostPayload,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    validate_post_fields(payload.title.as_deref(), &payload.content, &payload.date)?;
    let keywords = validate_keywords(payload.keywords)?;
    let keywords_text = keywords_json(&keywords)?;
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339()?;
    let category_id = payload.category_id.trim().to_string();

    let conn = app_state.main_db.write().await;
    ensure_content_category(&conn, &category_id).await?;

    conn.execute(
        &format!(
            "INSERT INTO {} (id, owner_user_id, category_id, title, content, date, is_public, is_neighbor_visible, keywords, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            kind.table()
        ),
        (
            id.as_str(),
            user.id.as_str(),
            category_id.as_str(),
            normalize_optional(payload.title),
            payload.content.trim(),
            payload.date.trim(),
            payload.is_public,
            payload.is_neighbor_visible,
            keywords_text,
            now.as_str(),
        ),
    )
    .await
    .map_err(DomainError::query("post creation failed"))?;

    let post = load_post(&conn, kind, &id)
        .await?
        .ok_or_else(|| DomainError::Query("created post vanished".to_string()))?;

    tracing::debug!(kind = kind.as_str(), id = %post.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_posts(
    kind: ContentKind,
    app_state: AppState,
    session: Session,
    query: GetPostsQuery,
) -> Result<(StatusCode, Json<GetPostsResponse>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let limit = validate_limit(query.limit, DEFAULT_POSTS_LIMIT)?;
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

    let mut count_rows = conn
        .query(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE owner_user_id = ?1 AND date BETWEEN ?2 AND ?3 AND (?4 IS NULL OR category_id = ?4)",
                kind.table()
            ),
            (user.id.as_str(), start_date.as_str(), end_date.as_str(), category_id),
        )
        .await
        .map_err(DomainError::query("failed to count posts"))?;
    let total_count = first_count(&mut count_rows)
        .await
        .map_err(DomainError::query("failed to read post count"))?;

    let rows = conn
        .query(
            &format!(
                "{} WHERE p.owner_user_id = ?1 AND p.date BETWEEN ?2 AND ?3 AND (?4 IS NULL OR p.category_id = ?4) ORDER BY p.date DESC, p.created_at DESC LIMIT ?5 OFFSET ?6",
                select_posts(kind)
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
        .map_err(DomainError::query("failed to list posts"))?;
    let posts = collect_posts(kind, rows).await?;

    Ok((StatusCode::OK, Json(GetPostsResponse { posts, total_count })))
}

async fn get_post(
    kind: ContentKind,
    app_state: AppState,
    session: Session,
    id: String,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.read().await;

    // Hidden posts answer exactly like missing ones.
    let post = match load_post(&conn, kind, &id).await? {
        Some(post) if can_view(&conn, &user.id, &post).await? => post,
        _ => return Err(not_found(kind.label())),
    };

    Ok((StatusCode::OK, Json(post)))
}

async fn load_owned_post(
    conn: &Connection,
    kind: ContentKind,
    user_id: &str,
    id: &str,
) -> Result<Post, (StatusCode, String)> {
    match load_post(conn, kind, id).await? {
        Some(post) if post.author_id == user_id => Ok(post),
        _ => Err(not_found(kind.label())),
    }
}

async fn update_post(
    kind: ContentKind,
    app_state: AppState,
    session: Session,
    id: String,
    payload: UpdatePostPayload,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.write().await;
    let existing = load_owned_post(&conn, kind, &user.id, &id).await?;

    let category_id = match payload.category_id {
        Some(category_id) => {
            let category_id = category_id.trim().to_string();
            ensure_content_category(&conn, &category_id).await?;
            category_id
        }
        None => existing.category_id,
    };
    let title = match payload.title {
        Some(title) => normalize_optional(Some(title)),
        None => existing.title,
    };
    let content = payload
        .content
        .map(|c| c.trim().to_string())
        .unwrap_or(existing.content);
    let date = payload
        .date
        .map(|d| d.trim().to_string())
        .unwrap_or(existing.date);
    let keywords = match payload.keywords {
        Some(keywords) => validate_keywords(keywords)?,
        None => existing.keywords,
    };
    validate_post_fields(title.as_deref(), &content, &date)?;

    conn.execute(
        &format!(
            "UPDATE {} SET category_id = ?, title = ?, content = ?, date = ?, is_public = ?, is_neighbor_visible = ?, keywords = ? WHERE id = ? AND owner_user_id = ?",
            kind.table()
        ),
        (
            category_id.as_str(),
            title.as_deref(),
            content.as_str(),
            date.as_str(),
            payload.is_public.unwrap_or(existing.is_public),
            payload.is_neighbor_visible.unwrap_or(existing.is_neighbor_visible),
            keywords_json(&keywords)?,
            id.as_str(),
            user.id.as_str(),
        ),
    )
    .await
    .map_err(DomainError::query("post update failed"))?;

    let post = load_owned_post(&conn, kind, &user.id, &id).await?;
    Ok((StatusCode::OK, Json(post)))
}

async fn delete_post(
    kind: ContentKind,
    app_state: AppState,
    session: Session,
    id: String,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.write().await;

    let deleted = conn
        .execute(
            &format!("DELETE FROM {} WHERE id = ? AND owner_user_id = ?", kind.table()),
            (id.as_str(), user.id.as_str()),
        )
        .await
        .map_err(DomainError::query("post deletion failed"))?;

    if deleted == 0 {
        return Err(not_found(kind.label()));
    }

    tracing::debug!(kind = kind.as_str(), id = %id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_reflection(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreatePostPayload>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    create_post(ContentKind::Reflection, app_state, session, payload).await
}

pub async fn get_reflections(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<GetPostsQuery>,
) -> Result<(StatusCode, Json<GetPostsResponse>), (StatusCode, String)> {
    get_posts(ContentKind::Reflection, app_state, session, query).await
}

pub async fn get_reflection(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    get_post(ContentKind::Reflection, app_state, session, id).await
}

pub async fn update_reflection(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePostPayload>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    update_post(ContentKind::Reflection, app_state, session, id, payload).await
}

pub async fn delete_reflection(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    delete_post(ContentKind::Reflection, app_state, session, id).await
}

pub async fn create_question(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreatePostPayload>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    create_post(ContentKind::Question, app_state, session, payload).await
}

pub async fn get_questions(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<GetPostsQuery>,
) -> Result<(StatusCode, Json<GetPostsResponse>), (StatusCode, String)> {
    get_posts(ContentKind::Question, app_state, session, query).await
}

pub async fn get_question(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    get_post(ContentKind::Question, app_state, session, id).await
}

pub async fn update_question(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(payload): Json<UpdatePostPayload>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    update_post(ContentKind::Question, app_state, session, id, payload).await
}

pub async fn delete_question(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    delete_post(ContentKind::Question, app_state, session, id).await
}

/// Records the owner's answer. An empty answer clears it.
pub async fn answer_question(
    State(app_state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(payload): Json<AnswerQuestionPayload>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    validate_optional_length(Some(payload.answer.as_str()), "Answer", MAX_POST_CONTENT_LENGTH)?;
    let answer = normalize_optional(Some(payload.answer));

    let conn = app_state.main_db.write().await;
    load_owned_post(&conn, ContentKind::Question, &user.id, &id).await?;

    conn.execute(
        "UPDATE questions SET answer = ?, is_answered = ? WHERE id = ? AND owner_user_id = ?",
        (
            answer.as_deref(),
            answer.is_some(),
            id.as_str(),
            user.id.as_str(),
        ),
    )
    .await
    .map_err(DomainError::query("failed to save answer"))?;

    let post = load_owned_post(&conn, ContentKind::Question, &user.id, &id).await?;
    Ok((StatusCode::OK, Json(post)))
}
