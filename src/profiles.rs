use axum::{Json, extract::State, http::StatusCode};
use libsql::Connection;
use tower_sessions::Session;

use crate::AppState;
use crate::auth::get_current_user;
use crate::constants::*;
use crate::error::DomainError;
use crate::models::{Profile, UpdateProfilePayload};
use crate::utils::{db_error_with_context, normalize_optional, now_rfc3339, validate_optional_length};

/// Loads the public profile fields of a user.
pub async fn load_profile(conn: &Connection, user_id: &str) -> Result<Option<Profile>, DomainError> {
    let mut rows = conn
        .query(
            "SELECT u.id, u.name, p.display_name, p.bio, p.avatar_url FROM users u LEFT JOIN profiles p ON p.user_id = u.id WHERE u.id = ?",
            [user_id],
        )
        .await
        .map_err(DomainError::query("failed to load profile"))?;

    let Some(row) = rows
        .next()
        .await
        .map_err(DomainError::query("failed to read profile"))?
    else {
        return Ok(None);
    };

    Ok(Some(Profile {
        id: row.get(0).map_err(DomainError::query("invalid profile data"))?,
        username: row.get(1).map_err(DomainError::query("invalid profile data"))?,
        display_name: row.get(2).map_err(DomainError::query("invalid profile data"))?,
        bio: row.get(3).map_err(DomainError::query("invalid profile data"))?,
        avatar_url: row.get(4).map_err(DomainError::query("invalid profile data"))?,
    }))
}

pub async fn get_profile(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<(StatusCode, Json<Profile>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.read().await;
    let profile = load_profile(&conn, &user.id)
        .await?
        .ok_or(DomainError::NotFound("Profile"))?;
    Ok((StatusCode::OK, Json(profile)))
}

pub async fn update_profile(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<(StatusCode, Json<Profile>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;

    validate_optional_length(payload.display_name.as_deref(), "Display name", MAX_DISPLAY_NAME_LENGTH)?;
    validate_optional_length(payload.bio.as_deref(), "Bio", MAX_BIO_LENGTH)?;
    validate_optional_length(payload.avatar_url.as_deref(), "Avatar URL", MAX_URL_LENGTH)?;

    let now = now_rfc3339()?;
    let conn = app_state.main_db.write().await;

    let current = load_profile(&conn, &user.id)
        .await?
        .ok_or(DomainError::NotFound("Profile"))?;

    // Absent fields keep their value, blank strings clear it.
    let display_name = match payload.display_name {
        Some(v) => normalize_optional(Some(v)),
        None => current.display_name,
    };
    let bio = match payload.bio {
        Some(v) => normalize_optional(Some(v)),
        None => current.bio,
    };
    let avatar_url = match payload.avatar_url {
        Some(v) => normalize_optional(Some(v)),
        None => current.avatar_url,
    };

    conn.execute(
        "INSERT INTO profiles (user_id, display_name, bio, avatar_url, updated_at) VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET display_name = excluded.display_name, bio = excluded.bio, avatar_url = excluded.avatar_url, updated_at = excluded.updated_at",
        (
            user.id.as_str(),
            display_name.as_deref(),
            bio.as_deref(),
            avatar_url.as_deref(),
            now.as_str(),
        ),
    )
    .await
    .map_err(|_| db_error_with_context("failed to update profile"))?;

    Ok((
        StatusCode::OK,
        Json(Profile {
            id: user.id,
            username: user.username,
            display_name,
            bio,
            avatar_url,
        }),
    ))
}
