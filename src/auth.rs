use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode};
use tower_sessions::Session;
use uuid::Uuid;

use crate::constants::*;
use crate::database::{DEFAULT_CATEGORIES, Db};
use crate::error::DomainError;
use crate::models::{LoginPayload, PublicUser, RegisterPayload, User};
use crate::transaction::{TransactionError, with_transaction};
use crate::utils::now_rfc3339;
use crate::AppState;

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}

enum RegisterError {
    Transaction(TransactionError),
    UsernameTaken,
    Db(String),
}

impl From<TransactionError> for RegisterError {
    fn from(e: TransactionError) -> Self {
        RegisterError::Transaction(e)
    }
}

impl From<RegisterError> for (StatusCode, String) {
    fn from(e: RegisterError) -> Self {
        match e {
            RegisterError::Transaction(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            RegisterError::UsernameTaken => {
                (StatusCode::CONFLICT, "Username already exists".to_string())
            }
            RegisterError::Db(e) => {
                tracing::error!(error = %e, "user registration failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ERR_DATABASE_OPERATION.to_string())
            }
        }
    }
}

/// Creates the user together with an empty profile and the default budget categories.
pub async fn create_user(db: &Db, username: &str, password: &str) -> Result<PublicUser, (StatusCode, String)> {
    let hash = hash_password(password)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339()?;

    with_transaction(db, |conn| {
        let id = id.clone();
        let username = username.to_string();
        Box::pin(async move {
            conn.execute(
                "INSERT INTO users (id, name, password_hash) VALUES (?, ?, ?)",
                (id.as_str(), username.as_str(), hash.as_str()),
            )
            .await
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint failed") {
                    RegisterError::UsernameTaken
                } else {
                    RegisterError::Db(e.to_string())
                }
            })?;

            conn.execute(
                "INSERT INTO profiles (user_id, updated_at) VALUES (?, ?)",
                (id.as_str(), now.as_str()),
            )
            .await
            .map_err(|e| RegisterError::Db(e.to_string()))?;

            for (name, category_type, color) in DEFAULT_CATEGORIES {
                conn.execute(
                    "INSERT INTO categories (id, owner_user_id, name, type, color, is_default) VALUES (?, ?, ?, ?, ?, TRUE)",
                    (
                        Uuid::new_v4().to_string(),
                        id.as_str(),
                        name,
                        category_type.as_str(),
                        color,
                    ),
                )
                .await
                .map_err(|e| RegisterError::Db(e.to_string()))?;
            }

            Ok(PublicUser { id, username })
        })
    })
    .await
    .map_err(|e: RegisterError| -> (StatusCode, String) { e.into() })
}

pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    // Input validation
    if payload.username.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username cannot be empty".to_string(),
        ));
    }
    if payload.username.len() < MIN_USERNAME_LENGTH || payload.username.len() > MAX_USERNAME_LENGTH
    {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Username must be between {} and {} characters",
                MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
            ),
        ));
    }
    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ),
        ));
    }
    if !payload
        .username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username can only contain alphanumeric characters, underscores, and hyphens"
                .to_string(),
        ));
    }

    let user = create_user(&app_state.main_db, &payload.username, &payload.password).await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user_by_username(db: &Db, username: &str) -> anyhow::Result<Option<User>> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT id, name, password_hash FROM users WHERE name = ?",
            [username],
        )
        .await?;

    if let Some(row) = rows.next().await? {
        let id: String = row.get(0)?;
        let username: String = row.get(1)?;
        let password_hash: String = row.get(2)?;
        Ok(Some(User {
            id,
            username,
            password_hash,
        }))
    } else {
        Ok(None)
    }
}

/// Looks a user up by exact username without exposing the password hash.
pub async fn get_user_by_username_public(
    db: &Db,
    username: &str,
) -> anyhow::Result<Option<PublicUser>> {
    Ok(get_user_by_username(db, username)
        .await?
        .map(|user| PublicUser {
            id: user.id,
            username: user.username,
        }))
}

fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn login(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginPayload>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    // Input validation
    if payload.username.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username cannot be empty".to_string(),
        ));
    }
    if payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password cannot be empty".to_string(),
        ));
    }

    let user_data = get_user_by_username(&app_state.main_db, &payload.username)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let user = match user_data {
        Some(data) => data,
        None => return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())),
    };

    let is_valid = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if !is_valid {
        tracing::debug!(username = %user.username, "rejected login");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()));
    }

    // Set user session
    session
        .insert("user_id", &user.id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    session
        .insert("username", &user.username)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        StatusCode::OK,
        Json(PublicUser {
            id: user.id,
            username: user.username,
        }),
    ))
}

pub async fn get_current_user(session: &Session) -> Result<PublicUser, (StatusCode, String)> {
    let user_id: Option<String> = session
        .get("user_id")
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let username: Option<String> = session
        .get("username")
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match (user_id, username) {
        (Some(id), Some(name)) => Ok(PublicUser { id, username: name }),
        _ => Err(DomainError::AuthenticationRequired.into()),
    }
}

pub async fn me(session: Session) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    Ok((StatusCode::OK, Json(user)))
}

pub async fn logout(session: Session) -> Result<StatusCode, (StatusCode, String)> {
    session.clear().await;

    Ok(StatusCode::NO_CONTENT)
}
