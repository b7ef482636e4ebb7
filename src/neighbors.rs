use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use libsql::Connection;
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::{get_current_user, get_user_by_username_public};
use crate::constants::*;
use crate::content::count_neighbor_visible_posts;
use crate::error::DomainError;
use crate::models::{
    NeighborActionPayload, NeighborRelationship, NeighborRequestsResponse, NeighborStatus,
    NeighborSummary, PublicUser, SearchUsersQuery, SendNeighborRequestPayload,
};
use crate::profiles::load_profile;
use crate::utils::{now_rfc3339, validate_limit, validate_offset};
use crate::{AppState, with_transaction};

const RELATIONSHIP_COLUMNS: &str = "id, requester_id, recipient_id, status, created_at, updated_at";

fn extract_relationship_from_row(row: &libsql::Row) -> Result<NeighborRelationship, DomainError> {
    let invalid = || DomainError::query("invalid relationship data");
    let status: String = row.get(3).map_err(invalid())?;
    let status = NeighborStatus::parse(&status)
        .ok_or_else(|| DomainError::Query("invalid relationship status".to_string()))?;
    Ok(NeighborRelationship {
        id: row.get(0).map_err(invalid())?,
        requester_id: row.get(1).map_err(invalid())?,
        recipient_id: row.get(2).map_err(invalid())?,
        status,
        created_at: row.get(4).map_err(invalid())?,
        updated_at: row.get(5).map_err(invalid())?,
    })
}

async fn collect_relationships(
    mut rows: libsql::Rows,
) -> Result<Vec<NeighborRelationship>, DomainError> {
    let mut relationships = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(DomainError::query("failed to read relationships"))?
    {
        relationships.push(extract_relationship_from_row(&row)?);
    }
    Ok(relationships)
}

/// The single relationship row between two users, in either direction.
pub async fn find_relationship(
    conn: &Connection,
    a: &str,
    b: &str,
) -> Result<Option<NeighborRelationship>, DomainError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {} FROM neighbor_relationships WHERE (requester_id = ?1 AND recipient_id = ?2) OR (requester_id = ?2 AND recipient_id = ?1)",
                RELATIONSHIP_COLUMNS
            ),
            (a, b),
        )
        .await
        .map_err(DomainError::query("failed to query relationship"))?;

    match rows
        .next()
        .await
        .map_err(DomainError::query("failed to read relationship"))?
    {
        Some(row) => extract_relationship_from_row(&row).map(Some),
        None => Ok(None),
    }
}

pub async fn has_accepted_relationship(
    conn: &Connection,
    a: &str,
    b: &str,
) -> Result<bool, DomainError> {
    Ok(find_relationship(conn, a, b)
        .await?
        .is_some_and(|r| r.status == NeighborStatus::Accepted))
}

pub async fn send_neighbor_request(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<SendNeighborRequestPayload>,
) -> Result<(StatusCode, Json<NeighborRelationship>), (StatusCode, String)> {
    let current_user = get_current_user(&session).await?;
    let username = payload.username.trim();

    if username.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username cannot be empty".to_string(),
        ));
    }

    if username.len() > MAX_USERNAME_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Username cannot exceed {} characters", MAX_USERNAME_LENGTH),
        ));
    }

    if username == current_user.username {
        return Err((
            StatusCode::BAD_REQUEST,
            "Cannot send a neighbor request to yourself".to_string(),
        ));
    }

    let recipient = get_user_by_username_public(&app_state.main_db, username)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, "User not found".to_string()))?;

    let now = now_rfc3339()?;
    let relationship = NeighborRelationship {
        id: Uuid::new_v4().to_string(),
        requester_id: current_user.id.clone(),
        recipient_id: recipient.id.clone(),
        status: NeighborStatus::Pending,
        created_at: now.clone(),
        updated_at: now,
    };

    let relationship = with_transaction(&app_state.main_db, |conn| {
        Box::pin(async move {
            if let Some(existing) =
                find_relationship(conn, &relationship.requester_id, &relationship.recipient_id)
                    .await?
            {
                if existing.status != NeighborStatus::Declined {
                    return Err(DomainError::Conflict(
                        "Neighbor request already exists".to_string(),
                    ));
                }
                // A declined pair may be asked again; the new request replaces the old row.
                conn.execute(
                    "DELETE FROM neighbor_relationships WHERE id = ?",
                    [existing.id.as_str()],
                )
                .await
                .map_err(DomainError::query("failed to clear declined request"))?;
            }

            conn.execute(
                "INSERT INTO neighbor_relationships (id, requester_id, recipient_id, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
                (
                    relationship.id.as_str(),
                    relationship.requester_id.as_str(),
                    relationship.recipient_id.as_str(),
                    relationship.status.as_str(),
                    relationship.created_at.as_str(),
                    relationship.updated_at.as_str(),
                ),
            )
            .await
            .map_err(DomainError::query("failed to create neighbor request"))?;

            Ok(relationship)
        })
    })
    .await
    .map_err(|e: DomainError| -> (StatusCode, String) { e.into() })?;

    tracing::info!(
        requester = %relationship.requester_id,
        recipient = %relationship.recipient_id,
        "neighbor request sent"
    );
    Ok((StatusCode::CREATED, Json(relationship)))
}

pub async fn search_users(
    State(app_state): State<AppState>,
    session: Session,
    Query(params): Query<SearchUsersQuery>,
) -> Result<(StatusCode, Json<Vec<PublicUser>>), (StatusCode, String)> {
    let current_user = get_current_user(&session).await?;
    let term = params.query.trim();

    if term.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query cannot be empty".to_string()));
    }

    if term.len() < MIN_SEARCH_TERM_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Query must be at least {} characters long",
                MIN_SEARCH_TERM_LENGTH
            ),
        ));
    }

    if term.len() > MAX_SEARCH_TERM_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Query cannot exceed {} characters", MAX_SEARCH_TERM_LENGTH),
        ));
    }

    let limit = validate_limit(params.limit, DEFAULT_SEARCH_LIMIT)?;
    let offset = validate_offset(params.offset)?;
    let search_pattern = format!("{}%", term);

    let conn = app_state.main_db.read().await;
    let mut rows = conn
        .query(
            "SELECT id, name FROM users WHERE name LIKE ? AND id != ? ORDER BY name LIMIT ? OFFSET ?",
            (search_pattern.as_str(), current_user.id.as_str(), limit, offset),
        )
        .await
        .map_err(DomainError::query("failed to search users"))?;

    let mut users = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(DomainError::query("failed to read users"))?
    {
        let invalid = || DomainError::query("invalid user data");
        users.push(PublicUser {
            id: row.get(0).map_err(invalid())?,
            username: row.get(1).map_err(invalid())?,
        });
    }

    Ok((StatusCode::OK, Json(users)))
}

/// Accepted neighbors with their profile and the number of posts shared with neighbors.
pub async fn list_neighbors(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<(StatusCode, Json<Vec<NeighborSummary>>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.read().await;

    let rows = conn
        .query(
            &format!(
                "SELECT {} FROM neighbor_relationships WHERE (requester_id = ?1 OR recipient_id = ?1) AND status = ?2 ORDER BY updated_at DESC",
                RELATIONSHIP_COLUMNS
            ),
            (user.id.as_str(), NeighborStatus::Accepted.as_str()),
        )
        .await
        .map_err(DomainError::query("failed to list neighbors"))?;
    let relationships = collect_relationships(rows).await?;

    let mut neighbors = Vec::with_capacity(relationships.len());
    for relationship in relationships {
        let neighbor_id = relationship.other_party(&user.id);
        let Some(profile) = load_profile(&conn, neighbor_id).await? else {
            tracing::warn!(neighbor_id, "accepted neighbor has no user row");
            continue;
        };
        let visible_posts = count_neighbor_visible_posts(&conn, neighbor_id).await?;
        neighbors.push(NeighborSummary {
            profile,
            visible_posts,
            neighbors_since: relationship.updated_at.clone(),
        });
    }

    Ok((StatusCode::OK, Json(neighbors)))
}

pub async fn list_requests(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<(StatusCode, Json<NeighborRequestsResponse>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.read().await;

    let rows = conn
        .query(
            &format!(
                "SELECT {} FROM neighbor_relationships WHERE (requester_id = ?1 OR recipient_id = ?1) AND status = ?2 ORDER BY created_at DESC",
                RELATIONSHIP_COLUMNS
            ),
            (user.id.as_str(), NeighborStatus::Pending.as_str()),
        )
        .await
        .map_err(DomainError::query("failed to list neighbor requests"))?;

    let (incoming, outgoing): (Vec<_>, Vec<_>) = collect_relationships(rows)
        .await?
        .into_iter()
        .partition(|r| r.recipient_id == user.id);

    Ok((
        StatusCode::OK,
        Json(NeighborRequestsResponse { incoming, outgoing }),
    ))
}

/// Moves a pending request addressed to `recipient_id` from `requester_id` to `status`.
async fn respond_to_request(
    app_state: &AppState,
    recipient_id: &str,
    requester_id: &str,
    status: NeighborStatus,
) -> Result<NeighborRelationship, (StatusCode, String)> {
    let now = now_rfc3339()?;
    let recipient_id = recipient_id.to_string();
    let requester_id = requester_id.trim().to_string();

    with_transaction(&app_state.main_db, |conn| {
        Box::pin(async move {
            let mut relationship = find_relationship(conn, &recipient_id, &requester_id)
                .await?
                .ok_or(DomainError::RelationshipNotFound)?;

            // Only the addressee of a request may answer it.
            if relationship.recipient_id != recipient_id {
                return Err(DomainError::RelationshipNotFound);
            }
            if !relationship.status.can_transition_to(status) {
                return Err(DomainError::Validation(format!(
                    "Invalid neighbor transition from {} to {}",
                    relationship.status.as_str(),
                    status.as_str()
                )));
            }

            conn.execute(
                "UPDATE neighbor_relationships SET status = ?, updated_at = ? WHERE id = ?",
                (status.as_str(), now.as_str(), relationship.id.as_str()),
            )
            .await
            .map_err(DomainError::query("failed to update relationship"))?;

            relationship.status = status;
            relationship.updated_at = now;
            Ok(relationship)
        })
    })
    .await
    .map_err(|e: DomainError| -> (StatusCode, String) { e.into() })
}

pub async fn accept_neighbor(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<NeighborActionPayload>,
) -> Result<(StatusCode, Json<NeighborRelationship>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let relationship = respond_to_request(
        &app_state,
        &user.id,
        &payload.neighbor_id,
        NeighborStatus::Accepted,
    )
    .await?;

    tracing::info!(id = %relationship.id, "neighbor request accepted");
    Ok((StatusCode::OK, Json(relationship)))
}

pub async fn decline_neighbor(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<NeighborActionPayload>,
) -> Result<(StatusCode, Json<NeighborRelationship>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let relationship = respond_to_request(
        &app_state,
        &user.id,
        &payload.neighbor_id,
        NeighborStatus::Declined,
    )
    .await?;

    tracing::info!(id = %relationship.id, "neighbor request declined");
    Ok((StatusCode::OK, Json(relationship)))
}

/// Deletes the relationship with `neighbor_id` whatever its status, which
/// also withdraws a pending request.
pub async fn remove_neighbor(
    State(app_state): State<AppState>,
    session: Session,
    Path(neighbor_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.write().await;

    let deleted = conn
        .execute(
            "DELETE FROM neighbor_relationships WHERE (requester_id = ?1 AND recipient_id = ?2) OR (requester_id = ?2 AND recipient_id = ?1)",
            (user.id.as_str(), neighbor_id.as_str()),
        )
        .await
        .map_err(DomainError::query("failed to remove neighbor"))?;

    if deleted == 0 {
        return Err(DomainError::RelationshipNotFound.into());
    }

    tracing::info!(user_id = %user.id, neighbor_id = %neighbor_id, "neighbor removed");
    Ok(StatusCode::NO_CONTENT)
}
