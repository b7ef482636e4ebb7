//! Neighbor profile aggregation.
//!
//! Builds the view one user gets of an accepted neighbor: profile fields plus
//! every post the neighbor shares (public or neighbor-visible), bucketed by
//! content domain.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use libsql::Connection;
use tower_sessions::Session;

use crate::AppState;
use crate::auth::get_current_user;
use crate::content::load_neighbor_visible_posts;
use crate::error::DomainError;
use crate::models::{ContentKind, Domain, DomainStats, NeighborDetail, NeighborProfileQuery, Post};
use crate::neighbors::has_accepted_relationship;
use crate::profiles::load_profile;

/// Buckets posts by the domain their content category names.
///
/// Posts whose category join is missing or names no known domain are left out
/// of every bucket. Each bucket keeps the input order.
pub fn bucket_posts(posts: Vec<Post>) -> (DomainStats, BTreeMap<Domain, Vec<Post>>) {
    let mut stats = DomainStats::default();
    let mut buckets: BTreeMap<Domain, Vec<Post>> =
        Domain::ALL.into_iter().map(|d| (d, Vec::new())).collect();

    for post in posts {
        let domain = post
            .category_name
            .as_deref()
            .and_then(Domain::from_category_name);
        let Some(domain) = domain else {
            tracing::debug!(
                post_id = %post.id,
                category = ?post.category_name,
                "post has no recognised domain, skipping"
            );
            continue;
        };
        stats.increment(domain);
        buckets.entry(domain).or_default().push(post);
    }

    (stats, buckets)
}

/// Everything `viewer_id` may see of `neighbor_id`.
///
/// Fails with [`DomainError::RelationshipNotFound`] unless the two users have
/// an accepted relationship in either direction. Unknown users fail the same
/// way.
pub async fn aggregate_neighbor_content(
    conn: &Connection,
    viewer_id: &str,
    neighbor_id: &str,
    active_domain: Domain,
) -> Result<NeighborDetail, DomainError> {
    if !has_accepted_relationship(conn, viewer_id, neighbor_id).await? {
        return Err(DomainError::RelationshipNotFound);
    }

    let profile = load_profile(conn, neighbor_id)
        .await?
        .ok_or(DomainError::RelationshipNotFound)?;

    let mut posts = load_neighbor_visible_posts(conn, ContentKind::Reflection, neighbor_id).await?;
    posts.extend(load_neighbor_visible_posts(conn, ContentKind::Question, neighbor_id).await?);
    // Two sources merged; restore newest-first across both.
    posts.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });

    let (domain_stats, posts_by_domain) = bucket_posts(posts);
    let current_posts = posts_by_domain
        .get(&active_domain)
        .cloned()
        .unwrap_or_default();

    Ok(NeighborDetail {
        profile,
        total_posts: domain_stats.total(),
        domain_stats,
        active_domain,
        current_posts,
        posts_by_domain,
    })
}

pub async fn get_neighbor_profile(
    State(app_state): State<AppState>,
    session: Session,
    Path(neighbor_id): Path<String>,
    Query(query): Query<NeighborProfileQuery>,
) -> Result<(StatusCode, Json<NeighborDetail>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.read().await;

    let detail = aggregate_neighbor_content(
        &conn,
        &user.id,
        &neighbor_id,
        query.domain.unwrap_or_default(),
    )
    .await?;

    Ok((StatusCode::OK, Json(detail)))
}
