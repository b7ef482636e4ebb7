use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::{
    AppState, auth, categories, content, goals, neighbor_profile, neighbors, profiles, reconcile,
    scraps, stats, transactions,
};

/// Every API route, without session or CORS layers.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/profile",
            get(profiles::get_profile).put(profiles::update_profile),
        )
        .route(
            "/categories",
            post(categories::create_category).get(categories::get_categories),
        )
        .route(
            "/categories/{id}",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route(
            "/incomes",
            post(transactions::create_income).get(transactions::get_incomes),
        )
        .route(
            "/incomes/{id}",
            put(transactions::update_income).delete(transactions::delete_income),
        )
        .route(
            "/expenses",
            post(transactions::create_expense).get(transactions::get_expenses),
        )
        .route(
            "/expenses/{id}",
            put(transactions::update_expense).delete(transactions::delete_expense),
        )
        .route("/stats/budget", get(stats::get_budget_summary))
        .route("/goals", post(goals::create_goal).get(goals::get_goals))
        .route("/goals/reconcile", get(reconcile::check_goals))
        .route("/goals/sync", post(reconcile::sync_goals))
        .route("/goals/stats", get(stats::get_goal_statistics))
        .route(
            "/goals/{id}",
            get(goals::get_goal)
                .put(goals::update_goal)
                .delete(goals::delete_goal),
        )
        .route("/goals/{id}/status", put(goals::update_goal_status))
        .route("/goals/{id}/progress", get(goals::get_goal_progress))
        .route("/neighbors", get(neighbors::list_neighbors))
        .route("/neighbors/request", post(neighbors::send_neighbor_request))
        .route("/neighbors/search", get(neighbors::search_users))
        .route("/neighbors/requests", get(neighbors::list_requests))
        .route("/neighbors/accept", post(neighbors::accept_neighbor))
        .route("/neighbors/decline", post(neighbors::decline_neighbor))
        .route("/neighbors/{id}", delete(neighbors::remove_neighbor))
        .route(
            "/neighbors/{id}/profile",
            get(neighbor_profile::get_neighbor_profile),
        )
        .route(
            "/reflections",
            post(content::create_reflection).get(content::get_reflections),
        )
        .route(
            "/reflections/{id}",
            get(content::get_reflection)
                .put(content::update_reflection)
                .delete(content::delete_reflection),
        )
        .route(
            "/questions",
            post(content::create_question).get(content::get_questions),
        )
        .route(
            "/questions/{id}",
            get(content::get_question)
                .put(content::update_question)
                .delete(content::delete_question),
        )
        .route("/questions/{id}/answer", put(content::answer_question))
        .route("/scraps", post(scraps::create_scrap).get(scraps::get_scraps))
        .route("/scraps/{id}", delete(scraps::delete_scrap))
}
