use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use tower_sessions::Session;

use crate::AppState;
use crate::auth::get_current_user;
use crate::constants::PROGRESS_COMPLETE;
use crate::error::DomainError;
use crate::goal_progress::primary_progress;
use crate::goals::load_goals_by_status;
use crate::models::{
    BudgetSummary, BudgetSummaryQuery, CategoryTotal, CategoryType, Goal, GoalStatistics,
    GoalStatus, TypeTotals,
};
use crate::utils::{MonthRange, parse_month, round_cents, today};

/// Folds per-category totals into the monthly summary, largest category first.
pub fn summarize_budget(month: &str, mut by_category: Vec<CategoryTotal>) -> BudgetSummary {
    let mut by_type = TypeTotals::default();
    for total in &by_category {
        let slot = match total.category_type {
            CategoryType::IncomeFixed => &mut by_type.income_fixed,
            CategoryType::IncomeVariable => &mut by_type.income_variable,
            CategoryType::ExpenseFixed => &mut by_type.expense_fixed,
            CategoryType::ExpenseVariable => &mut by_type.expense_variable,
        };
        *slot = round_cents(*slot + total.total);
    }

    by_category.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.name.cmp(&b.name))
    });

    let total_income = round_cents(by_type.income_fixed + by_type.income_variable);
    let total_expense = round_cents(by_type.expense_fixed + by_type.expense_variable);

    BudgetSummary {
        month: month.to_string(),
        total_income,
        total_expense,
        balance: round_cents(total_income - total_expense),
        by_type,
        by_category,
    }
}

pub async fn get_budget_summary(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<BudgetSummaryQuery>,
) -> Result<(StatusCode, Json<BudgetSummary>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let range = match query.month.as_deref() {
        Some(month) => parse_month(month)?,
        None => MonthRange::containing(today()),
    };

    let conn = app_state.main_db.read().await;
    let mut rows = conn
        .query(
            "SELECT c.id, c.name, c.type, c.color, COALESCE(SUM(t.amount), 0.0), COUNT(t.id)
             FROM categories c
             JOIN (
                 SELECT id, category_id, amount FROM incomes WHERE owner_user_id = ?1 AND date BETWEEN ?2 AND ?3
                 UNION ALL
                 SELECT id, category_id, amount FROM expenses WHERE owner_user_id = ?1 AND date BETWEEN ?2 AND ?3
             ) t ON t.category_id = c.id
             WHERE c.owner_user_id = ?1
             GROUP BY c.id, c.name, c.type, c.color",
            (user.id.as_str(), range.start.as_str(), range.end.as_str()),
        )
        .await
        .map_err(DomainError::query("failed to summarize budget"))?;

    let mut by_category = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(DomainError::query("failed to read budget summary"))?
    {
        let invalid = || DomainError::query("invalid budget summary data");
        let category_type: String = row.get(2).map_err(invalid())?;
        let category_type = CategoryType::parse(&category_type)
            .ok_or_else(|| DomainError::Query("invalid category type".to_string()))?;
        let total: f64 = row.get(4).map_err(invalid())?;

        by_category.push(CategoryTotal {
            category_id: row.get(0).map_err(invalid())?,
            name: row.get(1).map_err(invalid())?,
            category_type,
            color: row.get(3).map_err(invalid())?,
            total: round_cents(total),
            count: row.get(5).map_err(invalid())?,
        });
    }

    Ok((
        StatusCode::OK,
        Json(summarize_budget(range.label(), by_category)),
    ))
}

/// Status counts plus progress figures over the active goals.
pub fn summarize_goals(goals: &[Goal]) -> GoalStatistics {
    let mut stats = GoalStatistics {
        total: goals.len() as u32,
        ..GoalStatistics::default()
    };
    let mut progress_sum = 0i64;
    let mut with_target = 0i64;

    for goal in goals {
        match goal.status {
            GoalStatus::Active => stats.active += 1,
            GoalStatus::Completed => stats.completed += 1,
            GoalStatus::Paused => stats.paused += 1,
            GoalStatus::Cancelled => stats.cancelled += 1,
        }
        if goal.status != GoalStatus::Active {
            continue;
        }
        if let Some(progress) = primary_progress(goal) {
            progress_sum += progress;
            with_target += 1;
            if progress >= PROGRESS_COMPLETE {
                stats.achieved_active += 1;
            }
        }
    }

    if with_target > 0 {
        stats.average_progress = (progress_sum as f64 / with_target as f64).round() as i64;
    }
    stats
}

pub async fn get_goal_statistics(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<(StatusCode, Json<GoalStatistics>), (StatusCode, String)> {
    let user = get_current_user(&session).await?;
    let conn = app_state.main_db.read().await;
    let goals = load_goals_by_status(&conn, &user.id, None).await?;
    Ok((StatusCode::OK, Json(summarize_goals(&goals))))
}
