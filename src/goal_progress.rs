//! Progress rendering for goals.
//!
//! Everything here is a pure function of a goal's stored numbers. Expense
//! reduction goals read as "how much of the limit is used", every other goal
//! type reads as "how close to the target", so the good direction flips
//! between the two framings.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::models::{Goal, GoalType};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BarColor {
    Red,
    Amber,
    Green,
    Blue,
    Gray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Amount,
    Count,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressView {
    /// Rounded percentage; may exceed 100.
    pub progress: i64,
    /// Visual bar width, clamped to 0..=100.
    pub bar_width: u8,
    pub status_message: String,
    pub bar_color: BarColor,
    pub target_label: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub goal_id: String,
    pub amount: Option<ProgressView>,
    pub count: Option<ProgressView>,
}

/// Formats a currency amount with thousands separators, dropping zero cents.
pub fn format_amount(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let (whole, frac) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    if frac == 0 {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{:02}", sign, grouped, frac)
    }
}

fn format_quantity(value: f64, measure: Measure) -> String {
    match measure {
        Measure::Amount => format_amount(value),
        Measure::Count => {
            let n = value.round() as i64;
            if n == 1 {
                "1 time".to_string()
            } else {
                format!("{} times", n)
            }
        }
    }
}

pub fn percentage(current: f64, target: f64) -> i64 {
    (current / target * 100.0).round() as i64
}

pub fn format_progress(
    goal_type: GoalType,
    current: f64,
    target: Option<f64>,
    measure: Measure,
) -> ProgressView {
    let reduce = goal_type == GoalType::ReduceExpense;
    let label_prefix = if reduce { "Limit" } else { "Target" };

    let target = match target {
        Some(t) if t > 0.0 && t.is_finite() => t,
        _ => {
            return ProgressView {
                progress: 0,
                bar_width: 0,
                status_message: MSG_NO_TARGET.to_string(),
                bar_color: BarColor::Gray,
                target_label: format!("{}: -", label_prefix),
            };
        }
    };

    let progress = percentage(current, target);
    let bar_width = progress.clamp(0, PROGRESS_COMPLETE) as u8;
    let target_label = format!("{}: {}", label_prefix, format_quantity(target, measure));

    let (status_message, bar_color) = if reduce {
        let message = if current > target {
            format!("{} over your limit", format_quantity(current - target, measure))
        } else {
            format!("{} left of your limit", format_quantity(target - current, measure))
        };
        let color = if progress > PROGRESS_COMPLETE {
            BarColor::Red
        } else if progress > EXPENSE_WARNING_THRESHOLD {
            BarColor::Amber
        } else {
            BarColor::Green
        };
        (message, color)
    } else if progress >= PROGRESS_COMPLETE {
        (MSG_GOAL_ACHIEVED.to_string(), BarColor::Green)
    } else {
        (
            format!("{} to go", format_quantity(target - current, measure)),
            BarColor::Blue,
        )
    };

    ProgressView {
        progress,
        bar_width,
        status_message,
        bar_color,
        target_label,
    }
}

/// Renders every measure the goal's challenge mode tracks.
pub fn goal_progress(goal: &Goal) -> GoalProgress {
    let amount = goal.challenge_mode.tracks_amount().then(|| {
        format_progress(
            goal.goal_type,
            goal.current_amount,
            goal.target_amount,
            Measure::Amount,
        )
    });
    let count = goal.challenge_mode.tracks_count().then(|| {
        format_progress(
            goal.goal_type,
            goal.current_count as f64,
            goal.target_count.map(|c| c as f64),
            Measure::Count,
        )
    });

    GoalProgress {
        goal_id: goal.id.clone(),
        amount,
        count,
    }
}

/// Progress of the goal's primary measure (amount when tracked, otherwise count),
/// or `None` when that measure has no usable target.
pub fn primary_progress(goal: &Goal) -> Option<i64> {
    let (current, target) = if goal.challenge_mode.tracks_amount() {
        (goal.current_amount, goal.target_amount)
    } else {
        (goal.current_count as f64, goal.target_count.map(|c| c as f64))
    };
    target
        .filter(|t| *t > 0.0 && t.is_finite())
        .map(|t| percentage(current, t))
}
