use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Deserialize)]
pub struct RegisterPayload {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
}

#[derive(Deserialize)]
pub struct LoginPayload {
    pub username: String,
    pub password: String,
}

/// Public profile fields shown to the owner and to neighbors.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

/// Absent fields are left untouched; an empty string clears the field.
#[derive(Deserialize, Debug, Default)]
pub struct UpdateProfilePayload {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Budget categories
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    IncomeFixed,
    IncomeVariable,
    ExpenseFixed,
    ExpenseVariable,
}

impl CategoryType {
    pub const ALL: [CategoryType; 4] = [
        CategoryType::IncomeFixed,
        CategoryType::IncomeVariable,
        CategoryType::ExpenseFixed,
        CategoryType::ExpenseVariable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::IncomeFixed => "income_fixed",
            CategoryType::IncomeVariable => "income_variable",
            CategoryType::ExpenseFixed => "expense_fixed",
            CategoryType::ExpenseVariable => "expense_variable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    pub fn is_income(&self) -> bool {
        matches!(self, CategoryType::IncomeFixed | CategoryType::IncomeVariable)
    }

    /// Ledger table that rows of this category type are written to.
    pub fn transaction_kind(&self) -> TransactionKind {
        if self.is_income() {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub color: String,
    pub is_default: bool,
}

#[derive(Deserialize)]
pub struct CreateCategoryPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub color: Option<String>,
}

/// The category type is fixed at creation and cannot be updated.
#[derive(Deserialize)]
pub struct UpdateCategoryPayload {
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Deserialize)]
pub struct GetCategoriesQuery {
    #[serde(rename = "type")]
    pub category_type: Option<CategoryType>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub search: Option<String>,
}

#[derive(Serialize)]
pub struct GetCategoriesResponse {
    pub categories: Vec<Category>,
    pub total_count: u32,
    pub limit: u32,
    pub offset: u32,
}

// ---------------------------------------------------------------------------
// Incomes / expenses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn table(&self) -> &'static str {
        match self {
            TransactionKind::Income => "incomes",
            TransactionKind::Expense => "expenses",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        }
    }

    pub fn accepts(&self, category_type: CategoryType) -> bool {
        category_type.transaction_kind() == *self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Transaction {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub amount: f64,
    pub date: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateTransactionPayload {
    pub category_id: String,
    pub name: String,
    pub amount: f64,
    pub date: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateTransactionPayload {
    pub category_id: Option<String>,
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct GetTransactionsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category_id: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize)]
pub struct GetTransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub total_count: u32,
    pub total_amount: f64,
}

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    SaveMoney,
    ReduceExpense,
    IncreaseIncome,
    Custom,
}

impl GoalType {
    pub const ALL: [GoalType; 4] = [
        GoalType::SaveMoney,
        GoalType::ReduceExpense,
        GoalType::IncreaseIncome,
        GoalType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::SaveMoney => "save_money",
            GoalType::ReduceExpense => "reduce_expense",
            GoalType::IncreaseIncome => "increase_income",
            GoalType::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Income-increase goals track the incomes ledger; every other type tracks expenses.
    pub fn source_kind(&self) -> TransactionKind {
        match self {
            GoalType::IncreaseIncome => TransactionKind::Income,
            _ => TransactionKind::Expense,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Completed,
    Paused,
    Cancelled,
}

impl GoalStatus {
    pub const ALL: [GoalStatus; 4] = [
        GoalStatus::Active,
        GoalStatus::Completed,
        GoalStatus::Paused,
        GoalStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Paused => "paused",
            GoalStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    pub fn can_transition_to(&self, next: GoalStatus) -> bool {
        use GoalStatus::*;
        matches!(
            (self, next),
            (Active, Completed) | (Active, Paused) | (Active, Cancelled) | (Paused, Active) | (Paused, Cancelled)
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeMode {
    Amount,
    Count,
    Both,
}

impl ChallengeMode {
    pub const ALL: [ChallengeMode; 3] =
        [ChallengeMode::Amount, ChallengeMode::Count, ChallengeMode::Both];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeMode::Amount => "amount",
            ChallengeMode::Count => "count",
            ChallengeMode::Both => "both",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == value)
    }

    pub fn tracks_amount(&self) -> bool {
        matches!(self, ChallengeMode::Amount | ChallengeMode::Both)
    }

    pub fn tracks_count(&self) -> bool {
        matches!(self, ChallengeMode::Count | ChallengeMode::Both)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Goal {
    pub id: String,
    pub category_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub reason: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub target_amount: Option<f64>,
    pub current_amount: f64,
    pub target_count: Option<i64>,
    pub current_count: i64,
    pub target_date: Option<String>,
    pub status: GoalStatus,
    pub created_from_date: String,
    pub challenge_mode: ChallengeMode,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Deserialize)]
pub struct CreateGoalPayload {
    pub category_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub reason: Option<String>,
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub target_amount: Option<f64>,
    pub target_count: Option<i64>,
    pub target_date: Option<String>,
    pub created_from_date: Option<String>,
    pub challenge_mode: ChallengeMode,
    /// Only honoured for goals without a linked category.
    pub current_amount: Option<f64>,
    /// Only honoured for goals without a linked category.
    pub current_count: Option<i64>,
}

#[derive(Deserialize, Default)]
pub struct UpdateGoalPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub reason: Option<String>,
    pub target_amount: Option<f64>,
    pub target_count: Option<i64>,
    pub target_date: Option<String>,
    pub current_amount: Option<f64>,
    pub current_count: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateGoalStatusPayload {
    pub status: GoalStatus,
}

#[derive(Deserialize)]
pub struct GetGoalsQuery {
    pub status: Option<GoalStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize)]
pub struct GetGoalsResponse {
    pub goals: Vec<Goal>,
    pub total_count: u32,
}

#[derive(Deserialize)]
pub struct ReconcileQuery {
    pub category_id: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GoalMismatch {
    pub goal: Goal,
    pub stored_amount: f64,
    pub stored_count: i64,
    pub actual_amount: f64,
    pub actual_count: i64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ReconcileResponse {
    pub category_id: String,
    pub category_name: String,
    pub month_start: String,
    pub month_end: String,
    pub mismatched_goals: Vec<GoalMismatch>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SyncGoalsResponse {
    pub updated_goals: Vec<Goal>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct GoalStatistics {
    pub total: u32,
    pub active: u32,
    pub completed: u32,
    pub paused: u32,
    pub cancelled: u32,
    /// Active goals whose primary measure has reached its target.
    pub achieved_active: u32,
    /// Mean progress percentage across active goals with a target.
    pub average_progress: i64,
}

// ---------------------------------------------------------------------------
// Budget statistics
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct BudgetSummaryQuery {
    /// `YYYY-MM`; defaults to the current month.
    pub month: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub color: String,
    pub total: f64,
    pub count: i64,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct TypeTotals {
    pub income_fixed: f64,
    pub income_variable: f64,
    pub expense_fixed: f64,
    pub expense_variable: f64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BudgetSummary {
    pub month: String,
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub by_type: TypeTotals,
    pub by_category: Vec<CategoryTotal>,
}

// ---------------------------------------------------------------------------
// Neighbors
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SendNeighborRequestPayload {
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NeighborActionPayload {
    pub neighbor_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NeighborStatus {
    Pending,
    Accepted,
    Declined,
}

impl NeighborStatus {
    pub const ALL: [NeighborStatus; 3] = [
        NeighborStatus::Pending,
        NeighborStatus::Accepted,
        NeighborStatus::Declined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NeighborStatus::Pending => "pending",
            NeighborStatus::Accepted => "accepted",
            NeighborStatus::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// Only a pending request can be answered.
    pub fn can_transition_to(&self, next: NeighborStatus) -> bool {
        use NeighborStatus::*;
        matches!((self, next), (Pending, Accepted) | (Pending, Declined))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NeighborRelationship {
    pub id: String,
    pub requester_id: String,
    pub recipient_id: String,
    pub status: NeighborStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl NeighborRelationship {
    /// The party on the other side of the relationship from `user_id`.
    pub fn other_party(&self, user_id: &str) -> &str {
        if self.requester_id == user_id {
            &self.recipient_id
        } else {
            &self.requester_id
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NeighborRequestsResponse {
    pub incoming: Vec<NeighborRelationship>,
    pub outgoing: Vec<NeighborRelationship>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NeighborSummary {
    pub profile: Profile,
    pub visible_posts: u32,
    pub neighbors_since: String,
}

#[derive(Deserialize)]
pub struct SearchUsersQuery {
    pub query: String,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ---------------------------------------------------------------------------
// Reflections / questions
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Reflection,
    Question,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Reflection => "reflection",
            ContentKind::Question => "question",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reflection" => Some(ContentKind::Reflection),
            "question" => Some(ContentKind::Question),
            _ => None,
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Reflection => "reflections",
            ContentKind::Question => "questions",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Reflection => "Reflection",
            ContentKind::Question => "Question",
        }
    }
}

/// Fixed content domains used to bucket a user's posts for neighbors.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    #[default]
    Gratitude,
    Reflection,
    Daily,
    Growth,
    Custom,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Gratitude,
        Domain::Reflection,
        Domain::Daily,
        Domain::Growth,
        Domain::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Gratitude => "gratitude",
            Domain::Reflection => "reflection",
            Domain::Daily => "daily",
            Domain::Growth => "growth",
            Domain::Custom => "custom",
        }
    }

    /// Maps a joined content-category name onto its domain; unknown names map to `None`.
    pub fn from_category_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(name))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ContentCategory {
    pub id: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub kind: ContentKind,
    pub author_id: String,
    pub category_id: String,
    pub category_name: Option<String>,
    pub title: Option<String>,
    pub content: String,
    pub date: String,
    pub is_public: bool,
    pub is_neighbor_visible: bool,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_answered: Option<bool>,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct CreatePostPayload {
    pub category_id: String,
    pub title: Option<String>,
    pub content: String,
    pub date: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_neighbor_visible: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Deserialize, Default)]
pub struct UpdatePostPayload {
    pub category_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<String>,
    pub is_public: Option<bool>,
    pub is_neighbor_visible: Option<bool>,
    pub keywords: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct AnswerQuestionPayload {
    pub answer: String,
}

#[derive(Deserialize)]
pub struct GetPostsQuery {
    pub category_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GetPostsResponse {
    pub posts: Vec<Post>,
    pub total_count: u32,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DomainStats {
    pub gratitude: u32,
    pub reflection: u32,
    pub daily: u32,
    pub growth: u32,
    pub custom: u32,
}

impl DomainStats {
    pub fn increment(&mut self, domain: Domain) {
        *self.slot(domain) += 1;
    }

    pub fn get(&self, domain: Domain) -> u32 {
        match domain {
            Domain::Gratitude => self.gratitude,
            Domain::Reflection => self.reflection,
            Domain::Daily => self.daily,
            Domain::Growth => self.growth,
            Domain::Custom => self.custom,
        }
    }

    pub fn total(&self) -> u32 {
        Domain::ALL.iter().map(|d| self.get(*d)).sum()
    }

    fn slot(&mut self, domain: Domain) -> &mut u32 {
        match domain {
            Domain::Gratitude => &mut self.gratitude,
            Domain::Reflection => &mut self.reflection,
            Domain::Daily => &mut self.daily,
            Domain::Growth => &mut self.growth,
            Domain::Custom => &mut self.custom,
        }
    }
}

#[derive(Deserialize)]
pub struct NeighborProfileQuery {
    pub domain: Option<Domain>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NeighborDetail {
    pub profile: Profile,
    pub domain_stats: DomainStats,
    pub active_domain: Domain,
    pub current_posts: Vec<Post>,
    pub total_posts: u32,
    pub posts_by_domain: BTreeMap<Domain, Vec<Post>>,
}

// ---------------------------------------------------------------------------
// Scraps
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Scrap {
    pub id: String,
    pub content_type: ContentKind,
    pub content_id: String,
    pub author_id: String,
    pub title: Option<String>,
    pub preview: String,
    pub created_at: String,
}

#[derive(Deserialize)]
pub struct CreateScrapPayload {
    pub content_type: ContentKind,
    pub content_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GetScrapsResponse {
    pub scraps: Vec<Scrap>,
    pub total_count: u32,
}
