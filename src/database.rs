use anyhow::Result;
use libsql::{Builder, Connection};
use std::{path::Path, sync::Arc};
use tokio::sync::RwLock;

use crate::constants::DATABASE_FILE_NAME;
use crate::models::{CategoryType, Domain};

const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id             TEXT    PRIMARY KEY,
    name           TEXT    UNIQUE NOT NULL,
    password_hash  TEXT    NOT NULL
);
"#;

const CREATE_PROFILES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    user_id       TEXT PRIMARY KEY,
    display_name  TEXT,
    bio           TEXT,
    avatar_url    TEXT,
    updated_at    TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id)
);
"#;

const CREATE_CATEGORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS categories (
    id             TEXT    PRIMARY KEY,
    owner_user_id  TEXT    NOT NULL,
    name           TEXT    NOT NULL,
    type           TEXT    NOT NULL CHECK (type IN ('income_fixed', 'income_variable', 'expense_fixed', 'expense_variable')),
    color          TEXT    NOT NULL,
    is_default     BOOLEAN NOT NULL DEFAULT FALSE,
    UNIQUE (owner_user_id, name)
);
"#;

const CREATE_INCOMES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS incomes (
    id             TEXT    PRIMARY KEY,
    owner_user_id  TEXT    NOT NULL,
    category_id    TEXT    NOT NULL,
    name           TEXT    NOT NULL,
    amount         REAL    NOT NULL,
    date           TEXT    NOT NULL,
    description    TEXT
);
"#;

const CREATE_EXPENSES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS expenses (
    id             TEXT    PRIMARY KEY,
    owner_user_id  TEXT    NOT NULL,
    category_id    TEXT    NOT NULL,
    name           TEXT    NOT NULL,
    amount         REAL    NOT NULL,
    date           TEXT    NOT NULL,
    description    TEXT
);
"#;

const CREATE_GOALS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS goals (
    id                 TEXT    PRIMARY KEY,
    owner_user_id      TEXT    NOT NULL,
    category_id        TEXT,
    title              TEXT    NOT NULL,
    description        TEXT,
    reason             TEXT,
    type               TEXT    NOT NULL,
    target_amount      REAL,
    current_amount     REAL    NOT NULL DEFAULT 0,
    target_count       INTEGER,
    current_count      INTEGER NOT NULL DEFAULT 0,
    target_date        TEXT,
    status             TEXT    NOT NULL DEFAULT 'active',
    created_from_date  TEXT    NOT NULL,
    challenge_mode     TEXT    NOT NULL DEFAULT 'amount',
    created_at         TEXT    NOT NULL,
    updated_at         TEXT    NOT NULL
);
"#;

const CREATE_NEIGHBOR_RELATIONSHIPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS neighbor_relationships (
    id            TEXT PRIMARY KEY,
    requester_id  TEXT NOT NULL,
    recipient_id  TEXT NOT NULL,
    status        TEXT NOT NULL CHECK (status IN ('pending', 'accepted', 'declined')),
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (requester_id, recipient_id)
);
"#;

const CREATE_CONTENT_CATEGORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS content_categories (
    id    TEXT PRIMARY KEY,
    name  TEXT UNIQUE NOT NULL
);
"#;

const CREATE_REFLECTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS reflections (
    id                   TEXT    PRIMARY KEY,
    owner_user_id        TEXT    NOT NULL,
    category_id          TEXT    NOT NULL,
    title                TEXT,
    content              TEXT    NOT NULL,
    date                 TEXT    NOT NULL,
    is_public            BOOLEAN NOT NULL DEFAULT FALSE,
    is_neighbor_visible  BOOLEAN NOT NULL DEFAULT FALSE,
    keywords             TEXT    NOT NULL DEFAULT '[]',
    created_at           TEXT    NOT NULL
);
"#;

const CREATE_QUESTIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS questions (
    id                   TEXT    PRIMARY KEY,
    owner_user_id        TEXT    NOT NULL,
    category_id          TEXT    NOT NULL,
    title                TEXT,
    content              TEXT    NOT NULL,
    answer               TEXT,
    is_answered          BOOLEAN NOT NULL DEFAULT FALSE,
    date                 TEXT    NOT NULL,
    is_public            BOOLEAN NOT NULL DEFAULT FALSE,
    is_neighbor_visible  BOOLEAN NOT NULL DEFAULT FALSE,
    keywords             TEXT    NOT NULL DEFAULT '[]',
    created_at           TEXT    NOT NULL
);
"#;

const CREATE_SCRAPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS scraps (
    id             TEXT PRIMARY KEY,
    owner_user_id  TEXT NOT NULL,
    content_type   TEXT NOT NULL CHECK (content_type IN ('reflection', 'question')),
    content_id     TEXT NOT NULL,
    author_id      TEXT NOT NULL,
    title          TEXT,
    preview        TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    UNIQUE (owner_user_id, content_type, content_id)
);
"#;

const CREATE_INDEXES: [&str; 9] = [
    "CREATE INDEX IF NOT EXISTS idx_categories_owner ON categories(owner_user_id)",
    "CREATE INDEX IF NOT EXISTS idx_incomes_owner_date ON incomes(owner_user_id, date)",
    "CREATE INDEX IF NOT EXISTS idx_expenses_owner_date ON expenses(owner_user_id, date)",
    "CREATE INDEX IF NOT EXISTS idx_goals_owner_status ON goals(owner_user_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_neighbors_requester ON neighbor_relationships(requester_id)",
    "CREATE INDEX IF NOT EXISTS idx_neighbors_recipient ON neighbor_relationships(recipient_id)",
    "CREATE INDEX IF NOT EXISTS idx_reflections_owner_date ON reflections(owner_user_id, date)",
    "CREATE INDEX IF NOT EXISTS idx_questions_owner_date ON questions(owner_user_id, date)",
    "CREATE INDEX IF NOT EXISTS idx_scraps_owner ON scraps(owner_user_id)",
];

/// Budget categories every new account starts with.
pub const DEFAULT_CATEGORIES: [(&str, CategoryType, &str); 7] = [
    ("Salary", CategoryType::IncomeFixed, "#10B981"),
    ("Side income", CategoryType::IncomeVariable, "#34D399"),
    ("Housing", CategoryType::ExpenseFixed, "#6366F1"),
    ("Utilities", CategoryType::ExpenseFixed, "#8B5CF6"),
    ("Food", CategoryType::ExpenseVariable, "#F59E0B"),
    ("Transport", CategoryType::ExpenseVariable, "#3B82F6"),
    ("Shopping", CategoryType::ExpenseVariable, "#EC4899"),
];

pub type Db = Arc<RwLock<Connection>>;

/// Stable id of the seeded content category for a domain.
pub fn content_category_id(domain: Domain) -> String {
    format!("content-{}", domain.as_str())
}

async fn seed_content_categories(conn: &Connection) -> Result<()> {
    for domain in Domain::ALL {
        conn.execute(
            "INSERT OR IGNORE INTO content_categories (id, name) VALUES (?, ?)",
            (content_category_id(domain), domain.as_str()),
        )
        .await?;
    }
    Ok(())
}

/// Initializes the shared application DB (daylylog.db)
pub async fn init_main_db(data_dir: &str) -> Result<Db> {
    tokio::fs::create_dir_all(data_dir).await?;
    let path = Path::new(data_dir).join(DATABASE_FILE_NAME);
    let db = Builder::new_local(path).build().await?;
    let conn = db.connect()?;

    for statement in [
        CREATE_USERS_TABLE,
        CREATE_PROFILES_TABLE,
        CREATE_CATEGORIES_TABLE,
        CREATE_INCOMES_TABLE,
        CREATE_EXPENSES_TABLE,
        CREATE_GOALS_TABLE,
        CREATE_NEIGHBOR_RELATIONSHIPS_TABLE,
        CREATE_CONTENT_CATEGORIES_TABLE,
        CREATE_REFLECTIONS_TABLE,
        CREATE_QUESTIONS_TABLE,
        CREATE_SCRAPS_TABLE,
    ] {
        conn.execute(statement, ()).await?;
    }
    for index in CREATE_INDEXES {
        conn.execute(index, ()).await?;
    }
    seed_content_categories(&conn).await?;

    tracing::debug!(data_dir, "database schema ready");
    Ok(Arc::new(RwLock::new(conn)))
}
