// Server configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_DATA_PATH: &str = "data";
pub const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:8080";
pub const DATABASE_FILE_NAME: &str = "daylylog.db";
pub const DEFAULT_LOG_FILTER: &str = "info,daylylog_server=debug";

// Session configuration
pub const SESSION_NAME: &str = "daylylog_session";
pub const SESSION_EXPIRY_DAYS: i64 = 30;
pub const MIN_SESSION_SECRET_LENGTH: usize = 64;

// Database limits and defaults
pub const DEFAULT_CATEGORIES_LIMIT: u32 = 100;
pub const DEFAULT_TRANSACTIONS_LIMIT: u32 = 500;
pub const DEFAULT_GOALS_LIMIT: u32 = 100;
pub const DEFAULT_POSTS_LIMIT: u32 = 100;
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 1000;
pub const MAX_OFFSET: u32 = 1_000_000;

// Validation limits
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;
pub const MAX_TRANSACTION_NAME_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_GOAL_TITLE_LENGTH: usize = 200;
pub const MAX_POST_TITLE_LENGTH: usize = 200;
pub const MAX_POST_CONTENT_LENGTH: usize = 10_000;
pub const MAX_KEYWORDS: usize = 20;
pub const MAX_KEYWORD_LENGTH: usize = 50;
pub const MAX_SEARCH_TERM_LENGTH: usize = 100;
pub const MIN_SEARCH_TERM_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_USERNAME_LENGTH: usize = 4;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_COLOR_LENGTH: usize = 32;
pub const SCRAP_PREVIEW_LENGTH: usize = 120;
pub const DEFAULT_CATEGORY_COLOR: &str = "#9CA3AF";

// Neighbor relationship status

// Progress bar thresholds
pub const PROGRESS_COMPLETE: i64 = 100;
pub const EXPENSE_WARNING_THRESHOLD: i64 = 80;

// Error messages
pub const ERR_DATABASE_OPERATION: &str = "Database operation failed";
pub const MSG_GOAL_ACHIEVED: &str = "Goal achieved!";
pub const MSG_NO_TARGET: &str = "No target set";
