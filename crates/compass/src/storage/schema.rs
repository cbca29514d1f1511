//! `SQLite` schema definitions for compass.
//!
//! Enum columns carry `CHECK` constraints listing the exact text each Rust
//! enum stores. List columns (`*_ids`, `target_roles`, `acknowledged_by`) and
//! opaque payloads (`content`, `details`) are JSON text.

/// Key/value table for the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Identities owned by the local identity service.
pub const CREATE_AUTH_IDENTITIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS auth_identities (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_sign_in_at TEXT
)
";

/// Sessions issued by the local identity service. Only token hashes are kept.
pub const CREATE_AUTH_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS auth_sessions (
    token_hash TEXT PRIMARY KEY,
    identity_id TEXT NOT NULL REFERENCES auth_identities(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
)
";

/// Application profiles.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    uid TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    display_name TEXT NOT NULL,
    position TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'manager'
        CHECK (role IN ('owner', 'administrator', 'director', 'manager')),
    holding_company_id TEXT REFERENCES holding_companies(id),
    subsidiary_ids TEXT NOT NULL DEFAULT '[]',
    division_ids TEXT NOT NULL DEFAULT '[]',
    manager_setup_complete INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'inactive')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Holding companies.
pub const CREATE_HOLDING_COMPANIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS holding_companies (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Subsidiaries.
pub const CREATE_SUBSIDIARIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS subsidiaries (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    holding_company_id TEXT NOT NULL REFERENCES holding_companies(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Divisions.
pub const CREATE_DIVISIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS divisions (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    subsidiary_id TEXT NOT NULL REFERENCES subsidiaries(id),
    strategic_plan TEXT,
    start_date TEXT NOT NULL,
    end_date TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Goals.
pub const CREATE_GOALS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS goals (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(uid),
    title TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'Not Started'
        CHECK (status IN ('Not Started', 'In Progress', 'Completed', 'Needs Review', 'Archived')),
    target_completion_date TEXT,
    related_division_id TEXT REFERENCES divisions(id),
    related_subsidiary_id TEXT REFERENCES subsidiaries(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Reviews.
pub const CREATE_REVIEWS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    goal_id TEXT NOT NULL REFERENCES goals(id),
    reviewee_id TEXT NOT NULL REFERENCES users(uid),
    reviewer_id TEXT NOT NULL REFERENCES users(uid),
    performance_rating REAL,
    comments TEXT,
    status TEXT NOT NULL DEFAULT 'Submitted' CHECK (status IN ('Submitted', 'Acknowledged')),
    submitted_at TEXT NOT NULL
)
";

/// Division reports.
pub const CREATE_REPORTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS reports (
    id TEXT PRIMARY KEY,
    division_id TEXT NOT NULL REFERENCES divisions(id),
    period TEXT NOT NULL,
    content TEXT,
    status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved', 'rejected')),
    submitted_at TEXT NOT NULL,
    submitted_by TEXT NOT NULL REFERENCES users(uid)
)
";

/// Plan updates.
pub const CREATE_PLAN_UPDATES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS plan_updates (
    id TEXT PRIMARY KEY,
    posted_by TEXT NOT NULL REFERENCES users(uid),
    content TEXT NOT NULL,
    target_roles TEXT NOT NULL,
    acknowledged_by TEXT NOT NULL DEFAULT '[]',
    posted_at TEXT NOT NULL
)
";

/// Audit log.
pub const CREATE_AUDIT_LOGS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS audit_logs (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    action TEXT NOT NULL,
    details TEXT,
    timestamp TEXT NOT NULL
)
";

/// Index for listing a user's goals.
pub const CREATE_GOALS_USER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_goals_user ON goals(user_id)
";

/// Index for listing reviews of a reviewee.
pub const CREATE_REVIEWS_REVIEWEE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_reviews_reviewee ON reviews(reviewee_id)
";

/// Index for listing a division's reports.
pub const CREATE_REPORTS_DIVISION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_reports_division ON reports(division_id)
";

/// Index for reading the audit log newest first.
pub const CREATE_AUDIT_TIMESTAMP_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_audit_logs_timestamp ON audit_logs(timestamp DESC)
";

/// All schema creation statements in dependency order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_METADATA_TABLE,
    CREATE_AUTH_IDENTITIES_TABLE,
    CREATE_AUTH_SESSIONS_TABLE,
    CREATE_HOLDING_COMPANIES_TABLE,
    CREATE_SUBSIDIARIES_TABLE,
    CREATE_DIVISIONS_TABLE,
    CREATE_USERS_TABLE,
    CREATE_GOALS_TABLE,
    CREATE_REVIEWS_TABLE,
    CREATE_REPORTS_TABLE,
    CREATE_PLAN_UPDATES_TABLE,
    CREATE_AUDIT_LOGS_TABLE,
    CREATE_GOALS_USER_INDEX,
    CREATE_REVIEWS_REVIEWEE_INDEX,
    CREATE_REPORTS_DIVISION_INDEX,
    CREATE_AUDIT_TIMESTAMP_INDEX,
];

/// Tables the application owns, in the order they are created.
pub const APPLICATION_TABLES: &[&str] = &[
    "holding_companies",
    "subsidiaries",
    "divisions",
    "users",
    "goals",
    "reviews",
    "reports",
    "plan_updates",
    "audit_logs",
];
