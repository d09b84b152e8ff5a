pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS methods (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL,
    initial_balance TEXT,
    archived        BOOLEAN NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entries (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_type      TEXT NOT NULL,
    date            TEXT NOT NULL,
    amount          TEXT NOT NULL,
    method_id       INTEGER NOT NULL REFERENCES methods(id),
    category_id     INTEGER,
    purpose         TEXT,
    private_purpose TEXT,
    note            TEXT,
    evidence_note   TEXT,
    debt_id         INTEGER REFERENCES debts(id),
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entries_date ON entries(date);
CREATE INDEX IF NOT EXISTS idx_entries_method ON entries(method_id);
CREATE INDEX IF NOT EXISTS idx_entries_category ON entries(category_id);
CREATE INDEX IF NOT EXISTS idx_entries_debt ON entries(debt_id);

CREATE TABLE IF NOT EXISTS debts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    debt_type     TEXT NOT NULL,
    root_entry_id INTEGER NOT NULL UNIQUE REFERENCES entries(id),
    date          TEXT NOT NULL,
    amount        TEXT NOT NULL,
    counterpart   TEXT NOT NULL,
    repaid_at     TEXT,
    memo          TEXT
);

CREATE INDEX IF NOT EXISTS idx_debts_repaid ON debts(repaid_at);

CREATE TABLE IF NOT EXISTS transfers (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    root_entry_id  INTEGER NOT NULL UNIQUE REFERENCES entries(id),
    from_method_id INTEGER NOT NULL REFERENCES methods(id),
    to_method_id   INTEGER NOT NULL REFERENCES methods(id),
    date           TEXT NOT NULL,
    note           TEXT,
    CHECK (from_method_id <> to_method_id)
);

CREATE INDEX IF NOT EXISTS idx_transfers_from ON transfers(from_method_id);
CREATE INDEX IF NOT EXISTS idx_transfers_to ON transfers(to_method_id);

"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[
    // Future migrations go here:
    // (1, "ALTER TABLE entries ADD COLUMN recurring BOOLEAN NOT NULL DEFAULT 0;"),
];
