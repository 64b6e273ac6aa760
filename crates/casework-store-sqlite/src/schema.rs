//! SQL schema for the Casework SQLite store.
//!
//! One table per collection. Cases and users reference each other only by id
//! string; `user_cases` is the users collection's case-id sets, so it carries
//! no foreign key into `cases`.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Only status and submitted_at are ever updated, and only ongoing -> completed.
CREATE TABLE IF NOT EXISTS cases (
    case_id      TEXT PRIMARY KEY,
    owner_id     TEXT NOT NULL,
    kind         TEXT NOT NULL,   -- 'new' | 'litigate' | 'judge' | 'grade'
    status       TEXT NOT NULL CHECK (status IN ('ongoing', 'completed')),
    content      TEXT NOT NULL,
    created_at   TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    submitted_at TEXT             -- set by the completing update
);

CREATE TABLE IF NOT EXISTS users (
    user_id     TEXT PRIMARY KEY,
    total_hours INTEGER NOT NULL DEFAULT 0 CHECK (total_hours >= 0),
    created_at  TEXT NOT NULL
);

-- A user's ongoing and completed case-id sets. The primary key keeps every
-- case id in exactly one set, at most once.
CREATE TABLE IF NOT EXISTS user_cases (
    user_id   TEXT NOT NULL REFERENCES users(user_id),
    case_id   TEXT NOT NULL,
    bucket    TEXT NOT NULL CHECK (bucket IN ('ongoing', 'completed')),
    linked_at TEXT NOT NULL,
    PRIMARY KEY (user_id, case_id)
);

-- Artifacts are strictly append-only.
CREATE TABLE IF NOT EXISTS analyses (
    analysis_id TEXT PRIMARY KEY,
    case_id     TEXT NOT NULL REFERENCES cases(case_id),
    user_id     TEXT NOT NULL,
    content     TEXT NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS submissions (
    submission_id TEXT PRIMARY KEY,
    case_id       TEXT NOT NULL REFERENCES cases(case_id),
    user_id       TEXT NOT NULL,
    side          TEXT NOT NULL CHECK (side IN ('plaintiff', 'defendant')),
    argument      TEXT NOT NULL,
    submitted_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS grades (
    grade_id      TEXT PRIMARY KEY,
    submission_id TEXT NOT NULL REFERENCES submissions(submission_id),
    grader_id     TEXT NOT NULL,
    score         INTEGER NOT NULL CHECK (score BETWEEN 0 AND 100),
    feedback      TEXT NOT NULL,
    graded_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS cases_owner_idx       ON cases(owner_id);
CREATE INDEX IF NOT EXISTS analyses_case_idx     ON analyses(case_id);
CREATE INDEX IF NOT EXISTS submissions_case_idx  ON submissions(case_id);
CREATE INDEX IF NOT EXISTS grades_submission_idx ON grades(submission_id);

PRAGMA user_version = 1;
";
