//! [`SqliteStore`], the SQLite implementation of the Casework store traits.
//!
//! Every mutating method is one conditional statement (or one short
//! transaction over a single user's rows), so each is atomic on its own
//! record and nothing spans cases and users.

use std::path::Path;

use casework_core::{
  artifact::{Analysis, Grade, NewAnalysis, NewGrade, NewSubmission, Submission},
  case::{Case, CaseStatus, NewCase},
  store::{ArtifactStore, CaseRegistry, UserProgressStore},
  user::User,
};
use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{CASE_COLUMNS, RawCase, RawSubmission, RawUser, SUBMISSION_COLUMNS, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Casework store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Close the underlying connection, flushing the WAL.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }
}

/// Whether `sql` (a `SELECT 1 ... WHERE x = ?1` probe) matches a row.
fn row_exists(conn: &rusqlite::Connection, sql: &str, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![id], |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

/// Read a user row and its case links.
fn load_user(conn: &rusqlite::Connection, user_id: &str) -> rusqlite::Result<Option<RawUser>> {
  let head: Option<(String, i64, String)> = conn
    .query_row(
      "SELECT user_id, total_hours, created_at FROM users WHERE user_id = ?1",
      rusqlite::params![user_id],
      |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()?;

  let Some((user_id, total_hours, created_at)) = head else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT case_id, bucket FROM user_cases
     WHERE user_id = ?1
     ORDER BY linked_at, rowid",
  )?;
  let links = stmt
    .query_map(rusqlite::params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some(RawUser { user_id, total_hours, created_at, links }))
}

// ─── CaseRegistry impl ───────────────────────────────────────────────────────

impl CaseRegistry for SqliteStore {
  type Error = Error;

  async fn create_case(&self, input: NewCase) -> Result<Case> {
    let case = Case {
      case_id:      Uuid::new_v4(),
      owner_id:     input.owner_id,
      kind:         input.kind,
      status:       CaseStatus::Ongoing,
      content:      input.content,
      created_at:   Utc::now(),
      submitted_at: None,
    };

    let id_str     = encode_uuid(case.case_id);
    let owner_id   = case.owner_id.clone();
    let kind_str   = case.kind.as_str();
    let status_str = case.status.as_str();
    let content    = case.content.clone();
    let at_str     = encode_dt(case.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cases (case_id, owner_id, kind, status, content, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, owner_id, kind_str, status_str, content, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(case)
  }

  async fn get_case(&self, case_id: Uuid) -> Result<Option<Case>> {
    let id_str = encode_uuid(case_id);

    let raw: Option<RawCase> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CASE_COLUMNS} FROM cases WHERE case_id = ?1"),
              rusqlite::params![id_str],
              RawCase::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCase::into_case).transpose()
  }

  async fn mark_completed(&self, case_id: Uuid, expected: CaseStatus) -> Result<bool> {
    // `completed` is terminal; a swap from it would only restamp the time.
    if expected.is_terminal() {
      return Ok(false);
    }

    let id_str       = encode_uuid(case_id);
    let expected_str = expected.as_str();
    let at_str       = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE cases SET status = 'completed', submitted_at = ?2
           WHERE case_id = ?1 AND status = ?3",
          rusqlite::params![id_str, at_str, expected_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn list_cases_for_owner(&self, owner_id: String) -> Result<Vec<Case>> {
    let raws: Vec<RawCase> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CASE_COLUMNS} FROM cases
           WHERE owner_id = ?1
           ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![owner_id], RawCase::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCase::into_case).collect()
  }

  async fn list_unlinked_cases(&self) -> Result<Vec<Case>> {
    let raws: Vec<RawCase> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CASE_COLUMNS} FROM cases c
           WHERE NOT EXISTS (
             SELECT 1 FROM user_cases uc
             WHERE uc.user_id = c.owner_id AND uc.case_id = c.case_id
           )
           OR (c.status = 'completed' AND EXISTS (
             SELECT 1 FROM user_cases uc
             WHERE uc.user_id = c.owner_id AND uc.case_id = c.case_id
               AND uc.bucket = 'ongoing'
           ))
           ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map([], RawCase::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCase::into_case).collect()
  }
}

// ─── UserProgressStore impl ──────────────────────────────────────────────────

impl UserProgressStore for SqliteStore {
  type Error = Error;

  async fn ensure_user(&self, user_id: String) -> Result<User> {
    let at_str = encode_dt(Utc::now());
    let id     = user_id.clone();

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, total_hours, created_at) VALUES (?1, 0, ?2)
           ON CONFLICT (user_id) DO NOTHING",
          rusqlite::params![id, at_str],
        )?;
        Ok(load_user(conn, &id)?)
      })
      .await?;

    raw.ok_or(Error::UserNotFound(user_id))?.into_user()
  }

  async fn get_user(&self, user_id: String) -> Result<Option<User>> {
    let raw = self
      .conn
      .call(move |conn| Ok(load_user(conn, &user_id)?))
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn add_ongoing(&self, user_id: String, case_id: Uuid) -> Result<()> {
    let id       = user_id.clone();
    let case_str = encode_uuid(case_id);
    let at_str   = encode_dt(Utc::now());

    let user_exists = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "SELECT 1 FROM users WHERE user_id = ?1", &id)? {
          return Ok(false);
        }
        // Already linked in either set: leave it where it is.
        conn.execute(
          "INSERT INTO user_cases (user_id, case_id, bucket, linked_at)
           VALUES (?1, ?2, 'ongoing', ?3)
           ON CONFLICT (user_id, case_id) DO NOTHING",
          rusqlite::params![id, case_str, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if user_exists { Ok(()) } else { Err(Error::UserNotFound(user_id)) }
  }

  async fn promote_to_completed(&self, user_id: String, case_id: Uuid, hours: u32) -> Result<bool> {
    let case_str = encode_uuid(case_id);
    let at_str   = encode_dt(Utc::now());

    let moved = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let moved = tx.execute(
          "UPDATE user_cases SET bucket = 'completed', linked_at = ?3
           WHERE user_id = ?1 AND case_id = ?2 AND bucket = 'ongoing'",
          rusqlite::params![user_id, case_str, at_str],
        )? == 1;
        if moved {
          tx.execute(
            "UPDATE users SET total_hours = total_hours + ?2 WHERE user_id = ?1",
            rusqlite::params![user_id, i64::from(hours)],
          )?;
        }
        tx.commit()?;
        Ok(moved)
      })
      .await?;

    Ok(moved)
  }
}

// ─── ArtifactStore impl ──────────────────────────────────────────────────────

impl ArtifactStore for SqliteStore {
  type Error = Error;

  async fn record_analysis(&self, input: NewAnalysis) -> Result<Analysis> {
    let analysis = Analysis {
      analysis_id: Uuid::new_v4(),
      case_id:     input.case_id,
      user_id:     input.user_id,
      content:     input.content,
      recorded_at: Utc::now(),
    };

    let id_str   = encode_uuid(analysis.analysis_id);
    let case_str = encode_uuid(analysis.case_id);
    let user_id  = analysis.user_id.clone();
    let content  = analysis.content.clone();
    let at_str   = encode_dt(analysis.recorded_at);

    let inserted = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "SELECT 1 FROM cases WHERE case_id = ?1", &case_str)? {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO analyses (analysis_id, case_id, user_id, content, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, case_str, user_id, content, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::CaseNotFound(analysis.case_id));
    }
    Ok(analysis)
  }

  async fn record_submission(&self, input: NewSubmission) -> Result<Submission> {
    let submission = Submission {
      submission_id: Uuid::new_v4(),
      case_id:       input.case_id,
      user_id:       input.user_id,
      side:          input.side,
      argument:      input.argument,
      submitted_at:  Utc::now(),
    };

    let id_str   = encode_uuid(submission.submission_id);
    let case_str = encode_uuid(submission.case_id);
    let user_id  = submission.user_id.clone();
    let side_str = submission.side.as_str();
    let argument = submission.argument.clone();
    let at_str   = encode_dt(submission.submitted_at);

    let inserted = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "SELECT 1 FROM cases WHERE case_id = ?1", &case_str)? {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO submissions (submission_id, case_id, user_id, side, argument, submitted_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, case_str, user_id, side_str, argument, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::CaseNotFound(submission.case_id));
    }
    Ok(submission)
  }

  async fn list_submissions(&self, case_id: Uuid) -> Result<Vec<Submission>> {
    let case_str = encode_uuid(case_id);

    let raws: Vec<RawSubmission> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE case_id = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![case_str], RawSubmission::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  async fn record_grade(&self, input: NewGrade) -> Result<Grade> {
    let grade = Grade {
      grade_id:      Uuid::new_v4(),
      submission_id: input.submission_id,
      grader_id:     input.grader_id,
      score:         input.score,
      feedback:      input.feedback,
      graded_at:     Utc::now(),
    };

    let id_str     = encode_uuid(grade.grade_id);
    let sub_str    = encode_uuid(grade.submission_id);
    let grader_id  = grade.grader_id.clone();
    let score      = i64::from(grade.score);
    let feedback   = grade.feedback.clone();
    let at_str     = encode_dt(grade.graded_at);

    let inserted = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "SELECT 1 FROM submissions WHERE submission_id = ?1", &sub_str)? {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO grades (grade_id, submission_id, grader_id, score, feedback, graded_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, sub_str, grader_id, score, feedback, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::SubmissionNotFound(grade.submission_id));
    }
    Ok(grade)
  }
}
