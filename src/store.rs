//! SQLite-backed persistence for learning records and app settings.
//!
//! One connection behind a `Mutex`. Every operation is a single statement
//! (voice settings write two rows under one lock hold), and the lock is never
//! held across an `.await`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use crate::domain::{Badge, LeaderboardRow, Lesson, ProgressMetric, Streak, User, VocabEntry};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS vocab (id INTEGER PRIMARY KEY, word TEXT NOT NULL, meaning TEXT NOT NULL DEFAULT '', mastered INTEGER NOT NULL DEFAULT 0);
CREATE TABLE IF NOT EXISTS progress (id INTEGER PRIMARY KEY, metric TEXT NOT NULL, value INTEGER NOT NULL DEFAULT 0);
CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY, email TEXT UNIQUE NOT NULL, password TEXT NOT NULL, name TEXT NOT NULL DEFAULT '');
CREATE TABLE IF NOT EXISTS lessons (id INTEGER PRIMARY KEY, title TEXT NOT NULL, content TEXT NOT NULL DEFAULT '', difficulty TEXT NOT NULL DEFAULT '', created_at DATETIME DEFAULT CURRENT_TIMESTAMP);
CREATE TABLE IF NOT EXISTS user_streaks (id INTEGER PRIMARY KEY, user_id INTEGER UNIQUE NOT NULL, streak_count INTEGER NOT NULL DEFAULT 0, last_activity DATE);
CREATE TABLE IF NOT EXISTS badges (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, badge_name TEXT NOT NULL, earned_at DATETIME DEFAULT CURRENT_TIMESTAMP);
CREATE TABLE IF NOT EXISTS leaderboard (id INTEGER PRIMARY KEY, user_id INTEGER UNIQUE NOT NULL, score INTEGER NOT NULL DEFAULT 0, updated_at DATETIME DEFAULT CURRENT_TIMESTAMP);
CREATE TABLE IF NOT EXISTS app_settings (id INTEGER PRIMARY KEY, setting_key TEXT UNIQUE NOT NULL, setting_value TEXT NOT NULL);
";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("SQLite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("already exists: {0}")]
  Duplicate(String),

  #[error("lock poisoned: {0}")]
  Lock(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

pub struct Store {
  conn: Mutex<Connection>,
}

impl Store {
  /// Open (or create) the database file and apply the schema.
  pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
    Self::with_connection(Connection::open(path)?)
  }

  /// Private in-memory database; used by tests and throwaway runs.
  pub fn open_in_memory() -> StoreResult<Self> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> StoreResult<Self> {
    conn.execute_batch(SCHEMA)?;
    Ok(Self { conn: Mutex::new(conn) })
  }

  fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
  }

  // --- Settings ---

  pub fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
    let conn = self.lock()?;
    let v = conn
      .query_row("SELECT setting_value FROM app_settings WHERE setting_key = ?1", params![key], |r| r.get(0))
      .optional()?;
    Ok(v)
  }

  pub fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
    let conn = self.lock()?;
    upsert_setting(&conn, key, value)?;
    Ok(())
  }

  pub fn set_settings(&self, pairs: &[(&str, &str)]) -> StoreResult<()> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    for (k, v) in pairs {
      upsert_setting(&tx, k, v)?;
    }
    tx.commit()?;
    Ok(())
  }

  // --- Vocabulary ---

  pub fn list_vocab(&self) -> StoreResult<Vec<VocabEntry>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare("SELECT id, word, meaning, mastered FROM vocab ORDER BY id")?;
    let rows = stmt.query_map([], |r| {
      Ok(VocabEntry { id: r.get(0)?, word: r.get(1)?, meaning: r.get(2)?, mastered: r.get(3)? })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
  }

  pub fn add_vocab(&self, word: &str, meaning: &str) -> StoreResult<i64> {
    let conn = self.lock()?;
    conn.execute("INSERT INTO vocab (word, meaning) VALUES (?1, ?2)", params![word, meaning])?;
    Ok(conn.last_insert_rowid())
  }

  pub fn set_vocab_mastered(&self, id: i64, mastered: bool) -> StoreResult<usize> {
    let conn = self.lock()?;
    Ok(conn.execute("UPDATE vocab SET mastered = ?1 WHERE id = ?2", params![mastered as i64, id])?)
  }

  pub fn delete_vocab(&self, id: i64) -> StoreResult<usize> {
    let conn = self.lock()?;
    Ok(conn.execute("DELETE FROM vocab WHERE id = ?1", params![id])?)
  }

  // --- Users ---

  pub fn register_user(&self, email: &str, password: &str, name: &str) -> StoreResult<i64> {
    let conn = self.lock()?;
    let digest = hash_password(password, &new_salt());
    match conn.execute(
      "INSERT INTO users (email, password, name) VALUES (?1, ?2, ?3)",
      params![email, digest, name],
    ) {
      Ok(_) => Ok(conn.last_insert_rowid()),
      Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
        Err(StoreError::Duplicate(format!("user {email}")))
      }
      Err(e) => Err(e.into()),
    }
  }

  /// The user when the credentials match, `None` otherwise.
  pub fn verify_login(&self, email: &str, password: &str) -> StoreResult<Option<User>> {
    let conn = self.lock()?;
    let row = conn
      .query_row(
        "SELECT id, email, name, password FROM users WHERE email = ?1",
        params![email],
        |r| Ok((User { id: r.get(0)?, email: r.get(1)?, name: r.get(2)? }, r.get::<_, String>(3)?)),
      )
      .optional()?;
    Ok(row.and_then(|(user, stored)| password_matches(&stored, password).then_some(user)))
  }

  // --- Lessons ---

  pub fn list_lessons(&self) -> StoreResult<Vec<Lesson>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(
      "SELECT id, title, content, difficulty, created_at FROM lessons ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |r| {
      Ok(Lesson {
        id: r.get(0)?,
        title: r.get(1)?,
        content: r.get(2)?,
        difficulty: r.get(3)?,
        created_at: r.get(4)?,
      })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
  }

  pub fn add_lesson(&self, title: &str, content: &str, difficulty: &str) -> StoreResult<i64> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT INTO lessons (title, content, difficulty) VALUES (?1, ?2, ?3)",
      params![title, content, difficulty],
    )?;
    Ok(conn.last_insert_rowid())
  }

  pub fn update_lesson(&self, id: i64, title: &str, content: &str, difficulty: &str) -> StoreResult<usize> {
    let conn = self.lock()?;
    Ok(conn.execute(
      "UPDATE lessons SET title = ?1, content = ?2, difficulty = ?3 WHERE id = ?4",
      params![title, content, difficulty, id],
    )?)
  }

  pub fn delete_lesson(&self, id: i64) -> StoreResult<usize> {
    let conn = self.lock()?;
    Ok(conn.execute("DELETE FROM lessons WHERE id = ?1", params![id])?)
  }

  // --- Streaks, badges, leaderboard ---

  pub fn get_streak(&self, user_id: i64) -> StoreResult<Option<Streak>> {
    let conn = self.lock()?;
    let row = conn
      .query_row(
        "SELECT id, user_id, streak_count, last_activity FROM user_streaks WHERE user_id = ?1",
        params![user_id],
        |r| Ok(Streak { id: r.get(0)?, user_id: r.get(1)?, streak_count: r.get(2)?, last_activity: r.get(3)? }),
      )
      .optional()?;
    Ok(row)
  }

  pub fn upsert_streak(&self, user_id: i64, streak_count: i64) -> StoreResult<()> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT INTO user_streaks (user_id, streak_count, last_activity) VALUES (?1, ?2, DATE('now'))
       ON CONFLICT(user_id) DO UPDATE SET streak_count = excluded.streak_count, last_activity = excluded.last_activity",
      params![user_id, streak_count],
    )?;
    Ok(())
  }

  pub fn list_badges(&self, user_id: i64) -> StoreResult<Vec<Badge>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare("SELECT id, user_id, badge_name, earned_at FROM badges WHERE user_id = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![user_id], |r| {
      Ok(Badge { id: r.get(0)?, user_id: r.get(1)?, badge_name: r.get(2)?, earned_at: r.get(3)? })
    })?;
    Ok(rows.collect::<Result<_, _>>()?)
  }

  pub fn award_badge(&self, user_id: i64, badge_name: &str) -> StoreResult<i64> {
    let conn = self.lock()?;
    conn.execute("INSERT INTO badges (user_id, badge_name) VALUES (?1, ?2)", params![user_id, badge_name])?;
    Ok(conn.last_insert_rowid())
  }

  /// Top ten scores joined with user names and current streaks.
  pub fn leaderboard(&self) -> StoreResult<Vec<LeaderboardRow>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(
      "SELECT u.name, l.score, s.streak_count
       FROM leaderboard l
       JOIN users u ON l.user_id = u.id
       LEFT JOIN user_streaks s ON l.user_id = s.user_id
       ORDER BY l.score DESC LIMIT 10",
    )?;
    let rows = stmt.query_map([], |r| Ok(LeaderboardRow { name: r.get(0)?, score: r.get(1)?, streak_count: r.get(2)? }))?;
    Ok(rows.collect::<Result<_, _>>()?)
  }

  pub fn upsert_score(&self, user_id: i64, score: i64) -> StoreResult<()> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT INTO leaderboard (user_id, score) VALUES (?1, ?2)
       ON CONFLICT(user_id) DO UPDATE SET score = excluded.score, updated_at = CURRENT_TIMESTAMP",
      params![user_id, score],
    )?;
    Ok(())
  }

  // --- Progress ---

  pub fn list_progress(&self) -> StoreResult<Vec<ProgressMetric>> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare("SELECT id, metric, value FROM progress ORDER BY id")?;
    let rows = stmt.query_map([], |r| Ok(ProgressMetric { id: r.get(0)?, metric: r.get(1)?, value: r.get(2)? }))?;
    Ok(rows.collect::<Result<_, _>>()?)
  }

  pub fn add_progress(&self, metric: &str, value: i64) -> StoreResult<i64> {
    let conn = self.lock()?;
    conn.execute("INSERT INTO progress (metric, value) VALUES (?1, ?2)", params![metric, value])?;
    Ok(conn.last_insert_rowid())
  }
}

fn upsert_setting(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<usize> {
  conn.execute(
    "INSERT INTO app_settings (setting_key, setting_value) VALUES (?1, ?2)
     ON CONFLICT(setting_key) DO UPDATE SET setting_value = excluded.setting_value",
    params![key, value],
  )
}

// --- Password digests: "salt$sha256(salt || password)" ---

fn new_salt() -> String {
  let bytes: [u8; 16] = rand::thread_rng().gen();
  to_hex(&bytes)
}

fn hash_password(password: &str, salt: &str) -> String {
  let mut h = Sha256::new();
  h.update(salt.as_bytes());
  h.update(password.as_bytes());
  format!("{}${}", salt, to_hex(&h.finalize()))
}

fn password_matches(stored: &str, password: &str) -> bool {
  match stored.split_once('$') {
    Some((salt, _)) => hash_password(password, salt) == stored,
    None => false,
  }
}

fn to_hex(bytes: &[u8]) -> String {
  bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
