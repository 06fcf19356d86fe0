// src/store.rs
// SQLite-backed story store. Append-only from the pipeline's point of view:
// rows are inserted once and never updated or deleted here.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::models::{NewStory, Story};

/// Upper bound on `search` results regardless of the requested limit.
pub const MAX_SEARCH_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The `hn_id` uniqueness constraint fired. Benign under concurrent
    /// runs: the row is already there, which is all the caller wanted.
    #[error("story with hn_id {0} already stored")]
    Duplicate(i64),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

pub struct StoryStore {
    conn: Mutex<Connection>,
}

impl StoryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::from_connection(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stories (
                id           INTEGER PRIMARY KEY,
                hn_id        INTEGER UNIQUE NOT NULL,
                title        TEXT NOT NULL,
                url          TEXT,
                text         TEXT,
                score        INTEGER,
                "by"         TEXT,
                time         INTEGER,
                category     TEXT,
                subcategory  TEXT,
                summary      TEXT,
                tags         TEXT,
                relevance    REAL,
                is_processed BOOLEAN NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_stories_hn_id ON stories(hn_id);
            "#,
        )?;
        Ok(())
    }

    pub fn exists(&self, hn_id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM stories WHERE hn_id = ?1",
                params![hn_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn insert(&self, story: &NewStory) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let created_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let result = conn.execute(
            r#"INSERT INTO stories
               (hn_id, title, url, text, score, "by", time, category,
                subcategory, summary, tags, relevance, is_processed, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
            params![
                story.hn_id,
                story.title,
                story.url,
                story.text,
                story.score,
                story.by,
                story.time,
                story.category,
                story.subcategory,
                story.summary,
                story.tags,
                story.relevance,
                story.is_processed,
                created_at,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Duplicate(story.hn_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stored stories newest-first, optionally filtered by case-insensitive
    /// substring match over title, category, subcategory, and tags.
    pub fn search(&self, q: Option<&str>, limit: usize) -> Result<Vec<Story>, StoreError> {
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT) as i64;
        let conn = self.conn.lock().expect("store mutex poisoned");

        let rows = match q {
            Some(q) if !q.is_empty() => {
                let pattern = format!("%{q}%");
                let mut stmt = conn.prepare(
                    "SELECT * FROM stories
                     WHERE title LIKE ?1 OR category LIKE ?1
                        OR subcategory LIKE ?1 OR tags LIKE ?1
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?2",
                )?;
                let mapped = stmt.query_map(params![pattern, limit], row_to_story)?;
                mapped.collect::<rusqlite::Result<Vec<_>>>()?
            }
            _ => {
                let mut stmt = conn.prepare(
                    "SELECT * FROM stories ORDER BY created_at DESC, id DESC LIMIT ?1",
                )?;
                let mapped = stmt.query_map(params![limit], row_to_story)?;
                mapped.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(rows)
    }

    pub fn get_by_hn_id(&self, hn_id: i64) -> Result<Option<Story>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let story = conn
            .query_row(
                "SELECT * FROM stories WHERE hn_id = ?1",
                params![hn_id],
                row_to_story,
            )
            .optional()?;
        Ok(story)
    }
}

fn row_to_story(row: &rusqlite::Row<'_>) -> rusqlite::Result<Story> {
    Ok(Story {
        id: row.get("id")?,
        hn_id: row.get("hn_id")?,
        title: row.get("title")?,
        url: row.get("url")?,
        text: row.get("text")?,
        score: row.get("score")?,
        by: row.get("by")?,
        time: row.get("time")?,
        category: row.get("category")?,
        subcategory: row.get("subcategory")?,
        summary: row.get("summary")?,
        tags: row.get("tags")?,
        relevance: row.get("relevance")?,
        is_processed: row.get("is_processed")?,
        created_at: row.get("created_at")?,
    })
}
