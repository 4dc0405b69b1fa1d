mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use itropa_core::models::*;

use crate::repository::{check_version, Repository, RepositoryError, RepositoryResult};

/// SQLite store for needs and cached analyses.
///
/// Needs are stored as JSON documents next to the columns used for lookup
/// and optimistic versioning.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Result of a version-guarded need write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// The stored version already equals the written one.
    Unchanged,
    Stale { stored: u64 },
    Missing,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Need operations
    // ============================================================

    pub fn get_all_needs(&self) -> Result<Vec<Need>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare("SELECT document FROM needs ORDER BY created_at, name")?;

        let documents = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        documents.iter().map(|doc| parse_need(doc)).collect()
    }

    pub fn get_need(&self, id: Uuid) -> Result<Option<Need>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM needs WHERE id = ?",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        document.as_deref().map(parse_need).transpose()
    }

    /// Inserts the need or replaces the stored copy regardless of version.
    pub fn put_need(&self, need: &Need) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let document = serde_json::to_string(need).context("Failed to serialize need")?;

        conn.execute(
            "INSERT INTO needs (id, name, version, document, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                version = excluded.version,
                document = excluded.document,
                updated_at = excluded.updated_at",
            (
                need.id.to_string(),
                &need.name,
                need.version as i64,
                &document,
                need.created_at.to_rfc3339(),
                need.updated_at.to_rfc3339(),
            ),
        )?;

        Ok(())
    }

    /// Replaces the stored need only if `need.version` is newer.
    pub fn update_need(&self, need: &Need) -> Result<UpdateOutcome> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let document = serde_json::to_string(need).context("Failed to serialize need")?;

        let rows = conn.execute(
            "UPDATE needs SET name = ?, version = ?, document = ?, updated_at = ?
             WHERE id = ? AND version < ?",
            (
                &need.name,
                need.version as i64,
                &document,
                need.updated_at.to_rfc3339(),
                need.id.to_string(),
                need.version as i64,
            ),
        )?;
        if rows > 0 {
            return Ok(UpdateOutcome::Updated);
        }

        let stored: Option<i64> = conn
            .query_row(
                "SELECT version FROM needs WHERE id = ?",
                [need.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(match stored {
            None => UpdateOutcome::Missing,
            Some(stored) if stored as u64 == need.version => UpdateOutcome::Unchanged,
            Some(stored) => UpdateOutcome::Stale {
                stored: stored as u64,
            },
        })
    }

    /// Deletes a need and every analysis cached for it.
    pub fn delete_need(&self, id: Uuid) -> Result<bool> {
        let mut conn = self.conn.lock().expect("database lock poisoned");
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM analyses WHERE need_id = ?", [id.to_string()])?;
        let rows = tx.execute("DELETE FROM needs WHERE id = ?", [id.to_string()])?;
        tx.commit()?;
        Ok(rows > 0)
    }

    // ============================================================
    // Analysis operations
    // ============================================================

    pub fn put_analysis(&self, analysis: &CachedAnalysis) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");

        conn.execute(
            "INSERT OR REPLACE INTO analyses (kind, key, need_id, expression_ids, body, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                analysis.kind.as_str(),
                &analysis.key,
                analysis.need_id.to_string(),
                serde_json::to_string(&analysis.expression_ids)?,
                serde_json::to_string(&analysis.body)?,
                analysis.created_at.to_rfc3339(),
            ),
        )?;

        Ok(())
    }

    pub fn get_analysis(&self, kind: AnalysisKind, key: &str) -> Result<Option<CachedAnalysis>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let row = conn
            .query_row(
                "SELECT kind, key, need_id, expression_ids, body, created_at
                 FROM analyses WHERE kind = ? AND key = ?",
                (kind.as_str(), key),
                AnalysisRow::from_row,
            )
            .optional()?;

        row.map(AnalysisRow::into_analysis).transpose()
    }

    pub fn get_all_analyses(&self) -> Result<Vec<CachedAnalysis>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT kind, key, need_id, expression_ids, body, created_at
             FROM analyses ORDER BY created_at",
        )?;

        let rows = stmt
            .query_map([], AnalysisRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(AnalysisRow::into_analysis).collect()
    }

    pub fn delete_analysis(&self, kind: AnalysisKind, key: &str) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute(
            "DELETE FROM analyses WHERE kind = ? AND key = ?",
            (kind.as_str(), key),
        )?;
        Ok(rows > 0)
    }
}

#[async_trait]
impl Repository for Database {
    async fn save_need(&self, need: &Need) -> RepositoryResult<()> {
        Ok(self.put_need(need)?)
    }

    async fn update_need(&self, need: &Need) -> RepositoryResult<()> {
        match Database::update_need(self, need)? {
            UpdateOutcome::Updated | UpdateOutcome::Unchanged => Ok(()),
            UpdateOutcome::Stale { stored } => {
                check_version(need.id, stored, need.version).map(|_| ())
            }
            UpdateOutcome::Missing => Err(RepositoryError::NeedNotFound(need.id)),
        }
    }

    async fn get_need(&self, id: Uuid) -> RepositoryResult<Option<Need>> {
        Ok(Database::get_need(self, id)?)
    }

    async fn all_needs(&self) -> RepositoryResult<Vec<Need>> {
        Ok(self.get_all_needs()?)
    }

    async fn delete_need(&self, id: Uuid) -> RepositoryResult<bool> {
        Ok(Database::delete_need(self, id)?)
    }

    async fn save_analysis(&self, analysis: &CachedAnalysis) -> RepositoryResult<()> {
        Ok(self.put_analysis(analysis)?)
    }

    async fn get_analysis(
        &self,
        kind: AnalysisKind,
        key: &str,
    ) -> RepositoryResult<Option<CachedAnalysis>> {
        Ok(Database::get_analysis(self, kind, key)?)
    }

    async fn all_analyses(&self) -> RepositoryResult<Vec<CachedAnalysis>> {
        Ok(self.get_all_analyses()?)
    }

    async fn delete_analysis(&self, kind: AnalysisKind, key: &str) -> RepositoryResult<bool> {
        Ok(Database::delete_analysis(self, kind, key)?)
    }
}

/// Raw analysis columns, decoded outside the rusqlite row callback.
struct AnalysisRow {
    kind: String,
    key: String,
    need_id: String,
    expression_ids: String,
    body: String,
    created_at: String,
}

impl AnalysisRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            kind: row.get(0)?,
            key: row.get(1)?,
            need_id: row.get(2)?,
            expression_ids: row.get(3)?,
            body: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_analysis(self) -> Result<CachedAnalysis> {
        let kind = AnalysisKind::from_str(&self.kind)
            .ok_or_else(|| anyhow::anyhow!("Unknown analysis kind: {}", self.kind))?;
        Ok(CachedAnalysis {
            kind,
            key: self.key,
            need_id: parse_uuid(self.need_id),
            expression_ids: serde_json::from_str(&self.expression_ids)
                .context("Invalid expression_ids column")?,
            body: serde_json::from_str(&self.body).context("Invalid analysis body")?,
            created_at: parse_datetime(self.created_at),
        })
    }
}

fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "itropa")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("itropa.db"))
}

fn parse_need(document: &str) -> Result<Need> {
    serde_json::from_str(document).context("Invalid need document")
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
