//! Project snapshot persistence. The snapshot is the unit of storage:
//! one JSON document per project, rewritten whole on every flush.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::Row;
use thiserror::Error;
use tokio::sync::RwLock;

use coplan_core::domain::ProjectSnapshot;

use crate::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn load_project(&self, id: &str) -> Result<Option<ProjectSnapshot>, StoreError>;
    async fn save_project(&self, snapshot: &ProjectSnapshot) -> Result<(), StoreError>;
    async fn list_project_ids(&self) -> Result<Vec<String>, StoreError>;
}

pub struct SqlProjectStore {
    pool: DbPool,
}

impl SqlProjectStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectStore for SqlProjectStore {
    async fn load_project(&self, id: &str) -> Result<Option<ProjectSnapshot>, StoreError> {
        let row = sqlx::query("SELECT snapshot FROM projects WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let body = row.get::<String, _>("snapshot");
        match serde_json::from_str::<ProjectSnapshot>(&body) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(error) => {
                // A corrupt row must not wedge the session; surface it in
                // the log and start the project fresh.
                tracing::warn!(
                    project_id = %id,
                    %error,
                    "stored project snapshot is malformed, treating as absent"
                );
                Ok(None)
            }
        }
    }

    async fn save_project(&self, snapshot: &ProjectSnapshot) -> Result<(), StoreError> {
        let body = serde_json::to_string(snapshot)?;
        let stage_hint = snapshot.stage_hint.map(|stage| stage.to_string());
        sqlx::query(
            "INSERT INTO projects (id, snapshot, stage_hint, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 snapshot = excluded.snapshot,
                 stage_hint = excluded.stage_hint,
                 updated_at = excluded.updated_at",
        )
        .bind(&snapshot.id)
        .bind(body)
        .bind(stage_hint)
        .bind(snapshot.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_project_ids(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT id FROM projects ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.get::<String, _>("id")).collect())
    }
}

/// Keyed by project id; used by tests and the doctor command's dry run.
#[derive(Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<String, ProjectSnapshot>>,
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn load_project(&self, id: &str) -> Result<Option<ProjectSnapshot>, StoreError> {
        let projects = self.projects.read().await;
        Ok(projects.get(id).cloned())
    }

    async fn save_project(&self, snapshot: &ProjectSnapshot) -> Result<(), StoreError> {
        let mut projects = self.projects.write().await;
        projects.insert(snapshot.id.clone(), snapshot.clone());
        Ok(())
    }

    async fn list_project_ids(&self) -> Result<Vec<String>, StoreError> {
        let projects = self.projects.read().await;
        Ok(projects.keys().cloned().collect())
    }
}
