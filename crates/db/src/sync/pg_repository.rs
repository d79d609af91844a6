use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::sync::models::SyncState;
use crate::sync::repositories::StateRepository;
use bronto_common::error::{BrontoError, BrontoResult};

/// Stores one state document per tap id in the `tap_state` table.
#[derive(Clone)]
pub struct PgStateRepository {
    pool: PgPool,
    tap_id: String,
}

impl PgStateRepository {
    pub fn new(pool: PgPool, tap_id: &str) -> Self {
        Self {
            pool,
            tap_id: tap_id.to_owned(),
        }
    }

    /// Create the backing table if it does not exist yet.
    pub async fn ensure_schema(&self) -> BrontoResult<()> {
        sqlx::query(
            "create table if not exists tap_state (
               tap_id text primary key,
               value jsonb not null,
               updated_at timestamptz not null default now()
             )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| BrontoError::State(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl StateRepository for PgStateRepository {
    async fn load(&self) -> BrontoResult<SyncState> {
        let row = sqlx::query("select value from tap_state where tap_id = $1")
            .bind(&self.tap_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BrontoError::State(e.to_string()))?;

        match row {
            Some(r) => {
                let Json(state): Json<SyncState> = r
                    .try_get("value")
                    .map_err(|e| BrontoError::State(e.to_string()))?;
                Ok(state)
            }
            None => Ok(SyncState::default()),
        }
    }

    async fn persist(&self, state: &SyncState) -> BrontoResult<()> {
        sqlx::query(
            "insert into tap_state (tap_id, value, updated_at)
             values ($1, $2, now())
             on conflict (tap_id) do update set value = excluded.value, updated_at = now()",
        )
        .bind(&self.tap_id)
        .bind(Json(state.clone()))
        .execute(&self.pool)
        .await
        .map_err(|e| BrontoError::State(e.to_string()))?;

        tracing::debug!(tap_id = %self.tap_id, "state persisted");
        Ok(())
    }
}
