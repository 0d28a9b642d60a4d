use std::collections::BTreeMap;

use sqlx::{sqlite::SqliteRow, Row};

use fuelbid_core::audit::{AuditEvent, AuditOutcome};
use fuelbid_core::domain::boq::BoqId;

use super::{parse_timestamp, AuditRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditRepository {
    pool: DbPool,
}

impl SqlAuditRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AuditRepository for SqlAuditRepository {
    async fn record(&self, event: AuditEvent) -> Result<(), RepositoryError> {
        let metadata_json = serde_json::to_string(&event.metadata)
            .map_err(|error| RepositoryError::Decode(format!("encode metadata: {error}")))?;

        sqlx::query(
            "INSERT INTO audit_event (
                event_id,
                boq_id,
                correlation_id,
                event_type,
                actor,
                actor_role,
                outcome,
                metadata_json,
                occurred_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.event_id)
        .bind(event.boq_id.as_ref().map(|id| id.0.as_str()))
        .bind(&event.correlation_id)
        .bind(&event.event_type)
        .bind(&event.actor)
        .bind(event.actor_role.as_str())
        .bind(event.outcome.as_str())
        .bind(metadata_json)
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_boq(&self, boq_id: &BoqId) -> Result<Vec<AuditEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                event_id,
                boq_id,
                correlation_id,
                event_type,
                actor,
                actor_role,
                outcome,
                metadata_json,
                occurred_at
             FROM audit_event
             WHERE boq_id = ?
             ORDER BY occurred_at ASC, event_id ASC",
        )
        .bind(&boq_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }
}

fn event_from_row(row: &SqliteRow) -> Result<AuditEvent, RepositoryError> {
    let outcome_raw = row.try_get::<String, _>("outcome")?;
    let outcome = AuditOutcome::parse(&outcome_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown audit outcome `{outcome_raw}`")))?;

    let metadata_json = row.try_get::<String, _>("metadata_json")?;
    let metadata: BTreeMap<String, String> = serde_json::from_str(&metadata_json)
        .map_err(|error| RepositoryError::Decode(format!("invalid metadata_json: {error}")))?;

    Ok(AuditEvent {
        event_id: row.try_get("event_id")?,
        boq_id: row.try_get::<Option<String>, _>("boq_id")?.map(BoqId),
        correlation_id: row.try_get("correlation_id")?,
        event_type: row.try_get("event_type")?,
        actor: row.try_get("actor")?,
        actor_role: row.try_get("actor_role")?,
        outcome,
        metadata,
        occurred_at: parse_timestamp("occurred_at", row.try_get("occurred_at")?)?,
    })
}
