use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use fuelbid_core::domain::bid::BidId;
use fuelbid_core::domain::boq::BoqId;
use fuelbid_core::domain::selection::{
    AwardNotice, AwardNoticeId, AwardNoticeState, Selection, SelectionId,
};
use fuelbid_core::domain::supplier::SupplierId;
use fuelbid_core::errors::{ConflictReason, DomainError, ResourceKind};

use super::{
    parse_timestamp, parse_u32, unique_violation, AwardNoticeRepository, RepositoryError,
    SelectionRepository,
};
use crate::DbPool;

pub struct SqlSelectionRepository {
    pool: DbPool,
}

impl SqlSelectionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SelectionRepository for SqlSelectionRepository {
    async fn create(
        &self,
        selection: Selection,
        notice: AwardNotice,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM selection WHERE boq_id = ?1)")
                .bind(&selection.boq_id.0)
                .fetch_one(&mut *tx)
                .await?;
        if existing == 1 {
            return Err(RepositoryError::Domain(ConflictReason::AlreadySelected.into()));
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bid WHERE id = ?1 AND boq_id = ?2 AND status = 'active')",
        )
        .bind(&selection.bid_id.0)
        .bind(&selection.boq_id.0)
        .fetch_one(&mut *tx)
        .await?;
        if active != 1 {
            return Err(RepositoryError::Domain(DomainError::not_found(
                ResourceKind::Bid,
                selection.bid_id.0.clone(),
            )));
        }

        let insert = sqlx::query(
            "INSERT INTO selection (
                id,
                boq_id,
                bid_id,
                supplier_id,
                decided_by,
                decided_at
             ) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&selection.id.0)
        .bind(&selection.boq_id.0)
        .bind(&selection.bid_id.0)
        .bind(&selection.supplier_id.0)
        .bind(&selection.decided_by)
        .bind(selection.decided_at.to_rfc3339())
        .execute(&mut *tx)
        .await;

        match insert {
            Ok(_) => {}
            // Two racing selects both pass the pre-check; UNIQUE(boq_id)
            // admits exactly one of them.
            Err(error) if unique_violation(&error) => {
                return Err(RepositoryError::Domain(ConflictReason::AlreadySelected.into()));
            }
            Err(error) => return Err(error.into()),
        }

        sqlx::query("UPDATE bid SET status = 'won' WHERE id = ?")
            .bind(&selection.bid_id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE bid SET status = 'lost' WHERE boq_id = ? AND id <> ?")
            .bind(&selection.boq_id.0)
            .bind(&selection.bid_id.0)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE boq SET status = 'selected', updated_at = ? WHERE id = ?")
            .bind(selection.decided_at.to_rfc3339())
            .bind(&selection.boq_id.0)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO award_notice (
                id,
                selection_id,
                boq_id,
                supplier_id,
                payload_hash,
                state,
                attempts,
                last_error,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&notice.id.0)
        .bind(&notice.selection_id.0)
        .bind(&notice.boq_id.0)
        .bind(&notice.supplier_id.0)
        .bind(&notice.payload_hash)
        .bind(notice.state.as_str())
        .bind(i64::from(notice.attempts))
        .bind(notice.last_error.as_deref())
        .bind(notice.created_at.to_rfc3339())
        .bind(notice.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_boq(&self, boq_id: &BoqId) -> Result<Option<Selection>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                boq_id,
                bid_id,
                supplier_id,
                decided_by,
                decided_at
             FROM selection
             WHERE boq_id = ?",
        )
        .bind(&boq_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| selection_from_row(&row)).transpose()
    }
}

#[async_trait::async_trait]
impl AwardNoticeRepository for SqlSelectionRepository {
    async fn find_notice_for_selection(
        &self,
        selection_id: &SelectionId,
    ) -> Result<Option<AwardNotice>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                selection_id,
                boq_id,
                supplier_id,
                payload_hash,
                state,
                attempts,
                last_error,
                created_at,
                updated_at
             FROM award_notice
             WHERE selection_id = ?",
        )
        .bind(&selection_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| notice_from_row(&row)).transpose()
    }

    async fn mark_notice_sent(
        &self,
        id: &AwardNoticeId,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE award_notice
             SET state = 'sent', attempts = attempts + 1, last_error = NULL, updated_at = ?
             WHERE id = ? AND state = 'pending'",
        )
        .bind(now.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_notice_failed(
        &self,
        id: &AwardNoticeId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE award_notice
             SET state = 'failed', attempts = attempts + 1, last_error = ?, updated_at = ?
             WHERE id = ? AND state = 'pending'",
        )
        .bind(error)
        .bind(now.to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn selection_from_row(row: &SqliteRow) -> Result<Selection, RepositoryError> {
    Ok(Selection {
        id: SelectionId(row.try_get("id")?),
        boq_id: BoqId(row.try_get("boq_id")?),
        bid_id: BidId(row.try_get("bid_id")?),
        supplier_id: SupplierId(row.try_get("supplier_id")?),
        decided_by: row.try_get("decided_by")?,
        decided_at: parse_timestamp("decided_at", row.try_get("decided_at")?)?,
    })
}

fn notice_from_row(row: &SqliteRow) -> Result<AwardNotice, RepositoryError> {
    let state_raw = row.try_get::<String, _>("state")?;
    let state = AwardNoticeState::parse(&state_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown award notice state `{state_raw}`"))
    })?;

    Ok(AwardNotice {
        id: AwardNoticeId(row.try_get("id")?),
        selection_id: SelectionId(row.try_get("selection_id")?),
        boq_id: BoqId(row.try_get("boq_id")?),
        supplier_id: SupplierId(row.try_get("supplier_id")?),
        payload_hash: row.try_get("payload_hash")?,
        state,
        attempts: parse_u32("attempts", row.try_get("attempts")?)?,
        last_error: row.try_get("last_error")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
