use serde::Serialize;
use sqlx::{sqlite::SqliteRow, Row};

use fuelbid_core::domain::bid::{Bid, BidId, BidStatus};
use fuelbid_core::domain::boq::{BoqId, FuelType};
use fuelbid_core::domain::supplier::SupplierId;
use fuelbid_core::errors::ConflictReason;

use super::{
    encode_string_list, parse_decimal, parse_string_list, parse_timestamp, unique_violation,
    BidRepository, RepositoryError,
};
use crate::DbPool;

/// Admin read model: one bid joined with its supplier contact and the
/// BOQ context it was submitted against.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BidOverview {
    pub bid: Bid,
    pub supplier_name: String,
    pub supplier_email: String,
    pub fuel_type: FuelType,
    pub branch_id: Option<String>,
}

pub struct SqlBidRepository {
    pool: DbPool,
}

impl SqlBidRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BidRepository for SqlBidRepository {
    async fn submit(&self, bid: Bid) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // The window closes at the selection commit point; re-check inside
        // the transaction so no bid lands after it.
        let selected: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM selection WHERE boq_id = ?1)")
                .bind(&bid.boq_id.0)
                .fetch_one(&mut *tx)
                .await?;
        if selected == 1 {
            return Err(RepositoryError::Domain(ConflictReason::BiddingClosed.into()));
        }

        let duplicate: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM bid WHERE boq_id = ?1 AND supplier_id = ?2)",
        )
        .bind(&bid.boq_id.0)
        .bind(&bid.supplier_id.0)
        .fetch_one(&mut *tx)
        .await?;
        if duplicate == 1 {
            return Err(RepositoryError::Domain(ConflictReason::DuplicateBid.into()));
        }

        let insert = sqlx::query(
            "INSERT INTO bid (
                id,
                boq_id,
                supplier_id,
                price_per_unit,
                total_price,
                qualifications_json,
                quality_certificates_json,
                status,
                submitted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&bid.id.0)
        .bind(&bid.boq_id.0)
        .bind(&bid.supplier_id.0)
        .bind(bid.price_per_unit.to_string())
        .bind(bid.total_price.to_string())
        .bind(encode_string_list(&bid.qualifications)?)
        .bind(encode_string_list(&bid.quality_certificates)?)
        .bind(bid.status.as_str())
        .bind(bid.submitted_at.to_rfc3339())
        .execute(&mut *tx)
        .await;

        match insert {
            Ok(_) => {}
            // Backstop for a race the pre-check cannot see.
            Err(error) if unique_violation(&error) => {
                return Err(RepositoryError::Domain(ConflictReason::DuplicateBid.into()));
            }
            Err(error) => return Err(error.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_active_for_supplier(
        &self,
        boq_id: &BoqId,
        supplier_id: &SupplierId,
    ) -> Result<Option<Bid>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                boq_id,
                supplier_id,
                price_per_unit,
                total_price,
                qualifications_json,
                quality_certificates_json,
                status,
                submitted_at
             FROM bid
             WHERE boq_id = ? AND supplier_id = ? AND status = 'active'",
        )
        .bind(&boq_id.0)
        .bind(&supplier_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| bid_from_row(&row)).transpose()
    }

    async fn list_for_boq(&self, boq_id: &BoqId) -> Result<Vec<Bid>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                boq_id,
                supplier_id,
                price_per_unit,
                total_price,
                qualifications_json,
                quality_certificates_json,
                status,
                submitted_at
             FROM bid
             WHERE boq_id = ?
             ORDER BY submitted_at ASC, id ASC",
        )
        .bind(&boq_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(bid_from_row).collect()
    }

    async fn list_all(&self) -> Result<Vec<BidOverview>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                b.id,
                b.boq_id,
                b.supplier_id,
                b.price_per_unit,
                b.total_price,
                b.qualifications_json,
                b.quality_certificates_json,
                b.status,
                b.submitted_at,
                s.name AS supplier_name,
                s.email AS supplier_email,
                q.fuel_type,
                q.branch_id
             FROM bid b
             JOIN supplier s ON s.id = b.supplier_id
             JOIN boq q ON q.id = b.boq_id
             ORDER BY b.submitted_at DESC, b.id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(overview_from_row).collect()
    }
}

fn bid_from_row(row: &SqliteRow) -> Result<Bid, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = BidStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown bid status `{status_raw}`")))?;

    Ok(Bid {
        id: BidId(row.try_get("id")?),
        boq_id: BoqId(row.try_get("boq_id")?),
        supplier_id: SupplierId(row.try_get("supplier_id")?),
        price_per_unit: parse_decimal("price_per_unit", row.try_get("price_per_unit")?)?,
        total_price: parse_decimal("total_price", row.try_get("total_price")?)?,
        qualifications: parse_string_list(
            "qualifications_json",
            row.try_get("qualifications_json")?,
        )?,
        quality_certificates: parse_string_list(
            "quality_certificates_json",
            row.try_get("quality_certificates_json")?,
        )?,
        status,
        submitted_at: parse_timestamp("submitted_at", row.try_get("submitted_at")?)?,
    })
}

fn overview_from_row(row: &SqliteRow) -> Result<BidOverview, RepositoryError> {
    let fuel_raw = row.try_get::<String, _>("fuel_type")?;
    let fuel_type = FuelType::parse(&fuel_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown fuel type `{fuel_raw}`")))?;

    Ok(BidOverview {
        bid: bid_from_row(row)?,
        supplier_name: row.try_get("supplier_name")?,
        supplier_email: row.try_get("supplier_email")?,
        fuel_type,
        branch_id: row.try_get("branch_id")?,
    })
}
