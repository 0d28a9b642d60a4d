use sqlx::{sqlite::SqliteRow, Row};

use fuelbid_core::domain::bid::Bid;
use fuelbid_core::domain::boq::{Boq, BoqId, BoqStatus, FuelType};
use fuelbid_core::errors::{ConflictReason, DomainError, ResourceKind};

use super::{parse_date, parse_decimal, parse_timestamp, BoqRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBoqRepository {
    pool: DbPool,
}

impl SqlBoqRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BoqRepository for SqlBoqRepository {
    async fn create(&self, boq: Boq) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO boq (
                id,
                fuel_type,
                description,
                quantity,
                unit,
                estimated_price_per_unit,
                deadline,
                branch_id,
                status,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&boq.id.0)
        .bind(boq.fuel_type.as_str())
        .bind(&boq.description)
        .bind(boq.quantity.to_string())
        .bind(&boq.unit)
        .bind(boq.estimated_price_per_unit.to_string())
        .bind(boq.deadline.format("%Y-%m-%d").to_string())
        .bind(boq.branch_id.as_deref())
        .bind(boq.status.as_str())
        .bind(boq.created_at.to_rfc3339())
        .bind(boq.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &BoqId) -> Result<Option<Boq>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                fuel_type,
                description,
                quantity,
                unit,
                estimated_price_per_unit,
                deadline,
                branch_id,
                status,
                created_at,
                updated_at
             FROM boq
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| boq_from_row(&row)).transpose()
    }

    async fn list(
        &self,
        fuel_type: Option<FuelType>,
        status: Option<BoqStatus>,
    ) -> Result<Vec<Boq>, RepositoryError> {
        let mut sql = String::from(
            "SELECT
                id,
                fuel_type,
                description,
                quantity,
                unit,
                estimated_price_per_unit,
                deadline,
                branch_id,
                status,
                created_at,
                updated_at
             FROM boq",
        );
        let mut clauses = Vec::new();
        if fuel_type.is_some() {
            clauses.push("fuel_type = ?");
        }
        if status.is_some() {
            clauses.push("status = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut query = sqlx::query(&sql);
        if let Some(fuel_type) = fuel_type {
            query = query.bind(fuel_type.as_str());
        }
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(boq_from_row).collect()
    }

    async fn update(&self, boq: &Boq, economic_change: bool) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if economic_change {
            let selected: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM selection WHERE boq_id = ?1)")
                    .bind(&boq.id.0)
                    .fetch_one(&mut *tx)
                    .await?;
            if selected == 1 {
                return Err(RepositoryError::Domain(
                    ConflictReason::EconomicFieldsLocked.into(),
                ));
            }
        }

        let result = sqlx::query(
            "UPDATE boq SET
                fuel_type = ?,
                description = ?,
                quantity = ?,
                unit = ?,
                estimated_price_per_unit = ?,
                deadline = ?,
                updated_at = ?
             WHERE id = ?",
        )
        .bind(boq.fuel_type.as_str())
        .bind(&boq.description)
        .bind(boq.quantity.to_string())
        .bind(&boq.unit)
        .bind(boq.estimated_price_per_unit.to_string())
        .bind(boq.deadline.format("%Y-%m-%d").to_string())
        .bind(boq.updated_at.to_rfc3339())
        .bind(&boq.id.0)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Domain(DomainError::not_found(
                ResourceKind::Boq,
                boq.id.0.clone(),
            )));
        }

        // Stored totals are derived from the quantity; recompute them here
        // so the total_price = price x quantity law holds at read time.
        let bids = sqlx::query("SELECT id, price_per_unit FROM bid WHERE boq_id = ?")
            .bind(&boq.id.0)
            .fetch_all(&mut *tx)
            .await?;
        for row in bids {
            let bid_id: String = row.try_get("id")?;
            let price = parse_decimal("price_per_unit", row.try_get("price_per_unit")?)?;
            sqlx::query("UPDATE bid SET total_price = ? WHERE id = ?")
                .bind(Bid::total_for(price, boq.quantity).to_string())
                .bind(&bid_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, id: &BoqId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let bid_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM bid WHERE boq_id = ?1")
            .bind(&id.0)
            .fetch_one(&mut *tx)
            .await?;
        if bid_count > 0 {
            return Err(RepositoryError::Domain(ConflictReason::BidsExist.into()));
        }

        let result =
            sqlx::query("DELETE FROM boq WHERE id = ?").bind(&id.0).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::Domain(DomainError::not_found(
                ResourceKind::Boq,
                id.0.clone(),
            )));
        }

        tx.commit().await?;
        Ok(())
    }
}

fn boq_from_row(row: &SqliteRow) -> Result<Boq, RepositoryError> {
    let fuel_raw = row.try_get::<String, _>("fuel_type")?;
    let fuel_type = FuelType::parse(&fuel_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown fuel type `{fuel_raw}`")))?;

    let status_raw = row.try_get::<String, _>("status")?;
    let status = BoqStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown BOQ status `{status_raw}`")))?;

    Ok(Boq {
        id: BoqId(row.try_get("id")?),
        fuel_type,
        description: row.try_get("description")?,
        quantity: parse_decimal("quantity", row.try_get("quantity")?)?,
        unit: row.try_get("unit")?,
        estimated_price_per_unit: parse_decimal(
            "estimated_price_per_unit",
            row.try_get("estimated_price_per_unit")?,
        )?,
        deadline: parse_date("deadline", row.try_get("deadline")?)?,
        branch_id: row.try_get("branch_id")?,
        status,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}
