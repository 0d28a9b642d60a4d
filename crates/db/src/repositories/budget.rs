use sqlx::{sqlite::SqliteRow, Row};

use fuelbid_core::domain::boq::FuelType;
use fuelbid_core::ProcurementBudget;

use super::{parse_decimal, parse_timestamp, BudgetRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBudgetRepository {
    pool: DbPool,
}

impl SqlBudgetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BudgetRepository for SqlBudgetRepository {
    async fn set(&self, budget: ProcurementBudget) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO procurement_budget (
                fuel_type,
                max_price_per_unit,
                set_by,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(fuel_type) DO UPDATE SET
                max_price_per_unit = excluded.max_price_per_unit,
                set_by = excluded.set_by,
                updated_at = excluded.updated_at",
        )
        .bind(budget.fuel_type.as_str())
        .bind(budget.max_price_per_unit.to_string())
        .bind(&budget.set_by)
        .bind(budget.created_at.to_rfc3339())
        .bind(budget.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_for_fuel_type(
        &self,
        fuel_type: FuelType,
    ) -> Result<Option<ProcurementBudget>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                fuel_type,
                max_price_per_unit,
                set_by,
                created_at,
                updated_at
             FROM procurement_budget
             WHERE fuel_type = ?",
        )
        .bind(fuel_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| budget_from_row(&row)).transpose()
    }
}

fn budget_from_row(row: &SqliteRow) -> Result<ProcurementBudget, RepositoryError> {
    let fuel_raw = row.try_get::<String, _>("fuel_type")?;
    let fuel_type = FuelType::parse(&fuel_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown fuel type `{fuel_raw}`")))?;

    let max_price_per_unit =
        parse_decimal("max_price_per_unit", row.try_get("max_price_per_unit")?)?;

    Ok(ProcurementBudget {
        fuel_type,
        max_price_per_unit,
        set_by: row.try_get("set_by")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    use fuelbid_core::domain::boq::FuelType;
    use fuelbid_core::ProcurementBudget;

    use super::SqlBudgetRepository;
    use crate::migrations;
    use crate::repositories::BudgetRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    #[tokio::test]
    async fn budget_round_trips_per_fuel_type() {
        let pool = setup_pool().await;
        let repo = SqlBudgetRepository::new(pool.clone());

        let diesel = ProcurementBudget::set(
            FuelType::Diesel,
            Decimal::new(1300, 0),
            "U-ADMIN",
            parse_ts("2026-08-01T08:00:00Z"),
        )
        .expect("valid budget");
        repo.set(diesel.clone()).await.expect("set diesel budget");

        let found = repo
            .find_for_fuel_type(FuelType::Diesel)
            .await
            .expect("find diesel budget");
        assert_eq!(found, Some(diesel));

        let missing = repo
            .find_for_fuel_type(FuelType::Petrol)
            .await
            .expect("find petrol budget");
        assert_eq!(missing, None);

        pool.close().await;
    }

    #[tokio::test]
    async fn resetting_a_budget_replaces_the_ceiling_and_keeps_created_at() {
        let pool = setup_pool().await;
        let repo = SqlBudgetRepository::new(pool.clone());

        let initial = ProcurementBudget::set(
            FuelType::Petrol,
            Decimal::new(1600, 0),
            "U-ADMIN",
            parse_ts("2026-08-01T08:00:00Z"),
        )
        .expect("valid budget");
        repo.set(initial.clone()).await.expect("set initial budget");

        let revised = ProcurementBudget::set(
            FuelType::Petrol,
            Decimal::new(1550, 0),
            "U-ADMIN-2",
            parse_ts("2026-08-05T08:00:00Z"),
        )
        .expect("valid budget");
        repo.set(revised.clone()).await.expect("reset budget");

        let found = repo
            .find_for_fuel_type(FuelType::Petrol)
            .await
            .expect("find budget")
            .expect("budget exists");
        assert_eq!(found.max_price_per_unit, Decimal::new(1550, 0));
        assert_eq!(found.set_by, "U-ADMIN-2");
        assert_eq!(found.created_at, initial.created_at);
        assert_eq!(found.updated_at, revised.updated_at);

        pool.close().await;
    }
}
