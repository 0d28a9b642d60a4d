use sqlx::{sqlite::SqliteRow, Row};

use fuelbid_core::domain::supplier::{Supplier, SupplierId};

use super::{parse_timestamp, RepositoryError, SupplierRepository};
use crate::DbPool;

pub struct SqlSupplierRepository {
    pool: DbPool,
}

impl SqlSupplierRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SupplierRepository for SqlSupplierRepository {
    async fn upsert(&self, supplier: Supplier) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO supplier (
                id,
                name,
                email,
                contact_details,
                certification,
                performance_history,
                created_at,
                updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                contact_details = excluded.contact_details,
                certification = excluded.certification,
                performance_history = excluded.performance_history,
                updated_at = excluded.updated_at",
        )
        .bind(&supplier.id.0)
        .bind(&supplier.name)
        .bind(&supplier.email)
        .bind(supplier.contact_details.as_deref())
        .bind(supplier.certification.as_deref())
        .bind(supplier.performance_history.as_deref())
        .bind(supplier.created_at.to_rfc3339())
        .bind(supplier.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let row = sqlx::query(
            "SELECT
                id,
                name,
                email,
                contact_details,
                certification,
                performance_history,
                created_at,
                updated_at
             FROM supplier
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| supplier_from_row(&row)).transpose()
    }

    async fn list(&self) -> Result<Vec<Supplier>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                name,
                email,
                contact_details,
                certification,
                performance_history,
                created_at,
                updated_at
             FROM supplier
             ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(supplier_from_row).collect()
    }
}

fn supplier_from_row(row: &SqliteRow) -> Result<Supplier, RepositoryError> {
    Ok(Supplier {
        id: SupplierId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        contact_details: row.try_get("contact_details")?,
        certification: row.try_get("certification")?,
        performance_history: row.try_get("performance_history")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use fuelbid_core::domain::supplier::{Supplier, SupplierId, SupplierProfile};

    use super::SqlSupplierRepository;
    use crate::migrations;
    use crate::repositories::SupplierRepository;
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn sample_supplier(id: &str, name: &str, registered_at: DateTime<Utc>) -> Supplier {
        Supplier::register(
            SupplierId(id.to_string()),
            SupplierProfile {
                name: name.to_string(),
                email: format!("bids@{}.example", id.to_ascii_lowercase()),
                contact_details: Some("+250 788 000 111".to_string()),
                certification: Some("ISO 9001".to_string()),
                performance_history: None,
            },
            registered_at,
        )
        .expect("valid profile")
    }

    fn parse_ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    #[tokio::test]
    async fn sql_supplier_repo_round_trips_a_profile() {
        let pool = setup_pool().await;
        let repo = SqlSupplierRepository::new(pool.clone());
        let supplier =
            sample_supplier("SUP-RT-001", "Kigali Fuels Ltd", parse_ts("2026-08-01T09:00:00Z"));

        repo.upsert(supplier.clone()).await.expect("upsert supplier");

        let found = repo.find_by_id(&supplier.id).await.expect("find supplier");
        assert_eq!(found, Some(supplier));

        let missing =
            repo.find_by_id(&SupplierId("SUP-MISSING".to_string())).await.expect("find missing");
        assert_eq!(missing, None);

        pool.close().await;
    }

    #[tokio::test]
    async fn upsert_replaces_profile_fields_and_keeps_created_at() {
        let pool = setup_pool().await;
        let repo = SqlSupplierRepository::new(pool.clone());
        let mut supplier =
            sample_supplier("SUP-UP-001", "Kigali Fuels Ltd", parse_ts("2026-08-01T09:00:00Z"));
        repo.upsert(supplier.clone()).await.expect("first upsert");

        supplier
            .apply_profile(
                SupplierProfile {
                    name: "Kigali Fuels Ltd".to_string(),
                    email: "tenders@kigalifuels.example".to_string(),
                    contact_details: None,
                    certification: Some("ISO 9001".to_string()),
                    performance_history: Some("4 awards in 2025".to_string()),
                },
                parse_ts("2026-08-05T12:00:00Z"),
            )
            .expect("valid profile");
        repo.upsert(supplier.clone()).await.expect("second upsert");

        let found = repo.find_by_id(&supplier.id).await.expect("find supplier").expect("exists");
        assert_eq!(found.email, "tenders@kigalifuels.example");
        assert_eq!(found.contact_details, None);
        assert_eq!(found.created_at, parse_ts("2026-08-01T09:00:00Z"));
        assert_eq!(found.updated_at, parse_ts("2026-08-05T12:00:00Z"));

        pool.close().await;
    }

    #[tokio::test]
    async fn list_orders_suppliers_by_name() {
        let pool = setup_pool().await;
        let repo = SqlSupplierRepository::new(pool.clone());
        repo.upsert(sample_supplier("SUP-B", "Remera Energy Co", parse_ts("2026-08-01T09:00:00Z")))
            .await
            .expect("upsert");
        repo.upsert(sample_supplier("SUP-A", "Gasabo Petroleum", parse_ts("2026-08-01T09:05:00Z")))
            .await
            .expect("upsert");

        let suppliers = repo.list().await.expect("list suppliers");
        assert_eq!(
            suppliers.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["Gasabo Petroleum", "Remera Energy Co"],
        );

        pool.close().await;
    }
}
