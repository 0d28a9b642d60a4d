use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::{connect_with_settings, migrations::MIGRATOR};

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "supplier",
        "boq",
        "bid",
        "selection",
        "award_notice",
        "audit_event",
        "procurement_budget",
        "idx_boq_status",
        "idx_boq_fuel_type",
        "idx_boq_created_at",
        "idx_bid_boq_id",
        "idx_bid_supplier_id",
        "idx_selection_supplier_id",
        "idx_award_notice_state",
        "idx_audit_event_boq_id",
        "idx_audit_event_event_type",
        "idx_audit_event_occurred_at",
    ];

    #[tokio::test]
    async fn migrations_create_baseline_tables() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let supplier_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'supplier'",
        )
        .fetch_one(&pool)
        .await
        .expect("check supplier table")
        .get::<i64, _>("count");

        let boq_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'boq'",
        )
        .fetch_one(&pool)
        .await
        .expect("check boq table")
        .get::<i64, _>("count");

        let bid_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'bid'",
        )
        .fetch_one(&pool)
        .await
        .expect("check bid table")
        .get::<i64, _>("count");

        let selection_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'selection'",
        )
        .fetch_one(&pool)
        .await
        .expect("check selection table")
        .get::<i64, _>("count");

        let award_notice_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'award_notice'",
        )
        .fetch_one(&pool)
        .await
        .expect("check award_notice table")
        .get::<i64, _>("count");

        let audit_event_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'audit_event'",
        )
        .fetch_one(&pool)
        .await
        .expect("check audit_event table")
        .get::<i64, _>("count");

        let budget_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'procurement_budget'",
        )
        .fetch_one(&pool)
        .await
        .expect("check procurement_budget table")
        .get::<i64, _>("count");

        assert_eq!(supplier_count, 1);
        assert_eq!(boq_count, 1);
        assert_eq!(bid_count, 1);
        assert_eq!(selection_count, 1);
        assert_eq!(award_notice_count, 1);
        assert_eq!(audit_event_count, 1);
        assert_eq!(budget_count, 1);
    }

    #[tokio::test]
    async fn migrations_are_reversible() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        let boq_count = sqlx::query(
            "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = 'table' AND name = 'boq'",
        )
        .fetch_one(&pool)
        .await
        .expect("check boq table removed")
        .get::<i64, _>("count");

        assert_eq!(boq_count, 0);
    }

    #[tokio::test]
    async fn migrations_up_down_up_preserves_schema_signature() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let initial_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            initial_signature.len(),
            MANAGED_SCHEMA_OBJECTS.len(),
            "initial migration pass should create all managed schema objects",
        );

        MIGRATOR.undo(&pool, 0).await.expect("undo migrations");

        let after_down_signature = managed_schema_signature(&pool).await;
        assert!(
            after_down_signature.is_empty(),
            "managed schema objects should be removed after full undo",
        );

        run_pending(&pool).await.expect("re-run migrations");

        let after_second_up_signature = managed_schema_signature(&pool).await;
        assert_eq!(
            after_second_up_signature, initial_signature,
            "up/down/up should preserve migration-managed schema signature",
        );
    }

    async fn managed_schema_signature(pool: &sqlx::SqlitePool) -> Vec<(String, String, String)> {
        let mut signature: Vec<(String, String, String)> = sqlx::query(
            "SELECT type, name, IFNULL(sql, '') AS sql
             FROM sqlite_master
             WHERE type IN ('table', 'index')",
        )
        .fetch_all(pool)
        .await
        .expect("load schema objects")
        .into_iter()
        .filter_map(|row| {
            let name = row.get::<String, _>("name");
            if MANAGED_SCHEMA_OBJECTS.contains(&name.as_str()) {
                Some((row.get::<String, _>("type"), name, row.get::<String, _>("sql")))
            } else {
                None
            }
        })
        .collect();
        signature.sort();
        signature
    }
}
