use std::sync::Arc;

use fuelbid_core::config::{AppConfig, ConfigError, LoadOptions, NotifierMode};
use fuelbid_db::{connect_with_settings, migrations, DbPool};
use fuelbid_notify::notifier::{build_notifier, Notifier, NotifyError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("notifier initialization failed: {0}")]
    Notifier(#[source] NotifyError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        boq_id = "unknown",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        boq_id = "unknown",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        boq_id = "unknown",
        "database migrations applied"
    );

    let notifier = build_notifier(&config.notifier).map_err(BootstrapError::Notifier)?;
    let mode = match config.notifier.mode {
        NotifierMode::Noop => "noop",
        NotifierMode::Webhook => "webhook",
    };
    info!(
        event_name = "system.bootstrap.notifier_ready",
        correlation_id = "bootstrap",
        boq_id = "unknown",
        notifier_mode = mode,
        "award notifier initialized"
    );

    Ok(Application { config, db_pool, notifier })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use fuelbid_core::config::{ConfigOverrides, LoadOptions, NotifierMode};
    use fuelbid_core::domain::bid::{Bid, BidId};
    use fuelbid_core::domain::boq::{Boq, BoqDraft, BoqId, FuelType};
    use fuelbid_core::domain::supplier::SupplierId;
    use fuelbid_core::evaluation::{evaluate, EvaluationCriteria};
    use fuelbid_notify::message::{render_award_message, AwardNoticeContext};
    use rust_decimal::Decimal;

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_when_webhook_mode_lacks_an_endpoint() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                notifier_mode: Some(NotifierMode::Webhook),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("notifier.endpoint"));
    }

    #[tokio::test]
    async fn integration_smoke_covers_startup_data_path_and_award_checkpoints() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('supplier', 'boq', 'bid', 'selection', \
             'award_notice', 'audit_event', 'procurement_budget')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected procurement tables to be available after bootstrap");
        assert_eq!(table_count, 7, "bootstrap should expose the full procurement schema");

        let boq = boq_fixture();
        let bids = vec![
            bid_fixture("BID-1", "SUP-ALPHA", &boq, Decimal::new(1150, 0)),
            bid_fixture("BID-2", "SUP-BETA", &boq, Decimal::new(1180, 0)),
        ];

        let report = evaluate(&boq.id, &bids, &EvaluationCriteria::default())
            .expect("two active bids should produce a winner");
        assert_eq!(report.winner.supplier_id, SupplierId("SUP-ALPHA".to_string()));
        assert_eq!(
            report.winner.total_price,
            Decimal::new(1_150_000, 0),
            "winner total should be derived from unit price and quantity"
        );
        assert_eq!(report.qualifying_count, 2);

        let message = render_award_message(&AwardNoticeContext {
            notice_id: "AN-SMOKE".to_string(),
            boq_id: boq.id.0.clone(),
            supplier_id: report.winner.supplier_id.0.clone(),
            supplier_name: "Alpha Fuels Ltd".to_string(),
            supplier_email: "tenders@alphafuels.example".to_string(),
            fuel_type: boq.fuel_type.to_string(),
            description: boq.description.clone(),
            quantity: boq.quantity,
            unit: boq.unit.clone(),
            price_per_unit: report.winner.price_per_unit,
            total_price: report.winner.total_price,
            currency: app.config.procurement.currency.clone(),
            decided_at: Utc::now().to_rfc3339(),
        })
        .expect("award message should render");
        app.notifier
            .deliver(&message)
            .await
            .expect("noop notifier should acknowledge delivery");

        app.db_pool.close().await;
    }

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    fn boq_fixture() -> Boq {
        Boq::create(
            BoqId("BOQ-SMOKE".to_string()),
            BoqDraft {
                fuel_type: FuelType::Diesel,
                description: "diesel restock for the north depot".to_string(),
                quantity: Decimal::new(1000, 0),
                unit: "Liters".to_string(),
                estimated_price_per_unit: Decimal::new(1200, 0),
                deadline: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            },
            None,
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            Utc::now(),
        )
        .expect("valid boq fixture")
    }

    fn bid_fixture(id: &str, supplier: &str, boq: &Boq, price: Decimal) -> Bid {
        Bid::submit(
            BidId(id.to_string()),
            boq,
            SupplierId(supplier.to_string()),
            price,
            Vec::new(),
            Vec::new(),
            Utc::now(),
        )
        .expect("valid bid fixture")
    }
}
