mod awards;
mod bidding;
mod bootstrap;
mod context;
mod health;
mod procurement;

use anyhow::Result;
use axum::Router;
use fuelbid_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use fuelbid_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    let router = api_router(&app);
    let bind = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        boq_id = "unknown",
        bind_address = %bind,
        "fuelbid-server listening"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        boq_id = "unknown",
        "fuelbid-server stopping"
    );

    Ok(())
}

fn api_router(app: &bootstrap::Application) -> Router {
    Router::new()
        .merge(procurement::router(app.db_pool.clone(), app.config.procurement.clone()))
        .merge(bidding::router(app.db_pool.clone()))
        .merge(awards::router(
            app.db_pool.clone(),
            app.notifier.clone(),
            app.config.procurement.currency.clone(),
        ))
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to listen for the shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    use fuelbid_core::config::ProcurementConfig;
    use fuelbid_db::{connect_with_settings, migrations, DbPool};
    use fuelbid_notify::notifier::NoopNotifier;

    use crate::{awards, bidding, procurement};

    const MANAGER: (&str, &str) = ("U-MGR-1", "manager");

    async fn setup() -> DbPool {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    fn test_router(pool: DbPool) -> Router {
        let config = ProcurementConfig {
            currency: "RWF".to_string(),
            default_unit: "Liters".to_string(),
        };
        Router::new()
            .merge(procurement::router(pool.clone(), config.clone()))
            .merge(bidding::router(pool.clone()))
            .merge(awards::router(pool, Arc::new(NoopNotifier), config.currency))
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        actor: Option<(&str, &str)>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((id, role)) = actor {
            builder = builder.header("x-actor-id", id).header("x-actor-role", role);
        }
        let request = match body {
            Some(payload) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        let response = router.clone().oneshot(request).await.expect("route request");
        let status = response.status();
        let bytes =
            axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("read body");
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse body")
        };
        (status, body)
    }

    /// Creates an open diesel BOQ with two registered suppliers and their
    /// bids at 1150 and 1180 per liter. Returns the BOQ id.
    async fn seed_open_round(router: &Router) -> String {
        let (status, boq) = send(
            router,
            Method::POST,
            "/api/v1/boq",
            Some(MANAGER),
            Some(json!({
                "fuel_type": "diesel",
                "description": "Diesel restock for the northern branch depot",
                "quantity": "1000",
                "estimated_price_per_unit": "1200",
                "deadline": "2026-12-31"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let boq_id = boq["id"].as_str().expect("boq id").to_string();

        for (supplier, name, price) in [
            ("SUP-ALPHA", "Kigali Fuels Ltd", "1150"),
            ("SUP-BETA", "Gasabo Petroleum", "1180"),
        ] {
            let (status, _) = send(
                router,
                Method::PUT,
                "/api/v1/suppliers/me",
                Some((supplier, "supplier")),
                Some(json!({
                    "name": name,
                    "email": format!("bids@{}.example", supplier.to_ascii_lowercase()),
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);

            let (status, _) = send(
                router,
                Method::POST,
                "/api/v1/bids/submit",
                Some((supplier, "supplier")),
                Some(json!({
                    "boq_id": boq_id,
                    "bid_price_per_unit": price,
                    "qualifications": ["licensed importer"],
                })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        boq_id
    }

    #[tokio::test]
    async fn diesel_round_goes_from_boq_to_award_over_http() {
        let pool = setup().await;
        let router = test_router(pool.clone());
        let boq_id = seed_open_round(&router).await;

        let (status, report) = send(
            &router,
            Method::POST,
            "/api/v1/bids/evaluate",
            Some(MANAGER),
            Some(json!({ "boq_id": boq_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["winning_bid"]["total_price"], "1150000");
        assert_eq!(report["supplier"]["id"], "SUP-ALPHA");
        assert_eq!(report["qualifying_count"], 2);

        let (status, award) = send(
            &router,
            Method::POST,
            &format!("/api/v1/boq/{boq_id}/select"),
            Some(MANAGER),
            Some(json!({ "supplier_id": "SUP-ALPHA" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(award["notice_state"], "sent");
        assert!(award.get("warning").is_none());

        let (status, record) = send(
            &router,
            Method::GET,
            &format!("/api/v1/boq/{boq_id}/selection"),
            Some(MANAGER),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["supplier_id"], "SUP-ALPHA");
        assert_eq!(record["decided_by"], "U-MGR-1");
        assert_eq!(record["award_notice"]["state"], "sent");

        // The window is closed; a late bid bounces off the committed award.
        let (status, _) = send(
            &router,
            Method::PUT,
            "/api/v1/suppliers/me",
            Some(("SUP-GAMMA", "supplier")),
            Some(json!({
                "name": "Nyarugenge Energy",
                "email": "bids@nyarugenge.example",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, error) = send(
            &router,
            Method::POST,
            "/api/v1/bids/submit",
            Some(("SUP-GAMMA", "supplier")),
            Some(json!({
                "boq_id": boq_id,
                "bid_price_per_unit": "1100",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error["code"], "bidding_closed");

        pool.close().await;
    }

    #[tokio::test]
    async fn concurrent_selects_admit_exactly_one_winner_over_http() {
        let pool = setup().await;
        let router = test_router(pool.clone());
        let boq_id = seed_open_round(&router).await;

        let uri = format!("/api/v1/boq/{boq_id}/select");
        let first =
            send(&router, Method::POST, &uri, Some(MANAGER), Some(json!({"supplier_id": "SUP-ALPHA"})));
        let second =
            send(&router, Method::POST, &uri, Some(MANAGER), Some(json!({"supplier_id": "SUP-BETA"})));
        let (first, second) = tokio::join!(first, second);

        let winners =
            [first.0, second.0].iter().filter(|status| **status == StatusCode::CREATED).count();
        assert_eq!(winners, 1, "exactly one select may win");

        let loser_status = if first.0 == StatusCode::CREATED { second.0 } else { first.0 };
        assert!(loser_status.is_client_error(), "losing select must be refused");

        let selections: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM selection")
            .fetch_one(&pool)
            .await
            .expect("count selections");
        assert_eq!(selections, 1);

        let notices: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM award_notice")
            .fetch_one(&pool)
            .await
            .expect("count notices");
        assert_eq!(notices, 1);

        pool.close().await;
    }

    #[tokio::test]
    async fn requests_without_an_actor_are_unauthenticated() {
        let pool = setup().await;
        let router = test_router(pool.clone());

        let (status, body) = send(&router, Method::GET, "/api/v1/boq", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthenticated");

        pool.close().await;
    }
}
