use rust_decimal::Decimal;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::{parse_decimal, RepositoryError};

/// Canonical E2E seeds and verification contract for the three core
/// procurement scenarios.
const SEED_SCENARIOS: &[SeedScenarioContract] = &[
    SeedScenarioContract {
        scenario: "open_bidding",
        boq_id: "BOQ-SEED-DIESEL",
        fuel_type: "diesel",
        status: "open",
        quantity: "1000",
        expected_bid_count: 2,
        lowest_price_per_unit: Some("1150"),
        winning_bid_id: None,
        selection_id: None,
        notice_id: None,
        notice_state: None,
        description: "Diesel BOQ with two active bids awaiting evaluation",
    },
    SeedScenarioContract {
        scenario: "awarded",
        boq_id: "BOQ-SEED-PETROL",
        fuel_type: "petrol",
        status: "selected",
        quantity: "500",
        expected_bid_count: 2,
        lowest_price_per_unit: Some("1420"),
        winning_bid_id: Some("BID-SEED-0003"),
        selection_id: Some("SEL-SEED-0001"),
        notice_id: Some("AN-SEED-0001"),
        notice_state: Some("sent"),
        description: "Petrol BOQ already awarded with a sent award notice",
    },
    SeedScenarioContract {
        scenario: "no_bids",
        boq_id: "BOQ-SEED-GASOLINE",
        fuel_type: "gasoline",
        status: "open",
        quantity: "200",
        expected_bid_count: 0,
        lowest_price_per_unit: None,
        winning_bid_id: None,
        selection_id: None,
        notice_id: None,
        notice_state: None,
        description: "Gasoline BOQ with an empty bid ledger",
    },
];

const SEED_SUPPLIER_IDS: &[&str] = &["SUP-SEED-KIGALI", "SUP-SEED-GASABO", "SUP-SEED-REMERA"];

const SEED_BOQ_IDS: &[&str] = &["BOQ-SEED-DIESEL", "BOQ-SEED-PETROL", "BOQ-SEED-GASOLINE"];

const SEED_BID_IDS: &[&str] =
    &["BID-SEED-0001", "BID-SEED-0002", "BID-SEED-0003", "BID-SEED-0004"];

const SEED_SELECTION_IDS: &[&str] = &["SEL-SEED-0001"];

const SEED_NOTICE_IDS: &[&str] = &["AN-SEED-0001"];

const SEED_BUDGET_FUEL_TYPES: &[&str] = &["diesel", "petrol"];

const SEED_AUDIT_EVENT_IDS: &[&str] = &[
    "ae-seed-0001",
    "ae-seed-0002",
    "ae-seed-0003",
    "ae-seed-0004",
    "ae-seed-0005",
    "ae-seed-0006",
    "ae-seed-0007",
];

/// E2E seed dataset for the procurement lifecycle.
///
/// Provides deterministic fixtures for:
/// 1. A BOQ in open bidding with competing bids
/// 2. A BOQ with a committed selection and a sent award notice
/// 3. A BOQ nobody has bid on
pub struct E2ESeedDataset;

impl E2ESeedDataset {
    /// SQL fixture content for E2E seed data.
    pub const SQL: &str = include_str!("../../../config/fixtures/e2e_seed_data.sql");

    /// Load the E2E seed dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let scenarios_seeded = SEED_SCENARIOS
            .iter()
            .map(|scenario| ScenarioSeedInfo {
                scenario: scenario.scenario,
                boq_id: scenario.boq_id,
                description: scenario.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { scenarios_seeded })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_audits = sql_array_from_ids(SEED_AUDIT_EVENT_IDS);
        let expected_audit_total = SEED_AUDIT_EVENT_IDS.len() as i64;
        let existing_audit_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM audit_event WHERE event_id IN {quoted_audits}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("audit-events", existing_audit_count == expected_audit_total));

        let quoted_suppliers = sql_array_from_ids(SEED_SUPPLIER_IDS);
        let supplier_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM supplier WHERE id IN {quoted_suppliers}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("suppliers", supplier_count == SEED_SUPPLIER_IDS.len() as i64));

        let diesel_budget: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM procurement_budget
                           WHERE fuel_type = 'diesel' AND max_price_per_unit = '1300')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("budget-diesel", diesel_budget == 1));

        let petrol_budget: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM procurement_budget
                           WHERE fuel_type = 'petrol' AND max_price_per_unit = '1600')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("budget-petrol", petrol_budget == 1));

        for scenario in SEED_SCENARIOS {
            let boq_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM boq
                               WHERE id = ?1 AND fuel_type = ?2 AND status = ?3
                                 AND quantity = ?4)",
            )
            .bind(scenario.boq_id)
            .bind(scenario.fuel_type)
            .bind(scenario.status)
            .bind(scenario.quantity)
            .fetch_one(pool)
            .await?;
            checks.push((scenario.boq_label(), boq_ok == 1));

            let bid_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM bid WHERE boq_id = ?1")
                .bind(scenario.boq_id)
                .fetch_one(pool)
                .await?;
            checks.push((scenario.bid_count_label(), bid_count == scenario.expected_bid_count));

            checks.push((scenario.totals_label(), Self::verify_bid_totals(pool, scenario).await?));
            checks.push((scenario.award_label(), Self::verify_award_chain(pool, scenario).await?));

            let boq_created: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM audit_event
                               WHERE boq_id = ?1 AND event_type = 'boq.created')",
            )
            .bind(scenario.boq_id)
            .fetch_one(pool)
            .await?;
            checks.push((scenario.audit_created_label(), boq_created == 1));

            if scenario.winning_bid_id.is_some() {
                let selected_event: i64 = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM audit_event
                                   WHERE boq_id = ?1 AND event_type = 'supplier.selected')",
                )
                .bind(scenario.boq_id)
                .fetch_one(pool)
                .await?;
                checks.push(("supplier.selected event", selected_event == 1));

                let notice_event: i64 = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM audit_event
                                   WHERE boq_id = ?1 AND event_type = 'award_notice.sent')",
                )
                .bind(scenario.boq_id)
                .fetch_one(pool)
                .await?;
                checks.push(("award_notice.sent event", notice_event == 1));
            }
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Every stored total must equal price x quantity, and the contract's
    /// lowest price must actually be the cheapest bid on the ledger.
    async fn verify_bid_totals(
        pool: &DbPool,
        scenario: &SeedScenarioContract,
    ) -> Result<bool, RepositoryError> {
        let quantity_raw: String = sqlx::query_scalar("SELECT quantity FROM boq WHERE id = ?1")
            .bind(scenario.boq_id)
            .fetch_one(pool)
            .await?;
        let quantity = parse_decimal("quantity", quantity_raw)?;

        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT price_per_unit, total_price FROM bid WHERE boq_id = ?1",
        )
        .bind(scenario.boq_id)
        .fetch_all(pool)
        .await?;

        let mut lowest: Option<Decimal> = None;
        for (price_raw, total_raw) in rows {
            let price = parse_decimal("price_per_unit", price_raw)?;
            let total = parse_decimal("total_price", total_raw)?;
            if price * quantity != total {
                return Ok(false);
            }
            if lowest.map_or(true, |current| price < current) {
                lowest = Some(price);
            }
        }

        match scenario.lowest_price_per_unit {
            Some(expected) => {
                let expected = parse_decimal("lowest_price_per_unit", expected.to_string())?;
                Ok(lowest == Some(expected))
            }
            None => Ok(lowest.is_none()),
        }
    }

    async fn verify_award_chain(
        pool: &DbPool,
        scenario: &SeedScenarioContract,
    ) -> Result<bool, RepositoryError> {
        let Some(winning_bid_id) = scenario.winning_bid_id else {
            let selection_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM selection WHERE boq_id = ?1")
                    .bind(scenario.boq_id)
                    .fetch_one(pool)
                    .await?;
            let settled_bids: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM bid WHERE boq_id = ?1 AND status <> 'active'",
            )
            .bind(scenario.boq_id)
            .fetch_one(pool)
            .await?;
            return Ok(selection_count == 0 && settled_bids == 0);
        };

        let selection_ok: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM selection
                           WHERE id = ?1 AND boq_id = ?2 AND bid_id = ?3)",
        )
        .bind(scenario.selection_id)
        .bind(scenario.boq_id)
        .bind(winning_bid_id)
        .fetch_one(pool)
        .await?;
        if selection_ok != 1 {
            return Ok(false);
        }

        let winner_won: i64 =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bid WHERE id = ?1 AND status = 'won')")
                .bind(winning_bid_id)
                .fetch_one(pool)
                .await?;
        if winner_won != 1 {
            return Ok(false);
        }

        let unsettled: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM bid WHERE boq_id = ?1 AND id <> ?2 AND status <> 'lost'",
        )
        .bind(scenario.boq_id)
        .bind(winning_bid_id)
        .fetch_one(pool)
        .await?;
        if unsettled != 0 {
            return Ok(false);
        }

        let notice_ok: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM award_notice
                           WHERE id = ?1 AND selection_id = ?2 AND state = ?3 AND attempts = 1)",
        )
        .bind(scenario.notice_id)
        .bind(scenario.selection_id)
        .bind(scenario.notice_state)
        .fetch_one(pool)
        .await?;
        Ok(notice_ok == 1)
    }

    /// Clean up seeded fixtures from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_audits = sql_array_from_ids(SEED_AUDIT_EVENT_IDS);
        let quoted_notices = sql_array_from_ids(SEED_NOTICE_IDS);
        let quoted_selections = sql_array_from_ids(SEED_SELECTION_IDS);
        let quoted_bids = sql_array_from_ids(SEED_BID_IDS);
        let quoted_boqs = sql_array_from_ids(SEED_BOQ_IDS);
        let quoted_budgets = sql_array_from_ids(SEED_BUDGET_FUEL_TYPES);
        let quoted_suppliers = sql_array_from_ids(SEED_SUPPLIER_IDS);

        sqlx::query(&format!("DELETE FROM audit_event WHERE event_id IN {quoted_audits}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM award_notice WHERE id IN {quoted_notices}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM selection WHERE id IN {quoted_selections}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM bid WHERE id IN {quoted_bids}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM boq WHERE id IN {quoted_boqs}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM procurement_budget WHERE fuel_type IN {quoted_budgets}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM supplier WHERE id IN {quoted_suppliers}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedScenarioContract {
    scenario: &'static str,
    boq_id: &'static str,
    fuel_type: &'static str,
    status: &'static str,
    quantity: &'static str,
    expected_bid_count: i64,
    lowest_price_per_unit: Option<&'static str>,
    winning_bid_id: Option<&'static str>,
    selection_id: Option<&'static str>,
    notice_id: Option<&'static str>,
    notice_state: Option<&'static str>,
    description: &'static str,
}

impl SeedScenarioContract {
    fn boq_label(&self) -> &'static str {
        match self.scenario {
            "open_bidding" => "boq-open-bidding",
            "awarded" => "boq-awarded",
            _ => "boq-no-bids",
        }
    }

    fn bid_count_label(&self) -> &'static str {
        match self.scenario {
            "open_bidding" => "bids-open-bidding",
            "awarded" => "bids-awarded",
            _ => "bids-no-bids",
        }
    }

    fn totals_label(&self) -> &'static str {
        match self.scenario {
            "open_bidding" => "totals-open-bidding",
            "awarded" => "totals-awarded",
            _ => "totals-no-bids",
        }
    }

    fn award_label(&self) -> &'static str {
        match self.scenario {
            "open_bidding" => "award-open-bidding",
            "awarded" => "award-awarded",
            _ => "award-no-bids",
        }
    }

    fn audit_created_label(&self) -> &'static str {
        match self.scenario {
            "open_bidding" => "audit-open-bidding-created",
            "awarded" => "audit-awarded-created",
            _ => "audit-no-bids-created",
        }
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

#[derive(Debug)]
pub struct SeedResult {
    pub scenarios_seeded: Vec<ScenarioSeedInfo>,
}

#[derive(Debug)]
pub struct ScenarioSeedInfo {
    pub scenario: &'static str,
    pub boq_id: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::{connect_with_settings, migrations};

    #[test]
    fn sql_fixture_is_valid() {
        assert!(!E2ESeedDataset::SQL.is_empty());
    }

    #[tokio::test]
    async fn verify_seed_contract_and_idempotency() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");

        let first = E2ESeedDataset::load(&pool).await.expect("load seed fixtures");
        let first_verification = E2ESeedDataset::verify(&pool).await.expect("verify seed fixtures");
        assert!(first_verification.all_present);
        assert_eq!(first.scenarios_seeded.len(), 3);

        let second = E2ESeedDataset::load(&pool).await.expect("reload seed fixtures");
        let second_verification =
            E2ESeedDataset::verify(&pool).await.expect("re-verify seed fixtures");
        assert!(second_verification.all_present);
        assert_eq!(second.scenarios_seeded.len(), 3);
        assert_eq!(first_verification.checks, second_verification.checks);
    }

    #[tokio::test]
    async fn verify_seed_scenario_specific_properties() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");

        E2ESeedDataset::load(&pool).await.expect("load seed fixtures");

        let diesel_status: String = sqlx::query_scalar("SELECT status FROM boq WHERE id = ?1")
            .bind("BOQ-SEED-DIESEL")
            .fetch_one(&pool)
            .await
            .expect("query diesel boq status");
        assert_eq!(diesel_status, "open");

        let winner: (String, String) =
            sqlx::query_as("SELECT status, total_price FROM bid WHERE id = ?1")
                .bind("BID-SEED-0003")
                .fetch_one(&pool)
                .await
                .expect("query winning bid");
        assert_eq!(winner, ("won".to_string(), "710000".to_string()));

        let decided_by: String =
            sqlx::query_scalar("SELECT decided_by FROM selection WHERE id = ?1")
                .bind("SEL-SEED-0001")
                .fetch_one(&pool)
                .await
                .expect("query selection decider");
        assert_eq!(decided_by, "U-SEED-MANAGER");

        let gasoline_bids: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM bid WHERE boq_id = ?1")
            .bind("BOQ-SEED-GASOLINE")
            .fetch_one(&pool)
            .await
            .expect("count gasoline bids");
        assert_eq!(gasoline_bids, 0);

        let notice: (String, i64) =
            sqlx::query_as("SELECT state, attempts FROM award_notice WHERE id = ?1")
                .bind("AN-SEED-0001")
                .fetch_one(&pool)
                .await
                .expect("query award notice");
        assert_eq!(notice, ("sent".to_string(), 1));

        let diesel_ceiling: String = sqlx::query_scalar(
            "SELECT max_price_per_unit FROM procurement_budget WHERE fuel_type = ?1",
        )
        .bind("diesel")
        .fetch_one(&pool)
        .await
        .expect("query diesel budget");
        assert_eq!(diesel_ceiling, "1300");
    }

    #[tokio::test]
    async fn clean_removes_every_seeded_row() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect to test database");

        migrations::run_pending(&pool).await.expect("run migrations");

        E2ESeedDataset::load(&pool).await.expect("load seed fixtures");
        E2ESeedDataset::clean(&pool).await.expect("clean seed fixtures");

        for table in ["supplier", "boq", "bid", "selection", "award_notice", "audit_event"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(1) FROM {table}"))
                .fetch_one(&pool)
                .await
                .expect("count rows");
            assert_eq!(count, 0, "table {table} should be empty after clean");
        }

        let budgets: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM procurement_budget")
            .fetch_one(&pool)
            .await
            .expect("count budgets");
        assert_eq!(budgets, 0);
    }

    #[test]
    fn seed_contract_json_matches_rust_seed_constants() {
        let contract: serde_json::Value =
            serde_json::from_str(include_str!("../../../config/fixtures/e2e_seed_contract.json"))
                .expect("e2e seed contract JSON must parse");

        assert_eq!(contract["dataset_version"].as_str(), Some("fb-1.3.0"));
        assert_eq!(
            contract["seed_dataset"].as_str(),
            Some("deterministic_procurement_lifecycle")
        );
        assert_eq!(contract["currency"].as_str(), Some("RWF"));

        let contract_scenarios =
            contract["scenarios"].as_array().expect("scenarios should be an array");
        assert_eq!(contract_scenarios.len(), SEED_SCENARIOS.len());

        for scenario in SEED_SCENARIOS {
            let contract_scenario = contract_scenarios
                .iter()
                .find(|candidate| candidate["scenario"].as_str() == Some(scenario.scenario))
                .expect("contract should include all canonical scenarios");

            assert_eq!(contract_scenario["boq_id"].as_str(), Some(scenario.boq_id));
            assert_eq!(contract_scenario["fuel_type"].as_str(), Some(scenario.fuel_type));
            assert_eq!(contract_scenario["status"].as_str(), Some(scenario.status));
            assert_eq!(contract_scenario["quantity"].as_str(), Some(scenario.quantity));
            assert_eq!(
                contract_scenario["expected_bid_count"].as_i64(),
                Some(scenario.expected_bid_count)
            );
            assert_eq!(contract_scenario["description"].as_str(), Some(scenario.description));

            for (key, expected) in [
                ("lowest_price_per_unit", scenario.lowest_price_per_unit),
                ("winning_bid_id", scenario.winning_bid_id),
                ("selection_id", scenario.selection_id),
                ("notice_id", scenario.notice_id),
                ("notice_state", scenario.notice_state),
            ] {
                match expected {
                    Some(value) => assert_eq!(contract_scenario[key].as_str(), Some(value)),
                    None => assert!(contract_scenario.get(key).map_or(true, Value::is_null)),
                }
            }
        }

        let contract_suppliers = contract["suppliers"]
            .as_array()
            .expect("suppliers should be an array")
            .iter()
            .map(|value| value.as_str().unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(contract_suppliers, SEED_SUPPLIER_IDS);

        let contract_budgets = contract["budgets"].as_array().expect("budgets is an array");
        assert_eq!(contract_budgets.len(), SEED_BUDGET_FUEL_TYPES.len());
        for budget in contract_budgets {
            let fuel_type = budget["fuel_type"].as_str().expect("budget fuel type");
            assert!(SEED_BUDGET_FUEL_TYPES.contains(&fuel_type));
        }
    }
}
