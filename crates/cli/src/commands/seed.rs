use crate::commands::CommandResult;
use fuelbid_core::config::{AppConfig, LoadOptions};
use fuelbid_db::{
    connect_with_settings, migrations, E2ESeedDataset, SeedResult, VerificationResult,
};

enum SeedFailure {
    Connect(String),
    Migrate(String),
    Load(String),
    Verify(String),
}

impl SeedFailure {
    fn into_result(self) -> CommandResult {
        let (error_class, message, exit_code) = match self {
            SeedFailure::Connect(message) => ("db_connectivity", message, 4),
            SeedFailure::Migrate(message) => ("migration", message, 5),
            SeedFailure::Load(message) => ("seed_execution", message, 5),
            SeedFailure::Verify(message) => ("seed_verification", message, 6),
        };
        CommandResult::failure("seed", error_class, message, exit_code)
    }
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let outcome = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| SeedFailure::Connect(error.to_string()))?;

        let seeded = async {
            migrations::run_pending(&pool)
                .await
                .map_err(|error| SeedFailure::Migrate(error.to_string()))?;
            let seeded = E2ESeedDataset::load(&pool)
                .await
                .map_err(|error| SeedFailure::Load(error.to_string()))?;
            let verification = E2ESeedDataset::verify(&pool)
                .await
                .map_err(|error| SeedFailure::Verify(error.to_string()))?;
            match verification_failure_message(&verification) {
                Some(message) => Err(SeedFailure::Verify(message)),
                None => Ok(seeded),
            }
        }
        .await;

        pool.close().await;
        seeded
    });

    match outcome {
        Ok(seeded) => CommandResult::success("seed", seed_summary(&seeded)),
        Err(failure) => failure.into_result(),
    }
}

fn seed_summary(seeded: &SeedResult) -> String {
    let scenario_lines: Vec<String> = seeded
        .scenarios_seeded
        .iter()
        .map(|info| format!("  - {}: {} ({})", info.scenario, info.boq_id, info.description))
        .collect();
    format!(
        "E2E seed dataset loaded successfully for {} procurement scenarios:\n{}",
        seeded.scenarios_seeded.len(),
        scenario_lines.join("\n")
    )
}

fn verification_failure_message(verification: &VerificationResult) -> Option<String> {
    if verification.all_present {
        return None;
    }
    let failed: Vec<&'static str> = verification
        .checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect();
    Some(if failed.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::{seed_summary, verification_failure_message};
    use fuelbid_db::{ScenarioSeedInfo, SeedResult, VerificationResult};

    #[test]
    fn summary_lists_every_scenario_with_its_boq() {
        let seeded = SeedResult {
            scenarios_seeded: vec![
                ScenarioSeedInfo {
                    scenario: "open_bidding",
                    boq_id: "BOQ-SEED-DIESEL",
                    description: "Diesel BOQ with two active bids awaiting evaluation",
                },
                ScenarioSeedInfo {
                    scenario: "no_bids",
                    boq_id: "BOQ-SEED-GASOLINE",
                    description: "Gasoline BOQ with an empty bid ledger",
                },
            ],
        };

        let message = seed_summary(&seeded);

        assert!(message.starts_with("E2E seed dataset loaded successfully for 2 procurement"));
        assert!(message.contains(
            "  - open_bidding: BOQ-SEED-DIESEL (Diesel BOQ with two active bids awaiting evaluation)"
        ));
        assert!(message
            .contains("  - no_bids: BOQ-SEED-GASOLINE (Gasoline BOQ with an empty bid ledger)"));
    }

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let verification = VerificationResult {
            all_present: false,
            checks: vec![
                ("audit-events", true),
                ("budget-diesel", false),
                ("boq-awarded", false),
            ],
        };

        assert_eq!(
            verification_failure_message(&verification).expect("verification failed"),
            "Seed verification failed for checks: budget-diesel, boq-awarded"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let verification =
            VerificationResult { all_present: false, checks: vec![("suppliers", true)] };

        assert_eq!(
            verification_failure_message(&verification).expect("verification failed"),
            "Some seed data failed to load"
        );
    }

    #[test]
    fn a_clean_verification_produces_no_message() {
        let verification =
            VerificationResult { all_present: true, checks: vec![("suppliers", true)] };

        assert!(verification_failure_message(&verification).is_none());
    }
}
