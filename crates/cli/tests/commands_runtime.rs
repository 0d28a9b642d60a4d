use std::env;
use std::sync::{Mutex, OnceLock};

use fuelbid_cli::commands::{config, doctor, migrate, seed};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("FUELBID_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_reports_invalid_configuration() {
    // Webhook mode without an endpoint fails config validation.
    with_env(&[("FUELBID_NOTIFIER_MODE", "webhook")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_returns_deterministic_scenario_summary() {
    with_env(&[("FUELBID_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected successful seed run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.starts_with("E2E seed dataset loaded successfully for 3 procurement"));
        let open_line =
            "  - open_bidding: BOQ-SEED-DIESEL (Diesel BOQ with two active bids awaiting evaluation)";
        let awarded_line =
            "  - awarded: BOQ-SEED-PETROL (Petrol BOQ already awarded with a sent award notice)";
        let empty_line = "  - no_bids: BOQ-SEED-GASOLINE (Gasoline BOQ with an empty bid ledger)";
        assert!(message.contains(open_line));
        assert!(message.contains(awarded_line));
        assert!(message.contains(empty_line));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(&[("FUELBID_DATABASE_URL", "sqlite::memory:")], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        assert_eq!(first_payload["status"], "ok");

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        assert_eq!(second_payload["status"], "ok");

        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn doctor_passes_with_a_reachable_database() {
    with_env(&[("FUELBID_DATABASE_URL", "sqlite::memory:")], || {
        let report = parse_payload(&doctor::run(true));

        assert_eq!(report["overall_status"], "pass");
        let checks = report["checks"].as_array().expect("checks array");
        assert_eq!(checks.len(), 3);
        for check in checks {
            assert_eq!(check["status"], "pass", "check {} should pass", check["name"]);
        }
        let names: Vec<&str> =
            checks.iter().filter_map(|check| check["name"].as_str()).collect();
        assert_eq!(names, ["config_validation", "database_connectivity", "notifier_readiness"]);
    });
}

#[test]
fn doctor_skips_downstream_checks_when_config_fails() {
    with_env(&[("FUELBID_NOTIFIER_MODE", "webhook")], || {
        let report = parse_payload(&doctor::run(true));

        assert_eq!(report["overall_status"], "fail");
        let checks = report["checks"].as_array().expect("checks array");
        assert_eq!(checks[0]["name"], "config_validation");
        assert_eq!(checks[0]["status"], "fail");
        assert_eq!(checks[1]["status"], "skipped");
        assert_eq!(checks[2]["status"], "skipped");
    });
}

#[test]
fn doctor_renders_human_output_without_json_flag() {
    with_env(&[("FUELBID_DATABASE_URL", "sqlite::memory:")], || {
        let output = doctor::run(false);

        assert!(output.starts_with("doctor: all readiness checks passed"));
        assert!(output.contains("- [ok] database_connectivity: connected using `sqlite::memory:`"));
        assert!(output.contains("- [ok] notifier_readiness:"));
    });
}

#[test]
fn config_redacts_the_notifier_token() {
    with_env(
        &[
            ("FUELBID_DATABASE_URL", "sqlite::memory:"),
            ("FUELBID_NOTIFIER_AUTH_TOKEN", "hook-secret-value"),
        ],
        || {
            let output = config::run();

            assert!(output
                .contains("- database.url = sqlite::memory: (source: env (FUELBID_DATABASE_URL))"));
            assert!(output.contains(
                "- notifier.auth_token = <redacted> (source: env (FUELBID_NOTIFIER_AUTH_TOKEN))"
            ));
            assert!(!output.contains("hook-secret-value"));
            assert!(output.contains("- procurement.currency = RWF (source: default)"));
        },
    );
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "FUELBID_CONFIG",
        "FUELBID_DATABASE_URL",
        "FUELBID_DATABASE_MAX_CONNECTIONS",
        "FUELBID_DATABASE_TIMEOUT_SECS",
        "FUELBID_SERVER_BIND_ADDRESS",
        "FUELBID_SERVER_PORT",
        "FUELBID_SERVER_HEALTH_CHECK_PORT",
        "FUELBID_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "FUELBID_NOTIFIER_MODE",
        "FUELBID_NOTIFIER_ENDPOINT",
        "FUELBID_NOTIFIER_AUTH_TOKEN",
        "FUELBID_NOTIFIER_TIMEOUT_SECS",
        "FUELBID_LOGGING_LEVEL",
        "FUELBID_LOGGING_FORMAT",
        "FUELBID_LOG_LEVEL",
        "FUELBID_LOG_FORMAT",
        "FUELBID_PROCUREMENT_CURRENCY",
        "FUELBID_PROCUREMENT_DEFAULT_UNIT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
