use crate::commands::CommandResult;
use fuelbid_core::config::{AppConfig, LoadOptions};
use fuelbid_db::{connect_with_settings, migrations};

enum MigrateFailure {
    Connect(String),
    Apply(String),
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
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
                "migrate",
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
        .map_err(|error| MigrateFailure::Connect(error.to_string()))?;
        let applied = migrations::run_pending(&pool)
            .await
            .map_err(|error| MigrateFailure::Apply(error.to_string()));
        pool.close().await;
        applied
    });

    match outcome {
        Ok(()) => CommandResult::success("migrate", "applied pending schema migrations"),
        Err(MigrateFailure::Connect(error)) => CommandResult::failure(
            "migrate",
            "db_connectivity",
            format!("failed to open {}: {error}", config.database.url),
            4,
        ),
        Err(MigrateFailure::Apply(error)) => {
            CommandResult::failure("migrate", "migration", error, 5)
        }
    }
}
