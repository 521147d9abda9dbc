use std::path::PathBuf;

use coplan_core::config::{AppConfig, LoadOptions};
use coplan_core::messages;
use coplan_db::{connect, migrations, ProjectStore, SqlProjectStore};

use crate::commands::CommandResult;

pub fn run(project: &str, config_path: Option<PathBuf>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions { config_path, ..LoadOptions::default() }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "show",
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
                "show",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        let store = SqlProjectStore::new(pool.clone());
        let snapshot = store
            .load_project(project)
            .await
            .map_err(|error| ("load", error.to_string(), 6u8))?;
        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(snapshot)
    });

    match result {
        Ok(Some(snapshot)) => CommandResult {
            exit_code: 0,
            output: messages::progress_summary(&snapshot.captured),
        },
        Ok(None) => CommandResult::failure(
            "show",
            "not_found",
            format!("no stored project `{project}`"),
            7,
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("show", error_class, message, exit_code)
        }
    }
}
