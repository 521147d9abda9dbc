use std::env;
use std::sync::{Mutex, OnceLock};

use coplan_cli::commands::{doctor, migrate, show};
use serde_json::Value;

#[test]
fn migrate_succeeds_against_an_in_memory_database() {
    with_env(&[("COPLAN_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn doctor_reports_pass_for_the_default_local_setup() {
    with_env(&[("COPLAN_DATABASE_URL", "sqlite::memory:")], || {
        let output = doctor::run(true);
        let payload: Value =
            serde_json::from_str(&output).expect("doctor output should be valid JSON");

        assert_eq!(payload["overall_status"], "pass");
        let checks = payload["checks"].as_array().expect("checks array");
        assert!(checks.iter().any(|check| check["name"] == "database_connectivity"
            && check["status"] == "pass"));
    });
}

#[test]
fn doctor_reports_failure_for_a_malformed_endpoint() {
    with_env(
        &[
            ("COPLAN_DATABASE_URL", "sqlite::memory:"),
            ("COPLAN_LLM_BASE_URL", "not-a-url"),
        ],
        || {
            let output = doctor::run(true);
            let payload: Value =
                serde_json::from_str(&output).expect("doctor output should be valid JSON");
            assert_eq!(payload["overall_status"], "fail");
        },
    );
}

#[test]
fn show_reports_not_found_for_an_unknown_project() {
    // One connection so the in-memory database migrated here is the same
    // one the load query sees.
    with_env(
        &[
            ("COPLAN_DATABASE_URL", "sqlite::memory:"),
            ("COPLAN_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = show::run("no-such-project", None);
            assert_ne!(result.exit_code, 0, "expected not_found failure");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "show");
            assert_eq!(payload["error_class"], "not_found");
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
        "COPLAN_DATABASE_URL",
        "COPLAN_DATABASE_MAX_CONNECTIONS",
        "COPLAN_LLM_API_KEY",
        "COPLAN_LLM_BASE_URL",
        "COPLAN_LLM_MODEL",
        "COPLAN_SESSION_SAVE_DEBOUNCE_MS",
        "COPLAN_LOG_LEVEL",
        "COPLAN_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, previous) in previous_values {
        match previous {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
