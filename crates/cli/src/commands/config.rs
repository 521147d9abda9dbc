use coplan_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines =
        vec!["effective config (source precedence: cli > env > file > default):".to_string()];

    lines.push(format!("  database.url = {}", config.database.url));
    lines.push(format!("  database.max_connections = {}", config.database.max_connections));
    lines.push(format!("  database.timeout_secs = {}", config.database.timeout_secs));

    lines.push(format!("  llm.base_url = {}", config.llm.base_url));
    lines.push(format!("  llm.model = {}", config.llm.model));
    lines.push(format!("  llm.api_key = {}", redact_key(config.llm.api_key.as_ref())));
    lines.push(format!("  llm.temperature = {}", config.llm.temperature));
    lines.push(format!("  llm.max_tokens = {}", config.llm.max_tokens));
    lines.push(format!("  llm.timeout_secs = {}", config.llm.timeout_secs));

    lines.push(format!("  session.suggestion_window = {}", config.session.suggestion_window));
    lines.push(format!("  session.save_debounce_ms = {}", config.session.save_debounce_ms));

    lines.push(format!("  logging.level = {}", config.logging.level));
    lines.push(format!("  logging.format = {:?}", config.logging.format).to_lowercase());

    lines.join("\n")
}

/// Secrets never reach the terminal whole; the tail is enough to tell
/// keys apart.
fn redact_key(api_key: Option<&SecretString>) -> String {
    match api_key {
        None => "(not set)".to_string(),
        Some(secret) => {
            let exposed = secret.expose_secret();
            if exposed.len() <= 4 {
                "****".to_string()
            } else {
                format!("****{}", &exposed[exposed.len() - 4..])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_keys_are_fully_masked() {
        let secret = SecretString::from("abc".to_string());
        assert_eq!(redact_key(Some(&secret)), "****");
    }

    #[test]
    fn long_keys_keep_only_the_tail() {
        let secret = SecretString::from("sk-test-1234567890".to_string());
        assert_eq!(redact_key(Some(&secret)), "****7890");
    }

    #[test]
    fn missing_key_is_reported_not_masked() {
        assert_eq!(redact_key(None), "(not set)");
    }
}
