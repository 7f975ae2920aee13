use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use securebank_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let backend = &config.backend;
    let rng_seed = backend.rng_seed.map(|seed| seed.to_string());
    let entries: [(&str, String, &[&str]); 11] = [
        (
            "backend.loan_latency_ms",
            backend.loan_latency_ms.to_string(),
            &["SECUREBANK_BACKEND_LOAN_LATENCY_MS"],
        ),
        (
            "backend.card_latency_ms",
            backend.card_latency_ms.to_string(),
            &["SECUREBANK_BACKEND_CARD_LATENCY_MS"],
        ),
        (
            "backend.balance_latency_ms",
            backend.balance_latency_ms.to_string(),
            &["SECUREBANK_BACKEND_BALANCE_LATENCY_MS"],
        ),
        (
            "backend.statement_latency_ms",
            backend.statement_latency_ms.to_string(),
            &["SECUREBANK_BACKEND_STATEMENT_LATENCY_MS"],
        ),
        (
            "backend.loan_status_latency_ms",
            backend.loan_status_latency_ms.to_string(),
            &["SECUREBANK_BACKEND_LOAN_STATUS_LATENCY_MS"],
        ),
        (
            "backend.manual_review_threshold",
            backend.manual_review_threshold.to_string(),
            &["SECUREBANK_BACKEND_MANUAL_REVIEW_THRESHOLD"],
        ),
        (
            "backend.rng_seed",
            rng_seed.unwrap_or_else(|| "<unset>".to_string()),
            &["SECUREBANK_BACKEND_RNG_SEED"],
        ),
        ("session.greeting", config.session.greeting.to_string(), &["SECUREBANK_SESSION_GREETING"]),
        (
            "session.max_sessions",
            config.session.max_sessions.to_string(),
            &["SECUREBANK_SESSION_MAX_SESSIONS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["SECUREBANK_LOGGING_LEVEL", "SECUREBANK_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["SECUREBANK_LOGGING_FORMAT", "SECUREBANK_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        entries
            .iter()
            .map(|(key, value, env_keys)| render_line(key, value, source(*key, *env_keys))),
    );
    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn file_source_requires_the_full_key_path() {
        let doc = "[backend]\nloan_latency_ms = 0\n".parse::<Value>().expect("toml");

        assert!(contains_path(&doc, "backend.loan_latency_ms"));
        assert!(!contains_path(&doc, "backend.card_latency_ms"));
        assert!(!contains_path(&doc, "session.greeting"));
    }

    #[test]
    fn missing_keys_fall_back_to_default_source() {
        let doc = "[session]\ngreeting = false\n".parse::<Value>().expect("toml");
        let path = std::path::PathBuf::from("securebank.toml");

        assert_eq!(
            field_source("session.greeting", &["SECUREBANK_TEST_UNSET_KEY"], Some(&doc), Some(&path)),
            "file (securebank.toml)"
        );
        assert_eq!(
            field_source("logging.level", &["SECUREBANK_TEST_UNSET_KEY"], Some(&doc), Some(&path)),
            "default"
        );
    }
}
