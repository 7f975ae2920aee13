use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "securebank.toml";
pub const NESTED_CONFIG_FILE: &str = "config/securebank.toml";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Settings for the simulated banking backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    pub loan_latency_ms: u64,
    pub card_latency_ms: u64,
    pub balance_latency_ms: u64,
    pub statement_latency_ms: u64,
    pub loan_status_latency_ms: u64,
    /// Loans strictly above this amount need manual verification.
    pub manual_review_threshold: u64,
    pub rng_seed: Option<u64>,
}

impl BackendConfig {
    pub fn without_latency(mut self) -> Self {
        self.loan_latency_ms = 0;
        self.card_latency_ms = 0;
        self.balance_latency_ms = 0;
        self.statement_latency_ms = 0;
        self.loan_status_latency_ms = 0;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub greeting: bool,
    pub max_sessions: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub disable_latency: Option<bool>,
    pub rng_seed: Option<u64>,
    pub greeting: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            loan_latency_ms: 1_500,
            card_latency_ms: 1_200,
            balance_latency_ms: 800,
            statement_latency_ms: 1_000,
            loan_status_latency_ms: 1_000,
            manual_review_threshold: 100_000,
            rng_seed: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { greeting: true, max_sessions: 1_024 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(backend) = patch.backend {
            if let Some(value) = backend.loan_latency_ms {
                self.backend.loan_latency_ms = value;
            }
            if let Some(value) = backend.card_latency_ms {
                self.backend.card_latency_ms = value;
            }
            if let Some(value) = backend.balance_latency_ms {
                self.backend.balance_latency_ms = value;
            }
            if let Some(value) = backend.statement_latency_ms {
                self.backend.statement_latency_ms = value;
            }
            if let Some(value) = backend.loan_status_latency_ms {
                self.backend.loan_status_latency_ms = value;
            }
            if let Some(value) = backend.manual_review_threshold {
                self.backend.manual_review_threshold = value;
            }
            if let Some(value) = backend.rng_seed {
                self.backend.rng_seed = Some(value);
            }
        }

        if let Some(session) = patch.session {
            if let Some(greeting) = session.greeting {
                self.session.greeting = greeting;
            }
            if let Some(max_sessions) = session.max_sessions {
                self.session.max_sessions = max_sessions;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let latency_vars: [(&str, &mut u64); 5] = [
            ("SECUREBANK_BACKEND_LOAN_LATENCY_MS", &mut self.backend.loan_latency_ms),
            ("SECUREBANK_BACKEND_CARD_LATENCY_MS", &mut self.backend.card_latency_ms),
            ("SECUREBANK_BACKEND_BALANCE_LATENCY_MS", &mut self.backend.balance_latency_ms),
            ("SECUREBANK_BACKEND_STATEMENT_LATENCY_MS", &mut self.backend.statement_latency_ms),
            ("SECUREBANK_BACKEND_LOAN_STATUS_LATENCY_MS", &mut self.backend.loan_status_latency_ms),
        ];
        for (key, target) in latency_vars {
            if let Some(value) = read_env(key) {
                *target = parse_u64(key, &value)?;
            }
        }

        if let Some(value) = read_env("SECUREBANK_BACKEND_MANUAL_REVIEW_THRESHOLD") {
            self.backend.manual_review_threshold =
                parse_u64("SECUREBANK_BACKEND_MANUAL_REVIEW_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("SECUREBANK_BACKEND_RNG_SEED") {
            self.backend.rng_seed = Some(parse_u64("SECUREBANK_BACKEND_RNG_SEED", &value)?);
        }

        if let Some(value) = read_env("SECUREBANK_SESSION_GREETING") {
            self.session.greeting = parse_bool("SECUREBANK_SESSION_GREETING", &value)?;
        }
        if let Some(value) = read_env("SECUREBANK_SESSION_MAX_SESSIONS") {
            self.session.max_sessions = parse_usize("SECUREBANK_SESSION_MAX_SESSIONS", &value)?;
        }

        let log_level =
            read_env("SECUREBANK_LOGGING_LEVEL").or_else(|| read_env("SECUREBANK_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SECUREBANK_LOGGING_FORMAT").or_else(|| read_env("SECUREBANK_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if overrides.disable_latency == Some(true) {
            self.backend = self.backend.clone().without_latency();
        }
        if let Some(rng_seed) = overrides.rng_seed {
            self.backend.rng_seed = Some(rng_seed);
        }
        if let Some(greeting) = overrides.greeting {
            self.session.greeting = greeting;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_backend(&self.backend)?;
        validate_session(&self.session)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(CONFIG_FILE_NAME), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

const MAX_LATENCY_MS: u64 = 60_000;

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    let latencies = [
        ("backend.loan_latency_ms", backend.loan_latency_ms),
        ("backend.card_latency_ms", backend.card_latency_ms),
        ("backend.balance_latency_ms", backend.balance_latency_ms),
        ("backend.statement_latency_ms", backend.statement_latency_ms),
        ("backend.loan_status_latency_ms", backend.loan_status_latency_ms),
    ];
    for (key, value) in latencies {
        if value > MAX_LATENCY_MS {
            return Err(ConfigError::Validation(format!(
                "{key} must be in range 0..={MAX_LATENCY_MS}"
            )));
        }
    }

    if backend.manual_review_threshold == 0 {
        return Err(ConfigError::Validation(
            "backend.manual_review_threshold must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.max_sessions == 0 {
        return Err(ConfigError::Validation(
            "session.max_sessions must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    backend: Option<BackendPatch>,
    session: Option<SessionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    loan_latency_ms: Option<u64>,
    card_latency_ms: Option<u64>,
    balance_latency_ms: Option<u64>,
    statement_latency_ms: Option<u64>,
    loan_status_latency_ms: Option<u64>,
    manual_review_threshold: Option<u64>,
    rng_seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    greeting: Option<bool>,
    max_sessions: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_simulated_backend_timings() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.backend.loan_latency_ms == 1_500, "loan latency default")?;
        ensure(config.backend.balance_latency_ms == 800, "balance latency default")?;
        ensure(config.backend.manual_review_threshold == 100_000, "review threshold default")?;
        ensure(config.session.greeting, "greeting should be on by default")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SECUREBANK_SEED", "42");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("securebank.toml");
            fs::write(
                &path,
                r#"
[backend]
rng_seed = ${TEST_SECUREBANK_SEED}
loan_latency_ms = 10
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.backend.rng_seed == Some(42), "seed should be interpolated from env")?;
            ensure(config.backend.loan_latency_ms == 10, "file latency should apply")
        })();

        clear_vars(&["TEST_SECUREBANK_SEED"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SECUREBANK_LOG_LEVEL", "warn");
        env::set_var("SECUREBANK_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["SECUREBANK_LOG_LEVEL", "SECUREBANK_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SECUREBANK_BACKEND_CARD_LATENCY_MS", "250");
        env::set_var("SECUREBANK_LOGGING_LEVEL", "error");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("securebank.toml");
            fs::write(
                &path,
                r#"
[backend]
card_latency_ms = 900
balance_latency_ms = 300

[session]
greeting = false

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    rng_seed: Some(7),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.backend.card_latency_ms == 250, "env latency should win over file")?;
            ensure(config.backend.balance_latency_ms == 300, "file latency should win over default")?;
            ensure(!config.session.greeting, "file greeting flag should apply")?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(config.backend.rng_seed == Some(7), "override seed should apply")
        })();

        clear_vars(&["SECUREBANK_BACKEND_CARD_LATENCY_MS", "SECUREBANK_LOGGING_LEVEL"]);
        result
    }

    #[test]
    fn disable_latency_override_zeroes_every_operation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides { disable_latency: Some(true), ..ConfigOverrides::default() },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.backend.loan_latency_ms == 0, "loan latency should be zero")?;
        ensure(config.backend.card_latency_ms == 0, "card latency should be zero")?;
        ensure(config.backend.balance_latency_ms == 0, "balance latency should be zero")?;
        ensure(config.backend.statement_latency_ms == 0, "statement latency should be zero")?;
        ensure(config.backend.loan_status_latency_ms == 0, "status latency should be zero")
    }

    #[test]
    fn invalid_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SECUREBANK_BACKEND_RNG_SEED", "not-a-number");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected env override failure".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "SECUREBANK_BACKEND_RNG_SEED", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["SECUREBANK_BACKEND_RNG_SEED"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SECUREBANK_SESSION_MAX_SESSIONS", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("session.max_sessions")
            );
            ensure(has_message, "validation failure should mention session.max_sessions")
        })();

        clear_vars(&["SECUREBANK_SESSION_MAX_SESSIONS"]);
        result
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;

        let result = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("missing.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "missing required file should fail",
        )
    }
}
