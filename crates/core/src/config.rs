use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.as_str(), "true" | "1"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub aws: AwsConfig,
    pub scheduler: SchedulerConfig,
    pub store: StoreConfig,
    pub notify: NotifyConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `REMINDER_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("REMINDER_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            aws: AwsConfig::from_env_profiled(p),
            scheduler: SchedulerConfig::from_env_profiled(p),
            store: StoreConfig::from_env_profiled(p),
            notify: NotifyConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}, request_timeout={}s", self.server.host, self.server.port, self.server.request_timeout_secs);
        tracing::info!("  aws:         region={}, static_credentials={}", self.aws.region, self.aws.has_static_credentials());
        tracing::info!("  scheduler:   target={}, group={}, compensate={}",
            self.scheduler.target_arn.as_deref().unwrap_or("(none)"),
            self.scheduler.group_name.as_deref().unwrap_or("default"),
            self.scheduler.compensate_on_failure);
        tracing::info!("  store:       backend={}, table={}", self.store.backend, self.store.table_name);
        tracing::info!("  notify:      topic={}", self.notify.topic_arn.as_deref().unwrap_or("(none)"));
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "aws": { "region": self.aws.region },
            "scheduler": {
                "configured": self.scheduler.is_configured(),
                "group": self.scheduler.group_name,
                "compensate_on_failure": self.scheduler.compensate_on_failure,
            },
            "store": { "backend": self.store.backend, "table": self.store.table_name },
            "notify": { "configured": self.notify.is_configured() },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// Deadline applied to every request's provisioning scope.
    pub request_timeout_secs: u64,
    /// Header carrying the authenticated subject claim from the gateway.
    pub auth_subject_header: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3001),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
            request_timeout_secs: profiled_env_u64(p, "SERVER_REQUEST_TIMEOUT_SECS", 30),
            auth_subject_header: profiled_env_or(p, "AUTH_SUBJECT_HEADER", "x-user-sub")
                .to_lowercase(),
        }
    }
}

// ── AWS ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            region: profiled_env_or(p, "AWS_REGION", "eu-central-1"),
            access_key_id: profiled_env_opt(p, "AWS_ACCESS_KEY_ID"),
            secret_access_key: profiled_env_opt(p, "AWS_SECRET_ACCESS_KEY"),
            session_token: profiled_env_opt(p, "AWS_SESSION_TOKEN"),
            endpoint_url: profiled_env_opt(p, "AWS_ENDPOINT_URL"),
        }
    }

    pub fn has_static_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    /// Endpoint override with a scheme, if one is configured.
    pub fn endpoint(&self) -> Option<String> {
        let endpoint = self.endpoint_url.as_deref()?;
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            Some(endpoint.to_string())
        } else {
            Some(format!("https://{endpoint}"))
        }
    }
}

// ── EventBridge Scheduler ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// ARN invoked when a schedule fires (the alarm executor).
    pub target_arn: Option<String>,
    /// Role the scheduler assumes to invoke the target.
    pub role_arn: Option<String>,
    pub group_name: Option<String>,
    /// Delete already-created schedules when a creation batch fails.
    pub compensate_on_failure: bool,
}

impl SchedulerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            target_arn: profiled_env_opt(p, "SCHEDULER_TARGET_ARN")
                .or_else(|| profiled_env_opt(p, "LAMBDA_FUNCTION_ARN")),
            role_arn: profiled_env_opt(p, "SCHEDULER_ROLE_ARN")
                .or_else(|| profiled_env_opt(p, "ROLE_ARN")),
            group_name: profiled_env_opt(p, "SCHEDULER_GROUP_NAME"),
            compensate_on_failure: profiled_env_bool(p, "SCHEDULER_COMPENSATE_ON_FAILURE", false),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.target_arn.is_some() && self.role_arn.is_some()
    }

    /// Fail unless both the target and the role are set.
    pub fn require(&self) -> Result<(), ConfigError> {
        if self.target_arn.is_none() {
            return Err(ConfigError::Missing("SCHEDULER_TARGET_ARN"));
        }
        if self.role_arn.is_none() {
            return Err(ConfigError::Missing("SCHEDULER_ROLE_ARN"));
        }
        Ok(())
    }
}

// ── Durable store ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "dynamodb" or "memory"
    pub backend: String,
    pub table_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    DynamoDb,
    Memory,
}

impl StoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            backend: profiled_env_or(p, "STORE_BACKEND", "dynamodb").to_lowercase(),
            table_name: profiled_env_or(p, "DYNAMO_TABLE_NAME", "reminder-alarms"),
        }
    }

    pub fn backend_kind(&self) -> Result<StoreBackend, ConfigError> {
        match self.backend.as_str() {
            "dynamodb" | "dynamo" => Ok(StoreBackend::DynamoDb),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid {
                key: "STORE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

// ── Notifications ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub topic_arn: Option<String>,
}

impl NotifyConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            topic_arn: profiled_env_opt(p, "SNS_TOPIC_ARN"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.topic_arn.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env-based tests must run serially to avoid interfering with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        let keys = [
            "REMINDER_PROFILE",
            "PORT",
            "AWS_REGION",
            "SCHEDULER_TARGET_ARN",
            "LAMBDA_FUNCTION_ARN",
            "SCHEDULER_ROLE_ARN",
            "ROLE_ARN",
            "SCHEDULER_COMPENSATE_ON_FAILURE",
            "STORE_BACKEND",
            "DYNAMO_TABLE_NAME",
            "AWS_ENDPOINT_URL",
            "PROD_PORT",
            "PROD_DYNAMO_TABLE_NAME",
        ];
        for k in keys {
            env::remove_var(k);
        }
    }

    #[test]
    fn defaults_without_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        let cfg = Config::for_profile("");
        assert_eq!(cfg.profile_label(), "default");
        assert_eq!(cfg.server.port, 3001);
        assert_eq!(cfg.server.request_timeout_secs, 30);
        assert_eq!(cfg.server.auth_subject_header, "x-user-sub");
        assert_eq!(cfg.store.backend, "dynamodb");
        assert_eq!(cfg.store.table_name, "reminder-alarms");
        assert!(!cfg.scheduler.compensate_on_failure);
        assert!(!cfg.scheduler.is_configured());
        assert!(!cfg.notify.is_configured());
    }

    #[test]
    fn profile_prefix_wins_over_plain_key() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("PORT", "4000");
        env::set_var("DYNAMO_TABLE_NAME", "alarms-dev");
        env::set_var("PROD_DYNAMO_TABLE_NAME", "alarms-prod");

        let cfg = Config::for_profile("prod");
        assert_eq!(cfg.profile, "PROD");
        assert_eq!(cfg.store.table_name, "alarms-prod");
        // No PROD_PORT, falls back to the unprefixed key.
        assert_eq!(cfg.server.port, 4000);

        clear_env();
    }

    #[test]
    fn scheduler_falls_back_to_lambda_keys() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("LAMBDA_FUNCTION_ARN", "arn:aws:lambda:eu-central-1:1:function:exec");
        env::set_var("ROLE_ARN", "arn:aws:iam::1:role/scheduler");
        env::set_var("SCHEDULER_COMPENSATE_ON_FAILURE", "1");

        let cfg = Config::for_profile("");
        assert!(cfg.scheduler.is_configured());
        assert_eq!(
            cfg.scheduler.target_arn.as_deref(),
            Some("arn:aws:lambda:eu-central-1:1:function:exec")
        );
        assert!(cfg.scheduler.compensate_on_failure);

        clear_env();
    }

    #[test]
    fn store_backend_is_parsed() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("STORE_BACKEND", "Memory");
        let cfg = Config::for_profile("");
        assert_eq!(cfg.store.backend_kind(), Ok(StoreBackend::Memory));

        env::set_var("STORE_BACKEND", "postgres");
        let cfg = Config::for_profile("");
        assert!(matches!(
            cfg.store.backend_kind(),
            Err(ConfigError::Invalid { key: "STORE_BACKEND", .. })
        ));
        assert_eq!(
            cfg.scheduler.require(),
            Err(ConfigError::Missing("SCHEDULER_TARGET_ARN"))
        );

        clear_env();
    }

    #[test]
    fn endpoint_gets_scheme() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("AWS_ENDPOINT_URL", "localhost:4566");
        let cfg = Config::for_profile("");
        assert_eq!(cfg.aws.endpoint().as_deref(), Some("https://localhost:4566"));

        env::set_var("AWS_ENDPOINT_URL", "http://localhost:4566");
        let cfg = Config::for_profile("");
        assert_eq!(cfg.aws.endpoint().as_deref(), Some("http://localhost:4566"));

        clear_env();
    }
}
