use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level config (taskwheel.toml + TASKWHEEL_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskwheelConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Location of the persisted schedule sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_schedules_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_schedules_path(),
        }
    }
}

/// Location of the append-only audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_path")]
    pub path: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: default_audit_path(),
        }
    }
}

/// Timing-loop tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound (seconds) on how long the timing loop sleeps between due
    /// checks. Minute-level fire granularity keeps this invisible to users.
    #[serde(default = "default_idle_poll_secs")]
    pub idle_poll_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_poll_secs: default_idle_poll_secs(),
        }
    }
}

impl TaskwheelConfig {
    /// Load config from a TOML file with TASKWHEEL_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.taskwheel/taskwheel.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: TaskwheelConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("TASKWHEEL_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_schedules_path() -> String {
    format!("{}/.taskwheel/schedules.json", home_dir())
}

fn default_audit_path() -> String {
    format!("{}/.taskwheel/audit.log", home_dir())
}

fn default_idle_poll_secs() -> u64 {
    30
}

fn default_config_path() -> String {
    format!("{}/.taskwheel/taskwheel.toml", home_dir())
}

fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
}
