//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Crisis pipeline configuration.
#[derive(Debug, Clone)]
pub struct CrisisConfig {
    /// Maximum compliance score changes kept in history.
    pub compliance_history_cap: usize,
    /// Maximum incidents kept.
    pub incident_cap: usize,
    /// Maximum activity feed events kept.
    pub activity_cap: usize,
    /// Maximum entries in the global automation log.
    pub automation_log_cap: usize,
    /// Score the compliance ledger starts at.
    pub initial_compliance_score: i32,
    /// Upper bound on a single AI classification call.
    pub classifier_timeout: Duration,
    /// Unread messages fetched per monitor poll; the rest wait for the next poll.
    pub max_batch_size: usize,
    /// Reply recipient used when the crisis sender is empty.
    pub notification_recipient: Option<String>,
    /// Staff headcount reported by roster-wide automations.
    pub staff_on_roster: usize,
    /// Run a crisis's automations concurrently (results are still committed in order).
    pub parallel_automations: bool,
    /// Polling interval for the background monitor.
    pub poll_interval: Duration,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            compliance_history_cap: 100,
            incident_cap: 50,
            activity_cap: 50,
            automation_log_cap: 500,
            initial_compliance_score: 100,
            classifier_timeout: Duration::from_secs(10),
            max_batch_size: 20,
            notification_recipient: None,
            staff_on_roster: 8,
            parallel_automations: true,
            poll_interval: Duration::from_secs(60),
        }
    }
}

impl CrisisConfig {
    /// Build config from `CRISIS_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            compliance_history_cap: env_parse(
                "CRISIS_COMPLIANCE_HISTORY_CAP",
                defaults.compliance_history_cap,
            ),
            incident_cap: env_parse("CRISIS_INCIDENT_CAP", defaults.incident_cap),
            activity_cap: env_parse("CRISIS_ACTIVITY_CAP", defaults.activity_cap),
            automation_log_cap: env_parse("CRISIS_AUTOMATION_LOG_CAP", defaults.automation_log_cap),
            initial_compliance_score: env_parse(
                "CRISIS_INITIAL_SCORE",
                defaults.initial_compliance_score,
            )
            .clamp(0, 100),
            classifier_timeout: Duration::from_secs(env_parse(
                "CRISIS_CLASSIFIER_TIMEOUT_SECS",
                defaults.classifier_timeout.as_secs(),
            )),
            max_batch_size: env_parse("CRISIS_MAX_BATCH", defaults.max_batch_size),
            notification_recipient: std::env::var("CRISIS_NOTIFY_FALLBACK_RECIPIENT")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            staff_on_roster: env_parse("CRISIS_STAFF_ON_ROSTER", defaults.staff_on_roster),
            parallel_automations: env_parse(
                "CRISIS_PARALLEL_AUTOMATIONS",
                defaults.parallel_automations,
            ),
            poll_interval: Duration::from_secs(env_parse(
                "CRISIS_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the ledgers cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let caps = [
            ("compliance_history_cap", self.compliance_history_cap),
            ("incident_cap", self.incident_cap),
            ("activity_cap", self.activity_cap),
            ("automation_log_cap", self.automation_log_cap),
            ("max_batch_size", self.max_batch_size),
        ];
        for (key, value) in caps {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        if self.classifier_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "classifier_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
