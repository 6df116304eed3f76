//! Process-lifetime crisis state, injected into every component that
//! reads or writes it.

use std::sync::Arc;

use serde::Serialize;

use crate::config::CrisisConfig;
use crate::crisis::types::{ActivityEvent, AutomationLogEntry, ComplianceEntry, Incident};
use crate::ledger::{ActivityFeed, AutomationLog, ComplianceLedger, DedupLedger};
use crate::storefront::{StoreManager, StoreState};

/// All mutable state of one crisis desk. Build one per process (or per test).
pub struct CrisisState {
    pub dedup: DedupLedger,
    pub compliance: ComplianceLedger,
    pub activity: Arc<ActivityFeed>,
    pub automation_log: AutomationLog,
    pub store: StoreManager,
}

/// Read-only copy of everything observable.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub compliance_score: i32,
    pub compliance_history: Vec<ComplianceEntry>,
    pub incidents: Vec<Incident>,
    pub activity: Vec<ActivityEvent>,
    pub automation_log: Vec<AutomationLogEntry>,
    pub store: StoreState,
}

impl CrisisState {
    pub fn new(config: &CrisisConfig) -> Self {
        let activity = Arc::new(ActivityFeed::new(config.activity_cap));
        Self {
            dedup: DedupLedger::new(),
            compliance: ComplianceLedger::new(
                config.initial_compliance_score,
                config.compliance_history_cap,
                config.incident_cap,
            ),
            store: StoreManager::new(Arc::clone(&activity)),
            automation_log: AutomationLog::new(config.automation_log_cap),
            activity,
        }
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        let compliance = self.compliance.snapshot().await;
        StateSnapshot {
            compliance_score: compliance.score,
            compliance_history: compliance.history,
            incidents: compliance.incidents,
            activity: self.activity.recent().await,
            automation_log: self.automation_log.snapshot().await,
            store: self.store.snapshot().await,
        }
    }
}

impl Default for CrisisState {
    fn default() -> Self {
        Self::new(&CrisisConfig::default())
    }
}
