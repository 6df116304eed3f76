//! Global automation log.

use tokio::sync::RwLock;

use crate::crisis::taxonomy::CrisisType;
use crate::crisis::types::{AutomationLogEntry, AutomationRecord};
use crate::ledger::bounded::BoundedLog;

/// Default number of records kept.
pub const DEFAULT_AUTOMATION_LOG_CAP: usize = 500;

/// Capped log of every automation record across all runs.
pub struct AutomationLog {
    entries: RwLock<BoundedLog<AutomationLogEntry>>,
}

impl AutomationLog {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: RwLock::new(BoundedLog::new(cap)),
        }
    }

    /// Append one run's records in the given order. The whole run is written
    /// under a single lock so runs never interleave.
    pub async fn append_run(
        &self,
        crisis_type: CrisisType,
        message_id: &str,
        records: &[AutomationRecord],
    ) {
        let mut entries = self.entries.write().await;
        for record in records {
            entries.push(AutomationLogEntry {
                crisis_type,
                message_id: message_id.to_string(),
                record: record.clone(),
            });
        }
    }

    /// Entries, oldest first.
    pub async fn snapshot(&self) -> Vec<AutomationLogEntry> {
        self.entries.read().await.snapshot()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for AutomationLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUTOMATION_LOG_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn run_is_appended_in_order() {
        let log = AutomationLog::default();
        let records = vec![
            AutomationRecord::success("staff_alert", json!({})),
            AutomationRecord::failed("vendor_contact", "down"),
        ];
        log.append_run(CrisisType::WaterDamage, "m-1", &records).await;

        let entries = log.snapshot().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].record.name, "staff_alert");
        assert_eq!(entries[1].record.name, "vendor_contact");
        assert_eq!(entries[1].message_id, "m-1");
    }

    #[tokio::test]
    async fn cap_evicts_oldest_records() {
        let log = AutomationLog::new(2);
        let records: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| AutomationRecord::success(*n, json!({})))
            .collect();
        log.append_run(CrisisType::FireEmergency, "m", &records).await;

        let names: Vec<_> = log.snapshot().await.into_iter().map(|e| e.record.name).collect();
        assert_eq!(names, vec!["b", "c"]);
    }
}
