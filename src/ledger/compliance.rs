//! Compliance ledger: a [0, 100] health score, its change history, and the
//! incident list.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::crisis::types::{ComplianceEntry, CrisisCandidate, Incident, IncidentStatus};
use crate::ledger::bounded::BoundedLog;

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

/// Read-only copy of the ledger.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceSnapshot {
    pub score: i32,
    pub history: Vec<ComplianceEntry>,
    pub incidents: Vec<Incident>,
    pub last_updated: DateTime<Utc>,
}

struct ComplianceInner {
    score: i32,
    history: BoundedLog<ComplianceEntry>,
    incidents: BoundedLog<Incident>,
    next_incident_id: u64,
    last_updated: DateTime<Utc>,
}

/// Score plus capped history and incidents behind one lock, so every
/// read-modify-write is a single critical section.
pub struct ComplianceLedger {
    inner: RwLock<ComplianceInner>,
}

impl ComplianceLedger {
    pub fn new(initial_score: i32, history_cap: usize, incident_cap: usize) -> Self {
        Self {
            inner: RwLock::new(ComplianceInner {
                score: initial_score.clamp(MIN_SCORE, MAX_SCORE),
                history: BoundedLog::new(history_cap),
                incidents: BoundedLog::new(incident_cap),
                next_incident_id: 1,
                last_updated: Utc::now(),
            }),
        }
    }

    /// Apply `delta`, clamping into [0, 100]. A history entry is written only
    /// for non-zero deltas. Returns the new score.
    pub async fn update_score(&self, delta: i32, reason: &str) -> i32 {
        let mut inner = self.inner.write().await;
        let old_score = inner.score;
        let new_score = clamp_score(i64::from(old_score) + i64::from(delta));

        let now = Utc::now();
        inner.score = new_score;
        inner.last_updated = now;

        if delta != 0 {
            inner.history.push(ComplianceEntry {
                old_score,
                new_score,
                delta,
                reason: reason.to_string(),
                timestamp: now,
            });
            info!(old_score, new_score, delta, reason, "Compliance score updated");
        } else {
            debug!(score = old_score, reason, "Zero compliance impact");
        }

        new_score
    }

    /// Record a resolved incident for `candidate`. Returns the incident id.
    pub async fn add_incident(
        &self,
        candidate: &CrisisCandidate,
        automations_executed: Vec<String>,
    ) -> u64 {
        let mut inner = self.inner.write().await;
        let id = inner.next_incident_id;
        inner.next_incident_id += 1;

        inner.incidents.push(Incident {
            id,
            message_id: candidate.message_id.clone(),
            crisis_type: candidate.crisis_type,
            severity: candidate.severity,
            trigger: candidate.trigger_summary(),
            source_subject: candidate.source_subject.clone(),
            source_sender: candidate.source_sender.clone(),
            automations_executed,
            timestamp: Utc::now(),
            status: IncidentStatus::Resolved,
        });

        info!(
            incident_id = id,
            crisis_type = %candidate.crisis_type,
            message_id = %candidate.message_id,
            "Incident recorded"
        );
        id
    }

    pub async fn score(&self) -> i32 {
        self.inner.read().await.score
    }

    /// Score changes, oldest first.
    pub async fn history(&self) -> Vec<ComplianceEntry> {
        self.inner.read().await.history.snapshot()
    }

    /// Incidents, oldest first.
    pub async fn incidents(&self) -> Vec<Incident> {
        self.inner.read().await.incidents.snapshot()
    }

    pub async fn snapshot(&self) -> ComplianceSnapshot {
        let inner = self.inner.read().await;
        ComplianceSnapshot {
            score: inner.score,
            history: inner.history.snapshot(),
            incidents: inner.incidents.snapshot(),
            last_updated: inner.last_updated,
        }
    }
}

fn clamp_score(raw: i64) -> i32 {
    // Bounds fit in i32, so the cast after clamping is lossless.
    raw.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE)) as i32
}
