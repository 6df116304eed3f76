//! Shared types for crisis detection and remediation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crisis::taxonomy::{CrisisType, Severity, StoreActionKind, TaxonomyEntry};

/// Body characters kept on a candidate for display and prompts.
pub const BODY_EXCERPT_CHARS: usize = 200;

// ── Inbound message ─────────────────────────────────────────────────

/// A message handed to the pipeline by a message-source adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Unique, non-empty id (channel-native).
    pub id: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sender: String,
}

impl RawMessage {
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        sender: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
            sender: sender.into(),
        }
    }

    /// Subject and body joined and lower-cased, as scanned by the rule classifier.
    pub fn scan_text(&self) -> String {
        format!("{} {}", self.subject, self.body).to_lowercase()
    }
}

// ── Crisis candidate ────────────────────────────────────────────────

/// How a candidate was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DetectionMethod {
    Rule,
    Ai,
    /// Supplied directly by a caller rather than detected.
    Manual,
}

/// A detected crisis. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrisisCandidate {
    pub message_id: String,
    pub crisis_type: CrisisType,
    pub severity: Severity,
    pub trigger_evidence: Vec<String>,
    pub source_subject: String,
    pub source_sender: String,
    pub source_body_excerpt: String,
    /// Full message body, scanned by store actions.
    pub source_body: String,
    pub detection_method: DetectionMethod,
    pub timestamp: DateTime<Utc>,
    /// Automation chain resolved from the taxonomy at detection time.
    pub automations: Vec<String>,
    pub compliance_impact: i32,
    pub store_actions: Vec<StoreActionKind>,
}

impl CrisisCandidate {
    /// Build a candidate for `message` from a taxonomy entry.
    pub fn from_entry(
        message: &RawMessage,
        entry: &TaxonomyEntry,
        severity: Severity,
        trigger_evidence: Vec<String>,
        detection_method: DetectionMethod,
    ) -> Self {
        Self {
            message_id: message.id.clone(),
            crisis_type: entry.crisis_type,
            severity,
            trigger_evidence,
            source_subject: message.subject.clone(),
            source_sender: message.sender.clone(),
            source_body_excerpt: excerpt(&message.body, BODY_EXCERPT_CHARS),
            source_body: message.body.clone(),
            detection_method,
            timestamp: Utc::now(),
            automations: entry.automations.iter().map(|a| a.to_string()).collect(),
            compliance_impact: entry.compliance_impact,
            store_actions: entry.store_actions.to_vec(),
        }
    }

    /// Trigger evidence joined for display, e.g. "quit".
    pub fn trigger_summary(&self) -> String {
        if self.trigger_evidence.is_empty() {
            match self.detection_method {
                DetectionMethod::Ai => "AI detected".to_string(),
                DetectionMethod::Rule => "keyword".to_string(),
                DetectionMethod::Manual => "manual".to_string(),
            }
        } else {
            self.trigger_evidence.join(", ")
        }
    }
}

/// Read-only view of a candidate returned by `check_for_crisis`.
#[derive(Debug, Clone, Serialize)]
pub struct CrisisCandidateView {
    pub message_id: String,
    pub crisis_type: CrisisType,
    pub severity: Severity,
    pub trigger: String,
    pub subject: String,
    pub sender: String,
    pub content_preview: String,
    pub detection_method: DetectionMethod,
    pub automations_to_trigger: Vec<String>,
    pub compliance_impact: i32,
    pub timestamp: DateTime<Utc>,
}

impl From<&CrisisCandidate> for CrisisCandidateView {
    fn from(c: &CrisisCandidate) -> Self {
        Self {
            message_id: c.message_id.clone(),
            crisis_type: c.crisis_type,
            severity: c.severity,
            trigger: c.trigger_summary(),
            subject: c.source_subject.clone(),
            sender: c.source_sender.clone(),
            content_preview: c.source_body_excerpt.clone(),
            detection_method: c.detection_method,
            automations_to_trigger: c.automations.clone(),
            compliance_impact: c.compliance_impact,
            timestamp: c.timestamp,
        }
    }
}

// ── Automation records ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AutomationStatus {
    Success,
    Failed,
}

/// Outcome of one automation invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRecord {
    pub name: String,
    pub status: AutomationStatus,
    pub detail: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AutomationRecord {
    pub fn success(name: impl Into<String>, detail: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            status: AutomationStatus::Success,
            detail,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: AutomationStatus::Failed,
            detail: serde_json::json!({ "error": error.into() }),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AutomationStatus::Success
    }
}

/// Entry of the global automation log.
#[derive(Debug, Clone, Serialize)]
pub struct AutomationLogEntry {
    pub crisis_type: CrisisType,
    pub message_id: String,
    pub record: AutomationRecord,
}

/// Outcome of one store action applied for a crisis.
#[derive(Debug, Clone, Serialize)]
pub struct StoreActionOutcome {
    pub action: StoreActionKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Ledger entries ──────────────────────────────────────────────────

/// A non-zero change of the compliance score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceEntry {
    pub old_score: i32,
    pub new_score: i32,
    pub delta: i32,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Resolved,
}

/// One resolved crisis.
#[derive(Debug, Clone, Serialize)]
pub struct Incident {
    pub id: u64,
    pub message_id: String,
    pub crisis_type: CrisisType,
    pub severity: Severity,
    pub trigger: String,
    pub source_subject: String,
    pub source_sender: String,
    pub automations_executed: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub status: IncidentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityCategory {
    Crisis,
    Store,
    Email,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A human-readable event on the activity feed.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEvent {
    pub id: u64,
    pub category: ActivityCategory,
    pub message: String,
    pub severity: ActivityLevel,
    pub timestamp: DateTime<Utc>,
}

// ── Pipeline results ────────────────────────────────────────────────

/// Result of `check_for_crisis`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub crisis_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crisis: Option<CrisisCandidateView>,
    pub emails_checked: usize,
    pub duplicates_skipped: usize,
    pub total_crises_found: usize,
}

/// Result of `execute_crisis`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub automations_executed: usize,
    pub results: Vec<AutomationRecord>,
    pub store_actions: Vec<StoreActionOutcome>,
    pub compliance_score: i32,
}

/// Result of `process_full`.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub crisis_detected: bool,
    pub emails_checked: usize,
    pub duplicates_skipped: usize,
    pub total_crises_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crisis: Option<CrisisCandidateView>,
    pub automations_executed: usize,
    pub automation_results: Vec<AutomationRecord>,
    pub store_actions: Vec<StoreActionOutcome>,
    pub compliance_impact: i32,
    pub compliance_score: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    pub notification_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PipelineResult {
    /// A result for a batch that produced no crisis.
    pub fn no_crisis(emails_checked: usize, duplicates_skipped: usize, score: i32) -> Self {
        Self {
            crisis_detected: false,
            emails_checked,
            duplicates_skipped,
            total_crises_found: 0,
            crisis: None,
            automations_executed: 0,
            automation_results: Vec::new(),
            store_actions: Vec::new(),
            compliance_impact: 0,
            compliance_score: score,
            incident_id: None,
            response: None,
            notification_sent: false,
            notification_error: None,
            timestamp: Utc::now(),
        }
    }
}

/// First `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
