//! Crisis pipeline — check → classify → resolve → dispatch → score → respond.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::automation::{AutomationExecutor, HandlerRegistry};
use crate::config::CrisisConfig;
use crate::crisis::taxonomy::{CrisisTaxonomy, CrisisType, Severity};
use crate::crisis::types::{
    ActivityCategory, ActivityLevel, CheckOutcome, CrisisCandidate, CrisisCandidateView,
    DetectionMethod, ExecutionReport, PipelineResult, RawMessage,
};
use crate::crisis::{CrisisClassifier, generate_response, reply_subject, resolve_priority};
use crate::error::{ChannelError, PipelineError};
use crate::notify::{DeliveryReport, NotificationSender};
use crate::state::{CrisisState, StateSnapshot};

/// Collaborators a pipeline is built from.
pub struct PipelineDeps {
    pub state: Arc<CrisisState>,
    pub taxonomy: Arc<CrisisTaxonomy>,
    pub classifier: CrisisClassifier,
    pub registry: Arc<HandlerRegistry>,
    pub notifier: Arc<dyn NotificationSender>,
}

/// A crisis supplied directly by a caller rather than detected.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualCrisis {
    /// Taxonomy label, e.g. "Fire Emergency".
    #[serde(alias = "type")]
    pub crisis_type: String,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sender: String,
    /// Overrides the taxonomy's compliance impact.
    #[serde(default)]
    pub compliance_impact: Option<i32>,
}

impl ManualCrisis {
    pub fn of_type(crisis_type: impl Into<String>) -> Self {
        Self {
            crisis_type: crisis_type.into(),
            severity: None,
            message_id: None,
            subject: String::new(),
            body: String::new(),
            sender: String::new(),
            compliance_impact: None,
        }
    }
}

/// Candidates found in one batch.
struct BatchScan {
    candidates: Vec<CrisisCandidate>,
    emails_checked: usize,
    duplicates_skipped: usize,
}

/// End-to-end crisis pipeline over a shared [`CrisisState`].
pub struct CrisisPipeline {
    config: CrisisConfig,
    state: Arc<CrisisState>,
    taxonomy: Arc<CrisisTaxonomy>,
    classifier: CrisisClassifier,
    executor: AutomationExecutor,
    notifier: Arc<dyn NotificationSender>,
}

impl CrisisPipeline {
    pub fn new(config: CrisisConfig, deps: PipelineDeps) -> Self {
        let executor = AutomationExecutor::new(deps.registry, Arc::clone(&deps.state), &config);
        Self {
            config,
            state: deps.state,
            taxonomy: deps.taxonomy,
            classifier: deps.classifier,
            executor,
            notifier: deps.notifier,
        }
    }

    pub fn config(&self) -> &CrisisConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<CrisisState> {
        &self.state
    }

    /// Classify a batch and report the crisis that would be acted on.
    /// Reads the dedup ledger but mutates nothing.
    pub async fn check_for_crisis(&self, messages: &[RawMessage]) -> CheckOutcome {
        let scan = self.scan(messages, false).await;
        let total_crises_found = scan.candidates.len();
        let selected = resolve_priority(scan.candidates);

        CheckOutcome {
            crisis_detected: selected.is_some(),
            crisis: selected.as_ref().map(CrisisCandidateView::from),
            emails_checked: scan.emails_checked,
            duplicates_skipped: scan.duplicates_skipped,
            total_crises_found,
        }
    }

    /// Dispatch an already-identified crisis. No incident is recorded.
    pub async fn execute_crisis(
        &self,
        request: ManualCrisis,
    ) -> Result<ExecutionReport, PipelineError> {
        let crisis_type = CrisisType::from_label(&request.crisis_type)
            .ok_or_else(|| PipelineError::InvalidCrisisType(request.crisis_type.clone()))?;
        let entry = self
            .taxonomy
            .entry_for_type(crisis_type)
            .ok_or_else(|| PipelineError::InvalidCrisisType(request.crisis_type.clone()))?;

        let message = RawMessage::new(
            request
                .message_id
                .unwrap_or_else(|| format!("manual-{}", uuid::Uuid::new_v4())),
            request.subject,
            request.body,
            request.sender,
        );
        let mut candidate = CrisisCandidate::from_entry(
            &message,
            entry,
            request.severity.unwrap_or(entry.default_severity),
            Vec::new(),
            DetectionMethod::Manual,
        );
        if let Some(impact) = request.compliance_impact {
            candidate.compliance_impact = impact;
        }

        let report = self.executor.execute(&candidate).await;
        self.state
            .activity
            .record(
                ActivityCategory::Crisis,
                format!(
                    "Crisis handled: {} ({} automations)",
                    crisis_type, report.automations_executed
                ),
                ActivityLevel::Success,
            )
            .await;
        Ok(report)
    }

    /// Run the full pipeline over a batch. Never fails; every recovered
    /// failure is reported in the result.
    pub async fn process_full(&self, messages: &[RawMessage]) -> PipelineResult {
        let scan = self.scan(messages, true).await;
        let total_crises_found = scan.candidates.len();

        let Some(crisis) = resolve_priority(scan.candidates) else {
            debug!(emails_checked = scan.emails_checked, "No crisis in batch");
            return PipelineResult::no_crisis(
                scan.emails_checked,
                scan.duplicates_skipped,
                self.state.compliance.score().await,
            );
        };

        info!(
            message_id = %crisis.message_id,
            crisis_type = %crisis.crisis_type,
            severity = %crisis.severity,
            method = ?crisis.detection_method,
            "Crisis detected"
        );
        self.state
            .activity
            .record(
                ActivityCategory::Crisis,
                format!(
                    "Crisis detected: {} from {}",
                    crisis.crisis_type,
                    display_sender(&crisis.source_sender)
                ),
                match crisis.severity {
                    Severity::High => ActivityLevel::Error,
                    Severity::Medium | Severity::Low => ActivityLevel::Warning,
                },
            )
            .await;

        let report = self.executor.execute(&crisis).await;

        let executed: Vec<String> = report.results.iter().map(|r| r.name.clone()).collect();
        let incident_id = self.state.compliance.add_incident(&crisis, executed).await;

        let response = generate_response(Some(crisis.crisis_type), &report.results);
        let delivery = self.notify(&crisis, &response).await;

        self.state
            .activity
            .record(
                ActivityCategory::Crisis,
                format!(
                    "Crisis resolved: {} ({} automations)",
                    crisis.crisis_type, report.automations_executed
                ),
                ActivityLevel::Success,
            )
            .await;

        PipelineResult {
            crisis_detected: true,
            emails_checked: scan.emails_checked,
            duplicates_skipped: scan.duplicates_skipped,
            total_crises_found,
            crisis: Some(CrisisCandidateView::from(&crisis)),
            automations_executed: report.automations_executed,
            automation_results: report.results,
            store_actions: report.store_actions,
            compliance_impact: crisis.compliance_impact,
            compliance_score: report.compliance_score,
            incident_id: Some(incident_id),
            response: Some(response),
            notification_sent: delivery.success,
            notification_error: delivery.error,
            timestamp: Utc::now(),
        }
    }

    /// Forget processed message ids so they can be handled again.
    pub async fn reset_dedup(&self) -> usize {
        let cleared = self.state.dedup.reset().await;
        info!(cleared, "Processed message history cleared");
        self.state
            .activity
            .record(
                ActivityCategory::System,
                format!("Processed message history cleared ({cleared} ids)"),
                ActivityLevel::Info,
            )
            .await;
        cleared
    }

    pub async fn compliance_score(&self) -> i32 {
        self.state.compliance.score().await
    }

    pub async fn snapshot(&self) -> StateSnapshot {
        self.state.snapshot().await
    }

    /// Filter a batch through the dedup ledger and classify what remains.
    ///
    /// With `mark_processed`, every admitted id is recorded before it is
    /// classified, whatever the outcome.
    async fn scan(&self, messages: &[RawMessage], mark_processed: bool) -> BatchScan {
        let mut admitted: Vec<&RawMessage> = Vec::with_capacity(messages.len());
        let mut in_batch: HashSet<&str> = HashSet::new();
        let mut duplicates_skipped = 0usize;

        for message in messages {
            if message.id.trim().is_empty() {
                let err = PipelineError::InvalidMessage("message id is empty".into());
                warn!(error = %err, subject = %message.subject, "Skipping message");
                continue;
            }
            let fresh = if mark_processed {
                self.state.dedup.should_process(&message.id).await
            } else {
                in_batch.insert(message.id.as_str()) && !self.state.dedup.is_seen(&message.id).await
            };
            if fresh {
                admitted.push(message);
            } else {
                duplicates_skipped += 1;
            }
        }

        // Classified concurrently; join_all keeps detection order for tie-breaks
        let candidates = join_all(admitted.iter().map(|m| self.classifier.classify(m)))
            .await
            .into_iter()
            .flatten()
            .collect();

        BatchScan {
            candidates,
            emails_checked: messages.len(),
            duplicates_skipped,
        }
    }

    async fn notify(&self, crisis: &CrisisCandidate, body: &str) -> DeliveryReport {
        let recipient = match crisis.source_sender.trim() {
            "" => self.config.notification_recipient.clone(),
            sender => Some(sender.to_string()),
        };
        let subject = reply_subject(&crisis.source_subject);

        let result = match recipient.as_deref() {
            Some(to) => self.notifier.send(to, &subject, body).await,
            None => Err(ChannelError::InvalidAddress(
                "crisis has no sender and no fallback recipient is configured".into(),
            )),
        };

        let target = recipient.as_deref().unwrap_or("<none>");
        let (message, level) = match &result {
            Ok(()) => {
                info!(recipient = target, channel = self.notifier.name(), "Crisis reply delivered");
                (format!("Reply sent to {target}"), ActivityLevel::Success)
            }
            Err(e) => {
                warn!(recipient = target, error = %e, "Crisis reply not delivered");
                (format!("Reply to {target} failed: {e}"), ActivityLevel::Error)
            }
        };
        self.state
            .activity
            .record(ActivityCategory::Email, message, level)
            .await;

        DeliveryReport::from(result)
    }
}

fn display_sender(sender: &str) -> &str {
    if sender.trim().is_empty() {
        "unknown sender"
    } else {
        sender
    }
}
