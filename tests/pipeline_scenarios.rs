//! End-to-end scenarios for the crisis pipeline.
//!
//! Each test builds an isolated `CrisisState` and drives the public
//! pipeline API the way a caller would.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crisis_desk::automation::{AutomationContext, FnHandler, HandlerRegistry};
use crisis_desk::config::CrisisConfig;
use crisis_desk::crisis::{
    AutomationStatus, CrisisClassifier, CrisisTaxonomy, CrisisType, DetectionMethod, RawMessage,
    Severity,
};
use crisis_desk::error::{AutomationError, ChannelError, LlmError};
use crisis_desk::llm::provider::{CompletionRequest, CompletionResponse, LlmProvider, Role};
use crisis_desk::notify::NotificationSender;
use crisis_desk::pipeline::{CrisisPipeline, PipelineDeps};
use crisis_desk::state::CrisisState;

/// Notifier that remembers recipients.
#[derive(Default)]
struct RecordingNotifier {
    recipients: Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSender for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, recipient: &str, _subject: &str, _body: &str) -> Result<(), ChannelError> {
        self.recipients.lock().unwrap().push(recipient.to_string());
        Ok(())
    }
}

/// LLM stub that answers by subject line: `low` / `medium` / `high`
/// produce a Customer Issue of that severity, `hang` never answers in
/// time, anything else is "not a crisis".
struct ScriptedLlm;

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request
            .messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        let subject = prompt
            .lines()
            .next()
            .and_then(|l| l.strip_prefix("Subject: "))
            .unwrap_or("")
            .to_string();

        let content = match subject.as_str() {
            "hang" => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                r#"{"is_crisis": false}"#.to_string()
            }
            "low" | "medium" | "high" => format!(
                r#"{{"is_crisis": true, "type": "Customer Issue", "severity": "{}", "keywords": ["{subject}"]}}"#,
                subject.to_uppercase()
            ),
            _ => r#"{"is_crisis": false}"#.to_string(),
        };

        Ok(CompletionResponse {
            content,
            input_tokens: 0,
            output_tokens: 0,
        })
    }
}

struct Harness {
    pipeline: CrisisPipeline,
    notifier: Arc<RecordingNotifier>,
}

fn harness(config: CrisisConfig, registry: HandlerRegistry, llm: bool) -> Harness {
    let taxonomy = Arc::new(CrisisTaxonomy::standard());
    let classifier = if llm {
        CrisisClassifier::with_llm(
            Arc::new(ScriptedLlm),
            Arc::clone(&taxonomy),
            Duration::from_millis(100),
        )
    } else {
        CrisisClassifier::rules_only(Arc::clone(&taxonomy))
    };
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = CrisisPipeline::new(
        config.clone(),
        PipelineDeps {
            state: Arc::new(CrisisState::new(&config)),
            taxonomy,
            classifier,
            registry: Arc::new(registry),
            notifier: Arc::clone(&notifier) as Arc<dyn NotificationSender>,
        },
    );
    Harness { pipeline, notifier }
}

fn default_harness() -> Harness {
    harness(CrisisConfig::default(), HandlerRegistry::with_builtins(), false)
}

fn msg(id: &str, subject: &str, body: &str) -> RawMessage {
    RawMessage::new(id, subject, body, "staff@x")
}

#[tokio::test]
async fn scenario_a_resignation() {
    let h = default_harness();
    let result = h
        .pipeline
        .process_full(&[msg("m-1", "I quit", "effective immediately")])
        .await;

    assert!(result.crisis_detected);
    let crisis = result.crisis.as_ref().unwrap();
    assert_eq!(crisis.crisis_type, CrisisType::StaffResignation);
    assert_eq!(crisis.severity, Severity::High);
    assert_eq!(crisis.detection_method, DetectionMethod::Rule);

    let names: Vec<_> = result.automation_results.iter().map(|r| r.name.as_str()).collect();
    assert!(names.contains(&"emergency_hiring"));
    assert!(names.contains(&"post_job_website"));

    assert_eq!(result.compliance_impact, -5);
    assert_eq!(result.compliance_score, 95);

    let snapshot = h.pipeline.snapshot().await;
    assert_eq!(snapshot.store.job_postings.len(), 1);
    assert_eq!(snapshot.store.job_postings[0].title, "Now Hiring: Staff Member");
    assert_eq!(snapshot.incidents.len(), 1);
    assert_eq!(snapshot.incidents[0].automations_executed.len(), 8);
    assert_eq!(*h.notifier.recipients.lock().unwrap(), vec!["staff@x".to_string()]);
}

#[tokio::test]
async fn scenario_b_no_keyword() {
    let h = default_harness();
    let result = h
        .pipeline
        .process_full(&[msg("m-1", "Lunch plans", "see you at noon")])
        .await;

    assert!(!result.crisis_detected);
    assert_eq!(result.emails_checked, 1);
    assert!(result.incident_id.is_none());

    let snapshot = h.pipeline.snapshot().await;
    assert_eq!(snapshot.compliance_score, 100);
    assert!(snapshot.compliance_history.is_empty());
    assert!(snapshot.incidents.is_empty());
    assert!(snapshot.activity.is_empty());
    assert!(snapshot.automation_log.is_empty());
    assert!(snapshot.store.job_postings.is_empty());
    assert!(h.notifier.recipients.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scenario_c_fire_outranks_sick() {
    let h = default_harness();
    let batch = vec![
        msg("m-1", "Out today", "I am sick"),
        msg("m-2", "Kitchen", "small fire near the stove"),
    ];
    let result = h.pipeline.process_full(&batch).await;

    assert_eq!(result.total_crises_found, 2);
    let crisis = result.crisis.as_ref().unwrap();
    assert_eq!(crisis.crisis_type, CrisisType::FireEmergency);
    assert_eq!(crisis.message_id, "m-2");
    assert_eq!(result.compliance_impact, -20);
    assert_eq!(result.compliance_score, 80);
}

#[tokio::test]
async fn scenario_d_score_clamps_at_zero() {
    let config = CrisisConfig {
        initial_compliance_score: 5,
        ..CrisisConfig::default()
    };
    let h = harness(config, HandlerRegistry::with_builtins(), false);
    let result = h
        .pipeline
        .process_full(&[msg("m-1", "Fire", "fire in the dining room")])
        .await;

    assert_eq!(result.compliance_score, 0);
    let history = h.pipeline.snapshot().await.compliance_history;
    assert_eq!(history.len(), 1);
    assert_eq!((history[0].old_score, history[0].new_score), (5, 0));
}

#[tokio::test]
async fn scenario_e_reset_allows_reprocessing() {
    let h = default_harness();
    let batch = vec![msg("m-1", "Flood", "flood in the basement")];

    assert!(h.pipeline.process_full(&batch).await.crisis_detected);
    assert!(!h.pipeline.process_full(&batch).await.crisis_detected);

    h.pipeline.reset_dedup().await;
    let again = h.pipeline.process_full(&batch).await;
    assert!(again.crisis_detected);
    assert_eq!(h.pipeline.snapshot().await.incidents.len(), 2);
}

#[tokio::test]
async fn same_message_twice_yields_one_incident() {
    let h = default_harness();
    let batch = vec![msg("m-1", "I resign", "last day friday")];

    let first = h.pipeline.process_full(&batch).await;
    let second = h.pipeline.process_full(&batch).await;

    assert!(first.crisis_detected);
    assert!(!second.crisis_detected);
    assert_eq!(second.emails_checked, 1);
    assert_eq!(second.duplicates_skipped, 1);
    assert_eq!(h.pipeline.snapshot().await.incidents.len(), 1);
}

#[tokio::test]
async fn concurrent_runs_on_same_message_yield_one_incident() {
    let h = Arc::new(default_harness());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let h = Arc::clone(&h);
        handles.push(tokio::spawn(async move {
            h.pipeline
                .process_full(&[msg("m-1", "Fire", "fire")])
                .await
                .crisis_detected
        }));
    }
    let mut detected = 0;
    for handle in handles {
        if handle.await.unwrap() {
            detected += 1;
        }
    }
    assert_eq!(detected, 1);
    assert_eq!(h.pipeline.snapshot().await.incidents.len(), 1);
    assert_eq!(h.pipeline.compliance_score().await, 80);
}

#[tokio::test]
async fn ai_severity_priority_low_high_medium() {
    let h = harness(CrisisConfig::default(), HandlerRegistry::with_builtins(), true);
    let batch = vec![
        msg("m-low", "low", "cold coffee"),
        msg("m-high", "high", "guest fell ill"),
        msg("m-medium", "medium", "slow service"),
    ];

    let outcome = h.pipeline.check_for_crisis(&batch).await;
    assert_eq!(outcome.total_crises_found, 3);
    let crisis = outcome.crisis.unwrap();
    assert_eq!(crisis.message_id, "m-high");
    assert_eq!(crisis.severity, Severity::High);
    assert_eq!(crisis.detection_method, DetectionMethod::Ai);
}

#[tokio::test]
async fn equal_severity_first_detected_wins() {
    let h = default_harness();
    let batch = vec![
        msg("m-1", "Fire", "fire at the back door"),
        msg("m-2", "Flood", "flood in the cellar"),
    ];
    let outcome = h.pipeline.check_for_crisis(&batch).await;
    assert_eq!(outcome.crisis.unwrap().message_id, "m-1");
}

#[tokio::test]
async fn ai_timeout_falls_back_to_rules() {
    let h = harness(CrisisConfig::default(), HandlerRegistry::with_builtins(), true);
    let result = h
        .pipeline
        .process_full(&[msg("m-1", "hang", "the walk-in cooler is broken")])
        .await;

    assert!(result.crisis_detected);
    let crisis = result.crisis.unwrap();
    assert_eq!(crisis.crisis_type, CrisisType::EquipmentFailure);
    assert_eq!(crisis.detection_method, DetectionMethod::Rule);
}

#[tokio::test]
async fn failing_automation_is_isolated_end_to_end() {
    let mut registry = HandlerRegistry::with_builtins();
    // Third step of the fire chain
    registry.register(Arc::new(FnHandler::new(
        "staff_alert",
        |_: &AutomationContext| -> Result<serde_json::Value, AutomationError> {
            Err(AutomationError::Failed {
                name: "staff_alert".into(),
                reason: "SMS gateway down".into(),
            })
        },
    )));
    let h = harness(CrisisConfig::default(), registry, false);

    let result = h
        .pipeline
        .process_full(&[msg("m-1", "Fire", "fire in kitchen")])
        .await;

    let statuses: Vec<_> = result.automation_results.iter().map(|r| r.status).collect();
    assert_eq!(statuses.len(), 6);
    assert_eq!(statuses[2], AutomationStatus::Failed);
    assert!(
        statuses
            .iter()
            .enumerate()
            .all(|(i, s)| i == 2 || *s == AutomationStatus::Success)
    );
    assert_eq!(result.compliance_score, 80);
    assert!(result.notification_sent);
    assert!(result.response.unwrap().contains("Staff Alert"));
    assert!(h.pipeline.snapshot().await.store.closed);
}

#[tokio::test]
async fn incident_list_is_capped() {
    let config = CrisisConfig {
        incident_cap: 3,
        ..CrisisConfig::default()
    };
    let h = harness(config, HandlerRegistry::with_builtins(), false);
    for i in 0..4 {
        h.pipeline
            .process_full(&[msg(&format!("m-{i}"), "Sick", "sick today")])
            .await;
    }
    let incidents = h.pipeline.snapshot().await.incidents;
    assert_eq!(incidents.len(), 3);
    assert!(incidents.iter().all(|i| i.message_id != "m-0"));
}
