//! Crisis classification.
//!
//! Two strategies behind one trait:
//! 1. `LlmClassifier` — asks an LLM for a structured verdict (bounded by a timeout)
//! 2. `RuleClassifier` — deterministic keyword scan over the taxonomy
//!
//! `CrisisClassifier` tries the primary strategy first and falls back to the
//! secondary one whenever the primary errors, times out, or finds nothing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::crisis::taxonomy::{CrisisTaxonomy, CrisisType, Severity, TaxonomyEntry};
use crate::crisis::types::{CrisisCandidate, DetectionMethod, RawMessage};
use crate::error::{LlmError, PipelineError};
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};

/// Max tokens for the verdict (a small JSON object).
const CLASSIFY_MAX_TOKENS: u32 = 256;

/// Low temperature keeps verdicts stable across runs.
const CLASSIFY_TEMPERATURE: f32 = 0.1;

/// Body characters included in the prompt.
const PROMPT_BODY_CHARS: usize = 1000;

/// A single classification strategy.
#[async_trait]
pub trait ClassificationStrategy: Send + Sync {
    /// Strategy name for logging.
    fn name(&self) -> &str;

    /// Classify one message.
    ///
    /// `Ok(None)` means "no crisis found"; `Err` means the strategy could not
    /// reach a verdict at all.
    async fn classify(&self, message: &RawMessage)
    -> Result<Option<CrisisCandidate>, PipelineError>;
}

// ── Rule-based ──────────────────────────────────────────────────────

/// Keyword scan over the taxonomy. Deterministic and never fails.
pub struct RuleClassifier {
    taxonomy: Arc<CrisisTaxonomy>,
}

impl RuleClassifier {
    pub fn new(taxonomy: Arc<CrisisTaxonomy>) -> Self {
        Self { taxonomy }
    }

    /// Pick the matching keyword with the highest severity rank.
    /// Equal ranks keep the first entry in registry order.
    pub fn scan(&self, message: &RawMessage) -> Option<CrisisCandidate> {
        let text = message.scan_text();

        let mut best: Option<&TaxonomyEntry> = None;
        for entry in self.taxonomy.matching(&text) {
            debug!(
                message_id = %message.id,
                keyword = entry.keyword,
                severity = %entry.default_severity,
                "Keyword matched"
            );
            if best.is_none_or(|b| entry.default_severity.rank() > b.default_severity.rank()) {
                best = Some(entry);
            }
        }

        best.map(|entry| {
            CrisisCandidate::from_entry(
                message,
                entry,
                entry.default_severity,
                vec![entry.keyword.to_string()],
                DetectionMethod::Rule,
            )
        })
    }
}

#[async_trait]
impl ClassificationStrategy for RuleClassifier {
    fn name(&self) -> &str {
        "rules"
    }

    async fn classify(
        &self,
        message: &RawMessage,
    ) -> Result<Option<CrisisCandidate>, PipelineError> {
        Ok(self.scan(message))
    }
}

// ── AI-assisted ─────────────────────────────────────────────────────

/// LLM-backed classifier returning a structured verdict.
pub struct LlmClassifier {
    llm: Arc<dyn LlmProvider>,
    taxonomy: Arc<CrisisTaxonomy>,
    timeout: Duration,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>, taxonomy: Arc<CrisisTaxonomy>, timeout: Duration) -> Self {
        Self {
            llm,
            taxonomy,
            timeout,
        }
    }

    /// Turn a parsed verdict into a candidate, resolving the type against the taxonomy.
    fn candidate_from_verdict(&self, message: &RawMessage, verdict: Verdict) -> CrisisCandidate {
        let crisis_type = verdict
            .crisis_type
            .as_deref()
            .and_then(CrisisType::from_label);
        if crisis_type.is_none() {
            debug!(
                message_id = %message.id,
                returned_type = verdict.crisis_type.as_deref().unwrap_or(""),
                "AI returned unrecognized crisis type, using General Emergency"
            );
        }

        let entry = self
            .taxonomy
            .entry_or_fallback(crisis_type.unwrap_or(CrisisType::GeneralEmergency));

        let severity = verdict
            .severity
            .as_deref()
            .and_then(Severity::parse)
            .unwrap_or(entry.default_severity);

        let keywords = verdict
            .keywords
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        CrisisCandidate::from_entry(message, &entry, severity, keywords, DetectionMethod::Ai)
    }
}

#[async_trait]
impl ClassificationStrategy for LlmClassifier {
    fn name(&self) -> &str {
        "llm"
    }

    async fn classify(
        &self,
        message: &RawMessage,
    ) -> Result<Option<CrisisCandidate>, PipelineError> {
        if message.subject.trim().is_empty() && message.body.trim().is_empty() {
            debug!(message_id = %message.id, "Empty message, skipping AI classification");
            return Ok(None);
        }

        let request = CompletionRequest::new(vec![
            ChatMessage::system(build_classify_system_prompt()),
            ChatMessage::user(build_classify_user_prompt(message)),
        ])
        .with_temperature(CLASSIFY_TEMPERATURE)
        .with_max_tokens(CLASSIFY_MAX_TOKENS);

        let response = tokio::time::timeout(self.timeout, self.llm.complete(request))
            .await
            .map_err(|_| LlmError::Timeout {
                provider: self.llm.model_name().to_string(),
                timeout: self.timeout,
            })??;
        debug!(
            message_id = %message.id,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "AI verdict received"
        );

        let verdict = parse_verdict(&response.content).map_err(|e| {
            PipelineError::Classification(format!("malformed verdict: {e}"))
        })?;

        if !verdict.is_crisis {
            debug!(message_id = %message.id, "AI verdict: not a crisis");
            return Ok(None);
        }

        Ok(Some(self.candidate_from_verdict(message, verdict)))
    }
}

// ── Composite ───────────────────────────────────────────────────────

/// Primary-then-secondary classifier.
pub struct CrisisClassifier {
    primary: Option<Arc<dyn ClassificationStrategy>>,
    secondary: Arc<dyn ClassificationStrategy>,
}

impl CrisisClassifier {
    pub fn new(
        primary: Option<Arc<dyn ClassificationStrategy>>,
        secondary: Arc<dyn ClassificationStrategy>,
    ) -> Self {
        Self { primary, secondary }
    }

    /// Rule-based only (no LLM configured).
    pub fn rules_only(taxonomy: Arc<CrisisTaxonomy>) -> Self {
        Self::new(None, Arc::new(RuleClassifier::new(taxonomy)))
    }

    /// LLM first, rules as fallback.
    pub fn with_llm(
        llm: Arc<dyn LlmProvider>,
        taxonomy: Arc<CrisisTaxonomy>,
        timeout: Duration,
    ) -> Self {
        Self::new(
            Some(Arc::new(LlmClassifier::new(llm, Arc::clone(&taxonomy), timeout))),
            Arc::new(RuleClassifier::new(taxonomy)),
        )
    }

    /// Classify a message. Never fails: strategy errors degrade to `None`.
    pub async fn classify(&self, message: &RawMessage) -> Option<CrisisCandidate> {
        if let Some(primary) = &self.primary {
            match primary.classify(message).await {
                Ok(Some(candidate)) => {
                    info!(
                        message_id = %message.id,
                        strategy = primary.name(),
                        crisis_type = %candidate.crisis_type,
                        severity = %candidate.severity,
                        "Crisis classified"
                    );
                    return Some(candidate);
                }
                Ok(None) => {
                    debug!(
                        message_id = %message.id,
                        strategy = primary.name(),
                        "Primary classifier found no crisis, checking fallback"
                    );
                }
                Err(e) => {
                    warn!(
                        message_id = %message.id,
                        strategy = primary.name(),
                        error = %e,
                        "Classification unavailable, falling back"
                    );
                }
            }
        }

        match self.secondary.classify(message).await {
            Ok(Some(candidate)) => {
                info!(
                    message_id = %message.id,
                    strategy = self.secondary.name(),
                    crisis_type = %candidate.crisis_type,
                    severity = %candidate.severity,
                    "Crisis classified"
                );
                Some(candidate)
            }
            Ok(None) => {
                debug!(message_id = %message.id, "No crisis detected");
                None
            }
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    strategy = self.secondary.name(),
                    error = %e,
                    "Fallback classifier failed"
                );
                None
            }
        }
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_classify_system_prompt() -> String {
    let types = CrisisType::ALL
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You decide whether an email describes a crisis or urgent issue for a restaurant/cafe business.\n\n\
         If it is a crisis, choose the type from: {types}.\n\
         Severity is one of LOW, MEDIUM, HIGH.\n\
         List the words or phrases that triggered the decision.\n\n\
         Respond with ONLY a JSON object:\n\
         {{\"is_crisis\": true, \"type\": \"...\", \"severity\": \"HIGH\", \"keywords\": [\"...\"]}}"
    )
}

fn build_classify_user_prompt(message: &RawMessage) -> String {
    let body: String = message.body.chars().take(PROMPT_BODY_CHARS).collect();
    format!(
        "Subject: {}\nFrom: {}\n\nContent:\n{}",
        message.subject, message.sender, body
    )
}

// ── Response parsing ────────────────────────────────────────────────

/// Structured verdict requested from the LLM.
#[derive(Debug, serde::Deserialize)]
struct Verdict {
    #[serde(alias = "isCrisis")]
    is_crisis: bool,
    #[serde(default, rename = "type")]
    crisis_type: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

fn parse_verdict(raw: &str) -> Result<Verdict, String> {
    let json_str = extract_json_object(raw);
    serde_json::from_str(&json_str).map_err(|e| format!("JSON parse error: {e}"))
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::CompletionResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn taxonomy() -> Arc<CrisisTaxonomy> {
        Arc::new(CrisisTaxonomy::standard())
    }

    fn msg(subject: &str, body: &str) -> RawMessage {
        RawMessage::new("m-1", subject, body, "staff@x")
    }

    /// Stub LLM returning a canned response (or hanging / erroring).
    struct StubLlm {
        response: Result<String, ()>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl StubLlm {
        fn replying(response: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(response.to_string()),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                response: Err(()),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(r#"{"is_crisis": true, "type": "Fire Emergency"}"#.into()),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for StubLlm {
        fn model_name(&self) -> &str {
            "stub-classifier"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.response {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    input_tokens: 10,
                    output_tokens: 10,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "stub".into(),
                    reason: "connection refused".into(),
                }),
            }
        }
    }

    // ── Rule classifier ─────────────────────────────────────────────

    #[test]
    fn rules_detect_resignation() {
        let rules = RuleClassifier::new(taxonomy());
        let c = rules.scan(&msg("I quit", "effective immediately")).unwrap();
        assert_eq!(c.crisis_type, CrisisType::StaffResignation);
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.trigger_evidence, vec!["quit".to_string()]);
        assert_eq!(c.detection_method, DetectionMethod::Rule);
    }

    #[test]
    fn rules_case_insensitive() {
        let rules = RuleClassifier::new(taxonomy());
        let c = rules.scan(&msg("FLOOD IN THE BASEMENT", "")).unwrap();
        assert_eq!(c.crisis_type, CrisisType::WaterDamage);
    }

    #[test]
    fn rules_no_keyword_returns_none() {
        let rules = RuleClassifier::new(taxonomy());
        assert!(rules.scan(&msg("Lunch order", "Two burgers please")).is_none());
    }

    #[test]
    fn rules_ignore_sender_text() {
        let rules = RuleClassifier::new(taxonomy());
        let message = RawMessage::new("m", "hello", "all good", "fire-marshal@city.gov");
        assert!(rules.scan(&message).is_none());
    }

    #[test]
    fn rules_highest_severity_wins() {
        let rules = RuleClassifier::new(taxonomy());
        // "sick" (MEDIUM) appears before "fire" (HIGH) in both text and registry
        let c = rules.scan(&msg("Feeling sick", "and there is a fire")).unwrap();
        assert_eq!(c.crisis_type, CrisisType::FireEmergency);
    }

    #[test]
    fn rules_tie_goes_to_first_registry_entry() {
        let rules = RuleClassifier::new(taxonomy());
        // "flood" and "broken" are both HIGH; "broken" is defined first
        let c = rules.scan(&msg("flood", "pipe is broken")).unwrap();
        assert_eq!(c.trigger_evidence, vec!["broken".to_string()]);
        assert_eq!(c.crisis_type, CrisisType::EquipmentFailure);
    }

    // ── LLM classifier ──────────────────────────────────────────────

    #[tokio::test]
    async fn llm_verdict_resolves_taxonomy_entry() {
        let llm = StubLlm::replying(
            r#"{"is_crisis": true, "type": "Equipment Failure", "severity": "HIGH", "keywords": ["fryer", "smoke"]}"#,
        );
        let classifier = LlmClassifier::new(llm, taxonomy(), Duration::from_secs(1));
        let c = classifier
            .classify(&msg("Fryer", "fryer is smoking"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c.crisis_type, CrisisType::EquipmentFailure);
        assert_eq!(c.detection_method, DetectionMethod::Ai);
        assert_eq!(c.compliance_impact, -8);
        assert_eq!(c.trigger_evidence, vec!["fryer", "smoke"]);
        assert_eq!(c.automations[0], "equipment_repair_request");
    }

    #[tokio::test]
    async fn llm_unknown_type_falls_back_to_general_emergency() {
        let llm = StubLlm::replying(r#"{"is_crisis": true, "type": "Alien Invasion"}"#);
        let classifier = LlmClassifier::new(llm, taxonomy(), Duration::from_secs(1));
        let c = classifier
            .classify(&msg("Help", "lights in the sky"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c.crisis_type, CrisisType::GeneralEmergency);
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.compliance_impact, -10);
    }

    #[tokio::test]
    async fn llm_camel_case_and_markdown_accepted() {
        let llm = StubLlm::replying(
            "```json\n{\"isCrisis\": true, \"type\": \"Customer Issue\", \"severity\": \"low\"}\n```",
        );
        let classifier = LlmClassifier::new(llm, taxonomy(), Duration::from_secs(1));
        let c = classifier
            .classify(&msg("Cold food", "very unhappy"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c.crisis_type, CrisisType::CustomerIssue);
        assert_eq!(c.severity, Severity::Low);
    }

    #[tokio::test]
    async fn llm_not_a_crisis_returns_none() {
        let llm = StubLlm::replying(r#"{"is_crisis": false}"#);
        let classifier = LlmClassifier::new(llm, taxonomy(), Duration::from_secs(1));
        assert!(classifier.classify(&msg("Hi", "hello")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn llm_malformed_output_is_error() {
        let llm = StubLlm::replying("I think this is probably fine");
        let classifier = LlmClassifier::new(llm, taxonomy(), Duration::from_secs(1));
        assert!(classifier.classify(&msg("Hi", "hello")).await.is_err());
    }

    #[tokio::test]
    async fn llm_skipped_for_empty_message() {
        let llm = StubLlm::replying(r#"{"is_crisis": true, "type": "Fire Emergency"}"#);
        let classifier = LlmClassifier::new(llm.clone(), taxonomy(), Duration::from_secs(1));
        assert!(classifier.classify(&msg("", "  ")).await.unwrap().is_none());
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn llm_timeout_is_error() {
        let llm = StubLlm::slow(Duration::from_secs(5));
        let classifier = LlmClassifier::new(llm, taxonomy(), Duration::from_millis(100));
        match classifier.classify(&msg("Fire", "fire")).await {
            Err(PipelineError::Llm(LlmError::Timeout { .. })) => {}
            other => panic!("Expected timeout, got {:?}", other.map(|c| c.is_some())),
        }
    }

    // ── Composite ───────────────────────────────────────────────────

    #[tokio::test]
    async fn composite_prefers_ai_verdict() {
        let llm = StubLlm::replying(r#"{"is_crisis": true, "type": "Health Inspection"}"#);
        let classifier = CrisisClassifier::with_llm(llm, taxonomy(), Duration::from_secs(1));
        // Rules alone would say Staff Resignation
        let c = classifier.classify(&msg("I quit", "")).await.unwrap();
        assert_eq!(c.crisis_type, CrisisType::HealthInspection);
        assert_eq!(c.detection_method, DetectionMethod::Ai);
    }

    #[tokio::test]
    async fn composite_falls_back_on_llm_error() {
        let llm = StubLlm::failing();
        let classifier = CrisisClassifier::with_llm(llm.clone(), taxonomy(), Duration::from_secs(1));
        let c = classifier.classify(&msg("I quit", "")).await.unwrap();
        assert_eq!(c.crisis_type, CrisisType::StaffResignation);
        assert_eq!(c.detection_method, DetectionMethod::Rule);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn composite_falls_back_on_timeout() {
        let llm = StubLlm::slow(Duration::from_secs(5));
        let classifier = CrisisClassifier::with_llm(llm, taxonomy(), Duration::from_millis(50));
        let c = classifier.classify(&msg("Out sick", "")).await.unwrap();
        assert_eq!(c.crisis_type, CrisisType::StaffShortage);
        assert_eq!(c.detection_method, DetectionMethod::Rule);
    }

    #[tokio::test]
    async fn composite_rules_run_when_ai_says_no_crisis() {
        let llm = StubLlm::replying(r#"{"is_crisis": false}"#);
        let classifier = CrisisClassifier::with_llm(llm, taxonomy(), Duration::from_secs(1));
        let c = classifier.classify(&msg("Delivery delay", "")).await.unwrap();
        assert_eq!(c.crisis_type, CrisisType::SupplyChainIssue);
    }

    #[tokio::test]
    async fn composite_rules_only_returns_none_without_keywords() {
        let classifier = CrisisClassifier::rules_only(taxonomy());
        assert!(classifier.classify(&msg("Menu ideas", "tacos?")).await.is_none());
    }

    // ── Parsing ─────────────────────────────────────────────────────

    #[test]
    fn extract_json_with_surrounding_text() {
        let raw = "Verdict: {\"is_crisis\": false} done.";
        assert_eq!(extract_json_object(raw), "{\"is_crisis\": false}");
    }

    #[test]
    fn system_prompt_lists_every_type() {
        let prompt = build_classify_system_prompt();
        for t in CrisisType::ALL {
            assert!(prompt.contains(t.label()));
        }
    }

    #[test]
    fn user_prompt_truncates_body() {
        let prompt = build_classify_user_prompt(&msg("s", &"y".repeat(5000)));
        assert!(prompt.len() < PROMPT_BODY_CHARS + 100);
    }
}
