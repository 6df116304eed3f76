//! Automation executor.
//!
//! Runs a crisis's automation chain, then its store actions, then commits
//! the compliance impact. A failing step is recorded and never stops the
//! steps after it.

use std::sync::Arc;

use futures::future::join_all;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::automation::handler::{AutomationContext, AutomationHandler};
use crate::automation::registry::HandlerRegistry;
use crate::config::CrisisConfig;
use crate::crisis::types::{AutomationRecord, CrisisCandidate, ExecutionReport, StoreActionOutcome};
use crate::error::AutomationError;
use crate::state::CrisisState;

/// Dispatches crises against the handler registry and commits the results.
pub struct AutomationExecutor {
    registry: Arc<HandlerRegistry>,
    state: Arc<CrisisState>,
    parallel: bool,
    staff_on_roster: usize,
}

impl AutomationExecutor {
    pub fn new(registry: Arc<HandlerRegistry>, state: Arc<CrisisState>, config: &CrisisConfig) -> Self {
        Self {
            registry,
            state,
            parallel: config.parallel_automations,
            staff_on_roster: config.staff_on_roster,
        }
    }

    /// Run automations, store actions and the compliance commit for `candidate`.
    pub async fn execute(&self, candidate: &CrisisCandidate) -> ExecutionReport {
        info!(
            message_id = %candidate.message_id,
            crisis_type = %candidate.crisis_type,
            automations = candidate.automations.len(),
            "Executing crisis automations"
        );

        let results = self.run_chain(candidate).await;
        self.state
            .automation_log
            .append_run(candidate.crisis_type, &candidate.message_id, &results)
            .await;

        let store_actions = self.apply_store_actions(candidate).await;

        let compliance_score = self
            .state
            .compliance
            .update_score(
                candidate.compliance_impact,
                &format!("Crisis: {}", candidate.crisis_type),
            )
            .await;

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(
            message_id = %candidate.message_id,
            succeeded = results.len() - failed,
            failed,
            compliance_score,
            "Crisis automations complete"
        );

        ExecutionReport {
            automations_executed: results.len(),
            results,
            store_actions,
            compliance_score,
        }
    }

    /// One record per chain entry, in chain order.
    pub async fn run_chain(&self, candidate: &CrisisCandidate) -> Vec<AutomationRecord> {
        let ctx = Arc::new(AutomationContext {
            candidate: candidate.clone(),
            staff_on_roster: self.staff_on_roster,
        });

        if self.parallel {
            let handles = candidate.automations.iter().map(|name| {
                let handler = self.registry.get(name);
                let ctx = Arc::clone(&ctx);
                let name = name.clone();
                tokio::spawn(async move { invoke(name, handler, ctx).await })
            });
            // join_all yields in input order regardless of completion order
            join_all(handles)
                .await
                .into_iter()
                .zip(&candidate.automations)
                .map(|(joined, name)| joined.unwrap_or_else(|_| panicked(name)))
                .collect()
        } else {
            let mut records = Vec::with_capacity(candidate.automations.len());
            for name in &candidate.automations {
                let handler = self.registry.get(name);
                let ctx = Arc::clone(&ctx);
                let task_name = name.clone();
                let joined = tokio::spawn(async move { invoke(task_name, handler, ctx).await }).await;
                records.push(joined.unwrap_or_else(|_| panicked(name)));
            }
            records
        }
    }

    async fn apply_store_actions(&self, candidate: &CrisisCandidate) -> Vec<StoreActionOutcome> {
        let mut outcomes = Vec::with_capacity(candidate.store_actions.len());
        for &action in &candidate.store_actions {
            let outcome = match self.state.store.apply(action, candidate).await {
                Ok(detail) => {
                    debug!(action = %action, "Store action applied");
                    StoreActionOutcome {
                        action,
                        success: true,
                        detail: Some(detail),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(action = %action, error = %e, "Store action failed");
                    StoreActionOutcome {
                        action,
                        success: false,
                        detail: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

async fn invoke(
    name: String,
    handler: Option<Arc<dyn AutomationHandler>>,
    ctx: Arc<AutomationContext>,
) -> AutomationRecord {
    let Some(handler) = handler else {
        debug!(automation = %name, "No handler registered, executing generically");
        return AutomationRecord::success(name, json!({ "action": "executed generically" }));
    };

    match handler.run(&ctx).await {
        Ok(detail) => {
            debug!(automation = %name, "Automation succeeded");
            AutomationRecord::success(name, detail)
        }
        Err(e) => {
            warn!(automation = %name, error = %e, "Automation failed");
            AutomationRecord::failed(name, e.to_string())
        }
    }
}

fn panicked(name: &str) -> AutomationRecord {
    let err = AutomationError::Panicked {
        name: name.to_string(),
    };
    warn!(automation = %name, "Automation task panicked");
    AutomationRecord::failed(name, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::automation::handler::FnHandler;
    use crate::crisis::taxonomy::{CrisisTaxonomy, CrisisType, Severity, StoreActionKind, TaxonomyEntry};
    use crate::crisis::types::{AutomationStatus, DetectionMethod, RawMessage};

    /// Sleeps longer the earlier it sits in the chain.
    struct SlowHandler {
        name: &'static str,
        delay_ms: u64,
    }

    #[async_trait]
    impl AutomationHandler for SlowHandler {
        fn name(&self) -> &str {
            self.name
        }

        async fn run(&self, _ctx: &AutomationContext) -> Result<Value, AutomationError> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            Ok(json!({ "slept_ms": self.delay_ms }))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl AutomationHandler for PanickingHandler {
        fn name(&self) -> &str {
            "boom"
        }

        async fn run(&self, _ctx: &AutomationContext) -> Result<Value, AutomationError> {
            panic!("handler bug");
        }
    }

    fn failing(name: &'static str) -> Arc<dyn AutomationHandler> {
        Arc::new(FnHandler::new(name, move |_: &AutomationContext| {
            Err(AutomationError::Failed {
                name: name.to_string(),
                reason: "downstream unavailable".to_string(),
            })
        }))
    }

    fn candidate_for(entry: &TaxonomyEntry) -> CrisisCandidate {
        let msg = RawMessage::new("m-1", "subject", "body", "ops@x");
        CrisisCandidate::from_entry(&msg, entry, entry.default_severity, vec![], DetectionMethod::Manual)
    }

    fn executor(registry: HandlerRegistry, parallel: bool) -> (AutomationExecutor, Arc<CrisisState>) {
        let config = CrisisConfig {
            parallel_automations: parallel,
            ..CrisisConfig::default()
        };
        let state = Arc::new(CrisisState::new(&config));
        (
            AutomationExecutor::new(Arc::new(registry), Arc::clone(&state), &config),
            state,
        )
    }

    const FIVE: &[&str] = &["a_one", "a_two", "a_three", "a_four", "a_five"];

    fn five_step_entry() -> TaxonomyEntry {
        TaxonomyEntry {
            keyword: "test",
            crisis_type: CrisisType::GeneralEmergency,
            default_severity: Severity::High,
            automations: FIVE,
            compliance_impact: -4,
            store_actions: &[],
        }
    }

    #[tokio::test]
    async fn failure_in_middle_does_not_stop_chain() {
        for parallel in [true, false] {
            let mut registry = HandlerRegistry::new();
            registry.register(failing("a_three"));
            let (executor, state) = executor(registry, parallel);

            let report = executor.execute(&candidate_for(&five_step_entry())).await;
            let names: Vec<_> = report.results.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, FIVE);
            let statuses: Vec<_> = report.results.iter().map(|r| r.status).collect();
            assert_eq!(
                statuses,
                vec![
                    AutomationStatus::Success,
                    AutomationStatus::Success,
                    AutomationStatus::Failed,
                    AutomationStatus::Success,
                    AutomationStatus::Success,
                ]
            );
            assert_eq!(
                report.results[2].detail["error"],
                "Automation a_three failed: downstream unavailable"
            );
            // Compliance still committed
            assert_eq!(report.compliance_score, 96);
            assert_eq!(state.compliance.score().await, 96);
        }
    }

    #[tokio::test]
    async fn unregistered_names_execute_generically() {
        let (executor, _) = executor(HandlerRegistry::new(), true);
        let records = executor.run_chain(&candidate_for(&five_step_entry())).await;
        assert!(records.iter().all(|r| r.is_success()));
        assert_eq!(records[0].detail["action"], "executed generically");
    }

    #[tokio::test]
    async fn parallel_results_keep_chain_order() {
        let mut registry = HandlerRegistry::new();
        for (i, name) in FIVE.iter().copied().enumerate() {
            registry.register(Arc::new(SlowHandler {
                name,
                delay_ms: (5 - i as u64) * 20,
            }));
        }
        let (executor, state) = executor(registry, true);
        let candidate = candidate_for(&five_step_entry());
        let report = executor.execute(&candidate).await;

        let names: Vec<_> = report.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, FIVE);
        let logged: Vec<_> = state
            .automation_log
            .snapshot()
            .await
            .into_iter()
            .map(|e| e.record.name)
            .collect();
        assert_eq!(logged, FIVE);
    }

    #[tokio::test]
    async fn panicking_handler_recorded_as_failed() {
        let entry = TaxonomyEntry {
            automations: &["before", "boom", "after"],
            ..five_step_entry()
        };
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(PanickingHandler));
        let (executor, _) = executor(registry, false);

        let records = executor.run_chain(&candidate_for(&entry)).await;
        assert_eq!(records.len(), 3);
        assert!(records[0].is_success());
        assert_eq!(records[1].status, AutomationStatus::Failed);
        assert_eq!(records[1].detail["error"], "Automation boom panicked");
        assert!(records[2].is_success());
    }

    #[tokio::test]
    async fn same_type_dispatches_identically_every_time() {
        let (executor, _) = executor(HandlerRegistry::with_builtins(), true);
        let taxonomy = CrisisTaxonomy::standard();
        let entry = taxonomy.entry_for_type(CrisisType::StaffResignation).unwrap();
        let expected: Vec<String> = entry.automations.iter().map(|s| s.to_string()).collect();

        for _ in 0..5 {
            let records = executor.run_chain(&candidate_for(entry)).await;
            let names: Vec<_> = records.into_iter().map(|r| r.name).collect();
            assert_eq!(names, expected);
        }
    }

    #[tokio::test]
    async fn store_actions_applied_after_chain() {
        let (executor, state) = executor(HandlerRegistry::with_builtins(), true);
        let taxonomy = CrisisTaxonomy::standard();
        let entry = taxonomy.entry_for_type(CrisisType::FireEmergency).unwrap();

        let report = executor.execute(&candidate_for(entry)).await;
        assert_eq!(report.store_actions.len(), 1);
        assert_eq!(report.store_actions[0].action, StoreActionKind::TemporaryClosure);
        assert!(report.store_actions[0].success);
        assert!(state.store.snapshot().await.closed);
        assert_eq!(report.compliance_score, 80);
    }

    #[tokio::test]
    async fn zero_impact_leaves_history_empty() {
        let (executor, state) = executor(HandlerRegistry::with_builtins(), false);
        let taxonomy = CrisisTaxonomy::standard();
        let entry = taxonomy.entry_for_type(CrisisType::HealthInspection).unwrap();

        let report = executor.execute(&candidate_for(entry)).await;
        assert_eq!(report.compliance_score, 100);
        assert!(state.compliance.history().await.is_empty());
    }
}
