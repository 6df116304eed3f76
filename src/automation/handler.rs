//! Automation handler trait and the built-in handler set.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use crate::crisis::types::CrisisCandidate;
use crate::error::AutomationError;

/// Everything a handler may read about the crisis it serves.
#[derive(Debug, Clone)]
pub struct AutomationContext {
    pub candidate: CrisisCandidate,
    /// Staff headcount for roster-wide notifications.
    pub staff_on_roster: usize,
}

/// One named remediation step.
#[async_trait]
pub trait AutomationHandler: Send + Sync {
    /// Registry key, e.g. `"staff_alert"`.
    fn name(&self) -> &str;

    /// Run the step, returning its detail payload.
    async fn run(&self, ctx: &AutomationContext) -> Result<Value, AutomationError>;
}

/// Handler backed by a synchronous closure.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&AutomationContext) -> Result<Value, AutomationError> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> AutomationHandler for FnHandler<F>
where
    F: Fn(&AutomationContext) -> Result<Value, AutomationError> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &AutomationContext) -> Result<Value, AutomationError> {
        (self.f)(ctx)
    }
}

/// Wrap a fixed payload builder as a handler.
fn fixed(
    name: &'static str,
    detail: fn(&AutomationContext) -> Value,
) -> Arc<dyn AutomationHandler> {
    Arc::new(FnHandler::new(name, move |ctx: &AutomationContext| {
        Ok(detail(ctx))
    }))
}

/// The handlers every deployment starts with.
pub fn builtin_handlers() -> Vec<Arc<dyn AutomationHandler>> {
    vec![
        fixed("emergency_hiring", |_| {
            json!({
                "action": "Posted job listing and contacted staffing agencies",
                "contacts_notified": 5,
                "platforms": ["Indeed", "LinkedIn", "ZipRecruiter"],
            })
        }),
        fixed("schedule_adjustment", |_| {
            json!({
                "action": "Notified available staff for coverage",
                "staff_contacted": 5,
                "confirmed": 3,
            })
        }),
        fixed("staff_alert", |ctx| {
            json!({
                "action": "All staff notified via SMS/Email",
                "recipients": ctx.staff_on_roster,
            })
        }),
        fixed("manager_notification", |_| {
            json!({
                "action": "Manager notified immediately",
                "notification_type": "SMS + Email + Phone",
            })
        }),
        fixed("payroll_update", |_| {
            json!({ "action": "Payroll system updated", "final_pay_calculated": true })
        }),
        fixed("access_revocation", |_| {
            json!({
                "action": "System access scheduled for revocation",
                "systems": ["POS", "Inventory", "Email"],
            })
        }),
        fixed("exit_documentation", |_| {
            json!({
                "action": "Exit documentation prepared",
                "documents": ["Final Paycheck", "Exit Interview", "Reference Letter"],
            })
        }),
        fixed("post_job_website", |_| {
            json!({ "action": "Job posting created on website", "visibility": "public" })
        }),
        fixed("emergency_supplier_order", |_| {
            json!({ "action": "Emergency order placed", "delivery_eta": "3 hours" })
        }),
        fixed("menu_adjustment", |_| {
            json!({ "action": "Menu items updated", "items_affected": 2 })
        }),
        fixed("equipment_repair_request", |_| {
            json!({ "action": "Repair ticket submitted", "priority": "URGENT" })
        }),
        fixed("compliance_check", |_| {
            json!({ "action": "Compliance checklist initiated", "items_to_verify": 47 })
        }),
        fixed("staff_briefing", |ctx| {
            json!({ "action": "Staff briefing scheduled", "attendees": ctx.staff_on_roster })
        }),
        fixed("customer_response", |ctx| {
            json!({
                "action": "Customer response drafted",
                "priority": "HIGH",
                "recipient": ctx.candidate.source_sender,
            })
        }),
        fixed("corrective_action", |_| {
            json!({ "action": "Corrective action plan initiated", "deadline": "24 hours" })
        }),
        fixed("incident_report", |_| {
            json!({
                "action": "Incident report created",
                "report_id": Utc::now().format("INC-%Y%m%d%H%M").to_string(),
            })
        }),
        fixed("emergency_protocol", |_| {
            json!({ "action": "Emergency protocol activated", "response_team_notified": true })
        }),
        fixed("safety_check", |_| {
            json!({
                "action": "Safety inspection initiated",
                "areas_checked": ["Kitchen", "Dining", "Storage"],
            })
        }),
    ]
}
