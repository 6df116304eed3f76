//! Templated reply text for a handled crisis. Pure; no I/O.

use crate::crisis::taxonomy::CrisisType;
use crate::crisis::types::AutomationRecord;

/// Subject used when the original message had none.
pub const DEFAULT_REPLY_SUBJECT: &str = "Crisis Desk Response";

/// Build the reply body for `crisis_type` listing the executed automations.
///
/// `None` selects the generic template.
pub fn generate_response(crisis_type: Option<CrisisType>, records: &[AutomationRecord]) -> String {
    let actions = summarize_actions(records);

    let Some(crisis_type) = crisis_type else {
        return format!("Your message has been processed. Actions: {actions}.");
    };

    match crisis_type {
        CrisisType::StaffResignation => format!(
            "Thank you for your notice. We have initiated our emergency staffing protocol. \
             Actions taken: {actions}. We've also posted a job opening on our website. \
             Please coordinate with management for your final paperwork."
        ),
        CrisisType::StaffDeparture => format!(
            "Thank you for letting us know. We're adjusting schedules and have posted your position. \
             Actions: {actions}."
        ),
        CrisisType::StaffShortage => format!(
            "Thank you for informing us. We are activating coverage protocols. Actions: {actions}. \
             Please rest and recover."
        ),
        CrisisType::EquipmentFailure => format!(
            "Thank you for the alert. Maintenance protocols activated. Actions: {actions}. \
             A technician will be dispatched shortly."
        ),
        CrisisType::SupplyChainIssue => format!(
            "We acknowledge the supply issue. Actions: {actions}. We've contacted backup suppliers."
        ),
        CrisisType::InventoryEmergency => format!(
            "Inventory alert received. Actions: {actions}. Menu has been adjusted accordingly."
        ),
        CrisisType::CustomerIssue => format!(
            "Thank you for bringing this to our attention. Actions: {actions}. \
             A manager will follow up."
        ),
        CrisisType::HealthInspection => format!(
            "Inspection notice received. Actions: {actions}. All staff have been briefed."
        ),
        CrisisType::ComplianceIssue => format!(
            "Compliance matter acknowledged. Actions: {actions}. Corrective measures underway."
        ),
        CrisisType::GeneralEmergency => format!(
            "Emergency notification received. Actions: {actions}. Our team is responding."
        ),
        CrisisType::FireEmergency => format!(
            "Fire emergency acknowledged. Emergency services have been notified. Actions: {actions}."
        ),
        CrisisType::WaterDamage => format!(
            "Water damage reported. Emergency response activated. Actions: {actions}."
        ),
    }
}

/// Reply subject for an original subject line.
pub fn reply_subject(original: &str) -> String {
    let original = original.trim();
    if original.is_empty() {
        DEFAULT_REPLY_SUBJECT.to_string()
    } else {
        format!("Re: {original}")
    }
}

/// "emergency_hiring" → "Emergency Hiring", comma-joined in record order.
fn summarize_actions(records: &[AutomationRecord]) -> String {
    records
        .iter()
        .map(|r| title_case(&r.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
