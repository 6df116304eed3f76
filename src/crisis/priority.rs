//! Priority resolution among candidates detected in one batch.

use tracing::info;

use crate::crisis::types::CrisisCandidate;

/// Select the candidate to act on.
///
/// Highest severity rank wins; equal ranks keep detection order, so the
/// earliest-detected candidate of the top rank is chosen. Everything else
/// is dropped for this batch.
pub fn resolve_priority(candidates: Vec<CrisisCandidate>) -> Option<CrisisCandidate> {
    let total = candidates.len();

    let mut selected: Option<CrisisCandidate> = None;
    for candidate in candidates {
        let outranks = selected
            .as_ref()
            .is_none_or(|s| candidate.severity.rank() > s.severity.rank());
        if outranks {
            selected = Some(candidate);
        }
    }

    if let Some(chosen) = &selected
        && total > 1
    {
        info!(
            selected = %chosen.message_id,
            crisis_type = %chosen.crisis_type,
            discarded = total - 1,
            "Multiple crises in batch, acting on highest priority"
        );
    }

    selected
}
