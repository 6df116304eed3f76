//! Store state manager — the only writer of storefront state.
//!
//! Every action appends a line to the activity feed. Actions are not
//! idempotent: posting a job twice yields two postings.

use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::crisis::taxonomy::StoreActionKind;
use crate::crisis::types::{ActivityCategory, ActivityLevel, CrisisCandidate};
use crate::error::AutomationError;
use crate::ledger::{ActivityFeed, BoundedLog};
use crate::storefront::state::{
    JobPosting, JobStatus, NoticeKind, Product, Promotion, PromotionScope, StoreNotice, StoreState,
    default_menu,
};

/// Postings and notices kept on the storefront.
const MAX_JOB_POSTINGS: usize = 50;
const MAX_NOTICES: usize = 50;

/// Discount applied by the customer-recovery promotion.
pub const RECOVERY_DISCOUNT_PCT: u32 = 15;

const DEFAULT_ROLE: &str = "Staff Member";

/// Menu-name words shorter than this never match message text.
const MIN_MATCH_WORD_LEN: usize = 4;

struct StoreInner {
    products: Vec<Product>,
    promotion: Option<Promotion>,
    job_postings: BoundedLog<JobPosting>,
    notices: BoundedLog<StoreNotice>,
    closed: bool,
    next_job_id: u64,
    next_notice_id: u64,
}

impl StoreInner {
    fn push_notice(&mut self, kind: NoticeKind, message: String) -> StoreNotice {
        let notice = StoreNotice {
            id: self.next_notice_id,
            kind,
            message,
            posted_at: Utc::now(),
        };
        self.next_notice_id += 1;
        self.notices.push(notice.clone());
        notice
    }
}

/// Owns the storefront and exposes named actions on it.
pub struct StoreManager {
    inner: RwLock<StoreInner>,
    activity: Arc<ActivityFeed>,
}

impl StoreManager {
    /// A store seeded with the default menu.
    pub fn new(activity: Arc<ActivityFeed>) -> Self {
        Self::with_products(default_menu(), activity)
    }

    pub fn with_products(products: Vec<Product>, activity: Arc<ActivityFeed>) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                products,
                promotion: None,
                job_postings: BoundedLog::new(MAX_JOB_POSTINGS),
                notices: BoundedLog::new(MAX_NOTICES),
                closed: false,
                next_job_id: 1,
                next_notice_id: 1,
            }),
            activity,
        }
    }

    /// Append a job posting for `role_hint` ("Staff Member" when blank).
    pub async fn post_job(&self, role_hint: &str) -> JobPosting {
        let role = match role_hint.trim() {
            "" => DEFAULT_ROLE,
            r => r,
        };

        let posting = {
            let mut inner = self.inner.write().await;
            let posting = JobPosting {
                id: inner.next_job_id,
                role: role.to_string(),
                title: format!("Now Hiring: {role}"),
                description: format!("We're looking for a talented {role} to join our team!"),
                posted_at: Utc::now(),
                status: JobStatus::Active,
            };
            inner.next_job_id += 1;
            inner.job_postings.push(posting.clone());
            posting
        };

        info!(job_id = posting.id, role = %posting.role, "Job posting created");
        self.activity
            .record(
                ActivityCategory::Store,
                format!("Job posting created: {role}"),
                ActivityLevel::Info,
            )
            .await;
        posting
    }

    /// Mark the given products (un)available. Returns the ids actually changed.
    pub async fn adjust_menu_availability(&self, item_ids: &[u32], available: bool) -> Vec<u32> {
        let changed: Vec<u32> = {
            let mut inner = self.inner.write().await;
            inner
                .products
                .iter_mut()
                .filter(|p| item_ids.contains(&p.id) && p.available != available)
                .map(|p| {
                    p.available = available;
                    p.id
                })
                .collect()
        };

        let message = if changed.is_empty() {
            "Menu reviewed; no items changed".to_string()
        } else if available {
            format!("Menu updated: {} item(s) back in stock", changed.len())
        } else {
            format!("Menu updated: {} item(s) marked unavailable", changed.len())
        };
        debug!(?changed, available, "Menu availability adjusted");
        self.activity
            .record(ActivityCategory::Store, message, ActivityLevel::Warning)
            .await;
        changed
    }

    /// Discount every product in `scope` not already on sale.
    pub async fn launch_promotion(
        &self,
        discount_pct: u32,
        scope: PromotionScope,
        reason: &str,
    ) -> Result<Promotion, AutomationError> {
        if discount_pct == 0 || discount_pct > 100 {
            return Err(AutomationError::StoreAction {
                action: StoreActionKind::Promotion.to_string(),
                reason: format!("discount must be 1-100%, got {discount_pct}%"),
            });
        }

        let (promotion, discounted) = {
            let mut inner = self.inner.write().await;
            let mut discounted = 0usize;
            for product in inner.products.iter_mut().filter(|p| scope.covers(p) && !p.on_sale()) {
                product.original_price = Some(product.price);
                product.price = discounted_price(product.price, discount_pct);
                product.discount_pct = discount_pct;
                discounted += 1;
            }
            let promotion = Promotion {
                discount_pct,
                scope,
                reason: reason.to_string(),
                started_at: Utc::now(),
            };
            inner.promotion = Some(promotion.clone());
            (promotion, discounted)
        };

        info!(
            discount_pct,
            scope = promotion.scope.label(),
            reason,
            discounted,
            "Promotion launched"
        );
        self.activity
            .record(
                ActivityCategory::Store,
                format!(
                    "Promotion activated: {discount_pct}% off {}",
                    promotion.scope.label()
                ),
                ActivityLevel::Info,
            )
            .await;
        Ok(promotion)
    }

    /// End the active promotion and restore original prices. Returns the number restored.
    pub async fn end_promotions(&self) -> usize {
        let restored = {
            let mut inner = self.inner.write().await;
            let mut restored = 0usize;
            for product in inner.products.iter_mut() {
                if let Some(original) = product.original_price.take() {
                    product.price = original;
                    product.discount_pct = 0;
                    restored += 1;
                }
            }
            inner.promotion = None;
            restored
        };

        self.activity
            .record(
                ActivityCategory::Store,
                "All promotions ended, prices restored",
                ActivityLevel::Info,
            )
            .await;
        restored
    }

    /// Post a closure banner and mark the store closed.
    pub async fn post_temporary_closure_notice(&self, reason: &str) -> StoreNotice {
        let notice = {
            let mut inner = self.inner.write().await;
            inner.closed = true;
            inner.push_notice(
                NoticeKind::TemporaryClosure,
                format!("Temporarily closed: {reason}"),
            )
        };

        warn!(reason, "Store temporarily closed");
        self.activity
            .record(
                ActivityCategory::Store,
                "Temporary closure notice posted",
                ActivityLevel::Error,
            )
            .await;
        notice
    }

    /// Post a customer-facing banner.
    pub async fn post_notice(&self, kind: NoticeKind, message: impl Into<String>) -> StoreNotice {
        let notice = self.inner.write().await.push_notice(kind, message.into());

        let level = match kind {
            NoticeKind::Emergency | NoticeKind::TemporaryClosure => ActivityLevel::Error,
            NoticeKind::OutOfStock | NoticeKind::LimitedAvailability => ActivityLevel::Warning,
        };
        self.activity
            .record(
                ActivityCategory::Store,
                format!("Notice posted: {}", notice.message),
                level,
            )
            .await;
        notice
    }

    /// Apply the store action a crisis calls for. Returns a detail payload.
    pub async fn apply(
        &self,
        action: StoreActionKind,
        candidate: &CrisisCandidate,
    ) -> Result<serde_json::Value, AutomationError> {
        let text = format!("{} {}", candidate.source_subject, candidate.source_body);

        let detail = match action {
            StoreActionKind::PostJob => {
                let posting = self.post_job(infer_role(&text)).await;
                json!({ "job_posting_id": posting.id, "title": posting.title })
            }
            StoreActionKind::MenuUpdate => {
                let ids = self.products_mentioned(&text).await?;
                let changed = self.adjust_menu_availability(&ids, false).await;
                json!({ "items_unavailable": changed })
            }
            StoreActionKind::Promotion => {
                let promotion = self
                    .launch_promotion(RECOVERY_DISCOUNT_PCT, PromotionScope::All, "customer_recovery")
                    .await?;
                json!({ "discount_pct": promotion.discount_pct, "reason": promotion.reason })
            }
            StoreActionKind::TemporaryClosure => {
                let notice = self
                    .post_temporary_closure_notice(candidate.crisis_type.label())
                    .await;
                json!({ "notice_id": notice.id, "closed": true })
            }
            StoreActionKind::EmergencyNotice => {
                let notice = self
                    .post_notice(
                        NoticeKind::Emergency,
                        format!("{}: service may be affected", candidate.crisis_type),
                    )
                    .await;
                json!({ "notice_id": notice.id })
            }
            StoreActionKind::OutOfStockNotice => {
                let notice = self
                    .post_notice(
                        NoticeKind::OutOfStock,
                        "Some items are temporarily out of stock",
                    )
                    .await;
                json!({ "notice_id": notice.id })
            }
            StoreActionKind::LimitedAvailability => {
                let notice = self
                    .post_notice(
                        NoticeKind::LimitedAvailability,
                        "Limited availability on some menu items today",
                    )
                    .await;
                json!({ "notice_id": notice.id })
            }
        };
        Ok(detail)
    }

    /// Ids of products whose name words appear as whole words in `text`.
    async fn products_mentioned(&self, text: &str) -> Result<Vec<u32>, AutomationError> {
        let inner = self.inner.read().await;
        let mut ids = Vec::new();
        for product in &inner.products {
            let words: Vec<String> = product
                .name
                .split_whitespace()
                .filter(|w| w.chars().count() >= MIN_MATCH_WORD_LEN)
                .map(regex::escape)
                .collect();
            if words.is_empty() {
                continue;
            }
            let pattern = format!(r"(?i)\b(?:{})\b", words.join("|"));
            let re = Regex::new(&pattern).map_err(|e| AutomationError::StoreAction {
                action: StoreActionKind::MenuUpdate.to_string(),
                reason: e.to_string(),
            })?;
            if re.is_match(text) {
                ids.push(product.id);
            }
        }
        Ok(ids)
    }

    pub async fn snapshot(&self) -> StoreState {
        let inner = self.inner.read().await;
        StoreState {
            products: inner.products.clone(),
            active_promotion: inner.promotion.clone(),
            job_postings: inner.job_postings.snapshot(),
            notices: inner.notices.snapshot(),
            closed: inner.closed,
        }
    }
}

/// Role named in a departure message: chef, server, manager, else "Staff Member".
pub fn infer_role(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("chef") {
        "Chef"
    } else if lower.contains("server") {
        "Server"
    } else if lower.contains("manager") {
        "Manager"
    } else {
        DEFAULT_ROLE
    }
}

fn discounted_price(price: Decimal, discount_pct: u32) -> Decimal {
    (price * Decimal::from(100 - discount_pct) / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
