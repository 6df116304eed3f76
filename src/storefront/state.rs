//! Storefront data: menu, promotions, job postings, notices.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// A menu item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    /// Price before the active promotion, set only while on sale.
    pub original_price: Option<Decimal>,
    pub discount_pct: u32,
    pub featured: bool,
    pub available: bool,
}

impl Product {
    fn new(id: u32, name: &str, category: &str, cents: i64, featured: bool) -> Self {
        Self {
            id,
            name: name.to_string(),
            category: category.to_string(),
            price: Decimal::new(cents, 2),
            original_price: None,
            discount_pct: 0,
            featured,
            available: true,
        }
    }

    pub fn on_sale(&self) -> bool {
        self.original_price.is_some()
    }
}

/// Which products a promotion discounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionScope {
    All,
    Category(String),
}

impl PromotionScope {
    pub fn covers(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Category(c) => product.category.eq_ignore_ascii_case(c),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::All => "all",
            Self::Category(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Promotion {
    pub discount_pct: u32,
    pub scope: PromotionScope,
    pub reason: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobPosting {
    pub id: u64,
    pub role: String,
    pub title: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Emergency,
    TemporaryClosure,
    OutOfStock,
    LimitedAvailability,
}

/// A customer-facing banner posted on the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreNotice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub posted_at: DateTime<Utc>,
}

/// Snapshot of the storefront.
#[derive(Debug, Clone, Serialize)]
pub struct StoreState {
    pub products: Vec<Product>,
    pub active_promotion: Option<Promotion>,
    pub job_postings: Vec<JobPosting>,
    pub notices: Vec<StoreNotice>,
    pub closed: bool,
}

/// The nine-item starting menu.
pub fn default_menu() -> Vec<Product> {
    vec![
        Product::new(1, "Classic Burger", "mains", 1299, false),
        Product::new(2, "Buffalo Wings", "appetizers", 1499, true),
        Product::new(3, "Veggie Power Bowl", "healthy", 1199, false),
        Product::new(4, "Loaded Fries", "sides", 699, false),
        Product::new(5, "Iced Lemonade", "drinks", 499, false),
        Product::new(6, "Craft Cola", "drinks", 399, false),
        Product::new(7, "Spicy Chicken Sandwich", "mains", 1399, true),
        Product::new(8, "Chocolate Shake", "drinks", 599, false),
        Product::new(9, "Garden Salad", "healthy", 899, false),
    ]
}
