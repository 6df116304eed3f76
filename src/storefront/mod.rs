//! Storefront: the small piece of shared business state crises act on.

pub mod manager;
pub mod state;

pub use manager::{RECOVERY_DISCOUNT_PCT, StoreManager, infer_role};
pub use state::{
    JobPosting, JobStatus, NoticeKind, Product, Promotion, PromotionScope, StoreNotice, StoreState,
    default_menu,
};
