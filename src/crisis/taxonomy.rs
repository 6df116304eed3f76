//! Crisis taxonomy registry.
//!
//! An explicitly ordered table of keyword → crisis entries. Order matters
//! twice: keyword tie-breaks (first defined wins) and type lookup (first
//! entry of a type wins).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a crisis. Ordering follows the severity rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Numeric rank: LOW=1, MEDIUM=2, HIGH=3.
    pub fn rank(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    /// Case-insensitive parse of `LOW` / `MEDIUM` / `HIGH`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized crisis types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrisisType {
    #[serde(rename = "Staff Resignation")]
    StaffResignation,
    #[serde(rename = "Staff Departure")]
    StaffDeparture,
    #[serde(rename = "Staff Shortage")]
    StaffShortage,
    #[serde(rename = "General Emergency")]
    GeneralEmergency,
    #[serde(rename = "Equipment Failure")]
    EquipmentFailure,
    #[serde(rename = "Supply Chain Issue")]
    SupplyChainIssue,
    #[serde(rename = "Inventory Emergency")]
    InventoryEmergency,
    #[serde(rename = "Customer Issue")]
    CustomerIssue,
    #[serde(rename = "Health Inspection")]
    HealthInspection,
    #[serde(rename = "Compliance Issue")]
    ComplianceIssue,
    #[serde(rename = "Fire Emergency")]
    FireEmergency,
    #[serde(rename = "Water Damage")]
    WaterDamage,
}

impl CrisisType {
    pub const ALL: [CrisisType; 12] = [
        Self::StaffResignation,
        Self::StaffDeparture,
        Self::StaffShortage,
        Self::GeneralEmergency,
        Self::EquipmentFailure,
        Self::SupplyChainIssue,
        Self::InventoryEmergency,
        Self::CustomerIssue,
        Self::HealthInspection,
        Self::ComplianceIssue,
        Self::FireEmergency,
        Self::WaterDamage,
    ];

    /// Human-readable label, e.g. "Staff Resignation".
    pub fn label(self) -> &'static str {
        match self {
            Self::StaffResignation => "Staff Resignation",
            Self::StaffDeparture => "Staff Departure",
            Self::StaffShortage => "Staff Shortage",
            Self::GeneralEmergency => "General Emergency",
            Self::EquipmentFailure => "Equipment Failure",
            Self::SupplyChainIssue => "Supply Chain Issue",
            Self::InventoryEmergency => "Inventory Emergency",
            Self::CustomerIssue => "Customer Issue",
            Self::HealthInspection => "Health Inspection",
            Self::ComplianceIssue => "Compliance Issue",
            Self::FireEmergency => "Fire Emergency",
            Self::WaterDamage => "Water Damage",
        }
    }

    /// Parse a label (case- and whitespace-insensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = normalize_label(label);
        Self::ALL
            .into_iter()
            .find(|t| normalize_label(t.label()) == wanted)
    }
}

impl fmt::Display for CrisisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize_label(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Named store mutations a crisis may trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreActionKind {
    PostJob,
    MenuUpdate,
    Promotion,
    TemporaryClosure,
    EmergencyNotice,
    OutOfStockNotice,
    LimitedAvailability,
}

impl StoreActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PostJob => "post_job",
            Self::MenuUpdate => "menu_update",
            Self::Promotion => "promotion",
            Self::TemporaryClosure => "temporary_closure",
            Self::EmergencyNotice => "emergency_notice",
            Self::OutOfStockNotice => "out_of_stock_notice",
            Self::LimitedAvailability => "limited_availability",
        }
    }
}

impl fmt::Display for StoreActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the taxonomy. Static; never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxonomyEntry {
    /// Lower-case trigger keyword scanned for by the rule classifier.
    pub keyword: &'static str,
    pub crisis_type: CrisisType,
    pub default_severity: Severity,
    /// Automation chain, executed in this order.
    pub automations: &'static [&'static str],
    /// Signed score delta applied to the compliance ledger.
    pub compliance_impact: i32,
    pub store_actions: &'static [StoreActionKind],
}

/// Chain used when an AI verdict names a type with no entry of its own.
const FALLBACK_AUTOMATIONS: &[&str] = &["manager_notification", "staff_alert", "incident_report"];

const RESIGNATION_CHAIN: &[&str] = &[
    "emergency_hiring",
    "schedule_adjustment",
    "staff_alert",
    "manager_notification",
    "payroll_update",
    "access_revocation",
    "exit_documentation",
    "post_job_website",
];

use StoreActionKind::*;

static STANDARD_ENTRIES: &[TaxonomyEntry] = &[
    TaxonomyEntry {
        keyword: "resign",
        crisis_type: CrisisType::StaffResignation,
        default_severity: Severity::High,
        automations: RESIGNATION_CHAIN,
        compliance_impact: -5,
        store_actions: &[PostJob],
    },
    TaxonomyEntry {
        keyword: "quit",
        crisis_type: CrisisType::StaffResignation,
        default_severity: Severity::High,
        automations: RESIGNATION_CHAIN,
        compliance_impact: -5,
        store_actions: &[PostJob],
    },
    TaxonomyEntry {
        keyword: "leaving",
        crisis_type: CrisisType::StaffDeparture,
        default_severity: Severity::Medium,
        automations: &[
            "schedule_adjustment",
            "manager_notification",
            "staffing_forecast",
            "post_job_website",
        ],
        compliance_impact: -2,
        store_actions: &[PostJob],
    },
    TaxonomyEntry {
        keyword: "sick",
        crisis_type: CrisisType::StaffShortage,
        default_severity: Severity::Medium,
        automations: &[
            "schedule_adjustment",
            "staff_alert",
            "shift_coverage_request",
            "manager_notification",
        ],
        compliance_impact: -1,
        store_actions: &[],
    },
    TaxonomyEntry {
        keyword: "emergency",
        crisis_type: CrisisType::GeneralEmergency,
        default_severity: Severity::High,
        automations: &[
            "staff_alert",
            "manager_notification",
            "emergency_protocol",
            "safety_check",
            "incident_report",
            "emergency_contacts",
        ],
        compliance_impact: -10,
        store_actions: &[EmergencyNotice],
    },
    TaxonomyEntry {
        keyword: "broken",
        crisis_type: CrisisType::EquipmentFailure,
        default_severity: Severity::High,
        automations: &[
            "equipment_repair_request",
            "menu_adjustment",
            "manager_notification",
            "vendor_contact",
            "warranty_check",
            "safety_lockout",
        ],
        compliance_impact: -8,
        store_actions: &[MenuUpdate],
    },
    TaxonomyEntry {
        keyword: "malfunction",
        crisis_type: CrisisType::EquipmentFailure,
        default_severity: Severity::High,
        automations: &[
            "equipment_repair_request",
            "vendor_contact",
            "menu_adjustment",
            "tech_dispatch",
        ],
        compliance_impact: -5,
        store_actions: &[MenuUpdate],
    },
    TaxonomyEntry {
        keyword: "delay",
        crisis_type: CrisisType::SupplyChainIssue,
        default_severity: Severity::Medium,
        automations: &[
            "emergency_supplier_order",
            "menu_adjustment",
            "backup_vendor_search",
            "inventory_reallocation",
        ],
        compliance_impact: -3,
        store_actions: &[MenuUpdate, OutOfStockNotice],
    },
    TaxonomyEntry {
        keyword: "shortage",
        crisis_type: CrisisType::InventoryEmergency,
        default_severity: Severity::High,
        automations: &[
            "emergency_supplier_order",
            "menu_adjustment",
            "backup_vendor_search",
            "inventory_alert",
            "pos_menu_update",
            "delivery_prioritization",
        ],
        compliance_impact: -5,
        store_actions: &[MenuUpdate, LimitedAvailability],
    },
    TaxonomyEntry {
        keyword: "complaint",
        crisis_type: CrisisType::CustomerIssue,
        default_severity: Severity::Medium,
        automations: &[
            "customer_response",
            "manager_notification",
            "service_recovery",
            "quality_review",
        ],
        compliance_impact: -2,
        store_actions: &[Promotion],
    },
    TaxonomyEntry {
        keyword: "inspection",
        crisis_type: CrisisType::HealthInspection,
        default_severity: Severity::High,
        automations: &[
            "compliance_check",
            "staff_briefing",
            "documentation_prep",
            "cleaning_protocol",
            "temp_log_review",
            "manager_notification",
        ],
        // Neutral until the inspection result arrives.
        compliance_impact: 0,
        store_actions: &[],
    },
    TaxonomyEntry {
        keyword: "violation",
        crisis_type: CrisisType::ComplianceIssue,
        default_severity: Severity::High,
        automations: &[
            "compliance_check",
            "corrective_action",
            "documentation_update",
            "staff_retraining",
            "manager_notification",
        ],
        compliance_impact: -15,
        store_actions: &[],
    },
    TaxonomyEntry {
        keyword: "fire",
        crisis_type: CrisisType::FireEmergency,
        default_severity: Severity::High,
        automations: &[
            "emergency_protocol",
            "emergency_contacts",
            "staff_alert",
            "manager_notification",
            "incident_report",
            "insurance_notification",
        ],
        compliance_impact: -20,
        store_actions: &[TemporaryClosure],
    },
    TaxonomyEntry {
        keyword: "flood",
        crisis_type: CrisisType::WaterDamage,
        default_severity: Severity::High,
        automations: &[
            "emergency_protocol",
            "equipment_repair_request",
            "insurance_notification",
            "vendor_contact",
            "incident_report",
        ],
        compliance_impact: -15,
        store_actions: &[TemporaryClosure],
    },
];

/// Ordered crisis taxonomy.
#[derive(Debug, Clone)]
pub struct CrisisTaxonomy {
    entries: Vec<TaxonomyEntry>,
}

impl CrisisTaxonomy {
    /// The built-in restaurant taxonomy.
    pub fn standard() -> Self {
        Self {
            entries: STANDARD_ENTRIES.to_vec(),
        }
    }

    /// Build a taxonomy from explicit entries (tests, alternate deployments).
    pub fn from_entries(entries: Vec<TaxonomyEntry>) -> Self {
        Self { entries }
    }

    /// All entries in registry order.
    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    /// First entry of the given type.
    pub fn entry_for_type(&self, crisis_type: CrisisType) -> Option<&TaxonomyEntry> {
        self.entries.iter().find(|e| e.crisis_type == crisis_type)
    }

    /// Entry for `crisis_type`, or a synthetic General Emergency entry
    /// carrying the generic fallback chain when the type has no row.
    pub fn entry_or_fallback(&self, crisis_type: CrisisType) -> TaxonomyEntry {
        if let Some(entry) = self.entry_for_type(crisis_type) {
            return entry.clone();
        }
        self.entry_for_type(CrisisType::GeneralEmergency)
            .cloned()
            .unwrap_or(TaxonomyEntry {
                keyword: "",
                crisis_type: CrisisType::GeneralEmergency,
                default_severity: Severity::High,
                automations: FALLBACK_AUTOMATIONS,
                compliance_impact: -5,
                store_actions: &[],
            })
    }

    /// Entries whose keyword occurs in `text` (already lower-cased), in registry order.
    pub fn matching<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a TaxonomyEntry> + 'a {
        self.entries.iter().filter(move |e| text.contains(e.keyword))
    }
}

impl Default for CrisisTaxonomy {
    fn default() -> Self {
        Self::standard()
    }
}
