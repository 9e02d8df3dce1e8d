//! Static plan catalog. Reference data only; purchasing is handled by the
//! session model and no payment gateway is involved.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Max,
}

impl PlanTier {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Pro => "Pro",
            Self::Max => "Max",
        }
    }

    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub tier: PlanTier,
    pub price: &'static str,
    pub credit_grant: u32,
    pub features: &'static [&'static str],
    pub popular: bool,
}

pub const CATALOG: &[Plan] = &[
    Plan {
        tier: PlanTier::Pro,
        price: "$9.99/mo",
        credit_grant: 1000,
        features: &[
            "1000 credits per month",
            "Unlimited daily generations",
            "4K resolution downloads",
            "Faster generation speeds",
            "Access to exclusive styles",
            "No watermarks",
        ],
        popular: true,
    },
    Plan {
        tier: PlanTier::Max,
        price: "$19.99/mo",
        credit_grant: 2500,
        features: &[
            "2500 credits per month",
            "All Pro features",
            "Access to beta models",
            "24/7 support",
        ],
        popular: false,
    },
];

/// Badges shown on the billing screen. Display only.
pub const PAYMENT_BADGES: &[&str] = &["Paytm", "Google Pay", "UPI"];

#[must_use]
pub fn find(tier: PlanTier) -> Option<&'static Plan> {
    CATALOG.iter().find(|plan| plan.tier == tier)
}
