//! VirtualModel / ConcreteModel / Tier / ProviderTag (spec §3, §4.5).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Monotonically ordered by expected cost and capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Local,
    FastCheap,
    Balanced,
    Powerful,
}

impl Tier {
    /// One-step downgrade per spec §4.4 step 5: powerful -> balanced ->
    /// fast_cheap; local is unaffected.
    pub fn downgrade_one(self) -> Tier {
        match self {
            Tier::Powerful => Tier::Balanced,
            Tier::Balanced => Tier::FastCheap,
            Tier::FastCheap => Tier::FastCheap,
            Tier::Local => Tier::Local,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTag {
    DirectCommercial,
    CompliantCloud,
    SelfHosted,
}

impl ProviderTag {
    pub fn is_direct_commercial(self) -> bool {
        matches!(self, ProviderTag::DirectCommercial)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Failing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcreteModel {
    pub model_id: String,
    pub provider_tag: ProviderTag,
    pub capabilities: BTreeSet<String>,
    pub tier: Tier,
    pub input_price_per_mtok: Decimal,
    pub output_price_per_mtok: Decimal,
    pub context_window: u32,
    #[serde(skip)]
    pub health: HealthState,
}

impl ConcreteModel {
    pub fn covers_capabilities(&self, required: &BTreeSet<String>) -> bool {
        required.is_subset(&self.capabilities)
    }
}

/// An abstract identifier such as `rb://fast_cheap_code` resolving to an
/// ordered preference list of concrete models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualModel {
    pub id: String,
    pub preference_list: Vec<String>,
}

pub const VIRTUAL_MODEL_PREFIX: &str = "rb://";

pub fn is_virtual_model(id: &str) -> bool {
    id.starts_with(VIRTUAL_MODEL_PREFIX)
}
