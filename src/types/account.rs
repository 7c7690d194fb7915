//! Account resource-credit types

use serde::{Deserialize, Serialize};

/// RC manabar as reported by `/api/rc/:user`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcManabar {
    pub current_mana: u64,
    pub max_mana: u64,
}

/// `rc` field of the account response. On failure the service sends a bare
/// number instead of a manabar object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RcField {
    Manabar(RcManabar),
    Other(serde_json::Value),
}

/// Raw response of `/api/rc/:user`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RcResponse {
    pub success: bool,
    #[serde(default)]
    pub rc: Option<RcField>,
    #[serde(default)]
    pub claims: Option<u64>,
    #[serde(default)]
    pub message: String,
}

/// Validated account RC status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountRc {
    pub manabar: RcManabar,
    /// Pending claimed accounts ready to use
    pub claims: Option<u64>,
}

/// How many accounts the current RC can claim at the latest estimated cost
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClaimCapacity {
    pub current_mana: u64,
    pub max_mana: u64,
    /// Fill level of the manabar, 0-100
    pub percent: u8,
    pub estimated_cost: f64,
    pub max_claims: u64,
    pub sufficient: bool,
}

/// Actual RC spent by a claim compared with the estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClaimUsage {
    pub rc_before: u64,
    pub rc_after: u64,
    /// Signed: regeneration between the two checks can make this negative
    pub rc_used: i128,
    pub estimated_cost: f64,
    /// Actual as a percentage of the estimate, rounded to 2 decimals
    pub percent_of_estimate: f64,
}
