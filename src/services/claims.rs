//! Claim capacity calculations

use crate::types::{ClaimCapacity, ClaimUsage, RcManabar};

/// Manabar fill level in whole percent (0 when max is 0)
pub fn rc_percent(manabar: &RcManabar) -> u8 {
    if manabar.max_mana == 0 {
        return 0;
    }
    let pct = (100.0 * manabar.current_mana as f64 / manabar.max_mana as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// How many accounts the current RC can claim at `estimated_cost` each.
/// Without a positive cost estimate nothing is claimable.
pub fn claim_capacity(manabar: &RcManabar, estimated_cost: Option<f64>) -> ClaimCapacity {
    let cost = estimated_cost.filter(|c| c.is_finite()).unwrap_or(0.0);
    let max_claims = if cost > 0.0 {
        (manabar.current_mana as f64 / cost).floor() as u64
    } else {
        0
    };

    ClaimCapacity {
        current_mana: manabar.current_mana,
        max_mana: manabar.max_mana,
        percent: rc_percent(manabar),
        estimated_cost: cost,
        max_claims,
        sufficient: max_claims > 0,
    }
}

/// Compare the RC actually spent by a claim with the estimate
pub fn claim_usage(rc_before: u64, rc_after: u64, estimated_cost: Option<f64>) -> ClaimUsage {
    let cost = estimated_cost.filter(|c| c.is_finite()).unwrap_or(0.0);
    let rc_used = rc_before as i128 - rc_after as i128;
    let percent_of_estimate = if cost > 0.0 {
        ((rc_used as f64 / cost) * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    };

    ClaimUsage {
        rc_before,
        rc_after,
        rc_used,
        estimated_cost: cost,
        percent_of_estimate,
    }
}

/// Format an integer with thousands separators: 1234567 → "1,234,567"
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a chart value: thousands separators for large values, two
/// decimals for small (typically scaled) ones
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    if value.abs() >= 1000.0 {
        let sign = if value < 0.0 { "-" } else { "" };
        format!("{}{}", sign, format_thousands(value.abs().round() as u64))
    } else {
        format!("{:.2}", value)
    }
}
