//! `rctrack rc` and `rctrack usage` subcommands

use clap::Args;
use serde::Serialize;

use super::chart::format_sparkline;
use super::Context;
use crate::services::claims::{claim_capacity, claim_usage, format_amount, format_thousands};
use crate::types::{AccountRc, ClaimCapacity, ClaimUsage, Result, RctrackError};

/// The service only keeps a day of recent costs for the estimate
const ESTIMATE_HOURS: u32 = 24;

const BAR_WIDTH: usize = 30;

/// Check an account's RC
#[derive(Args, Debug)]
pub struct RcArgs {
    /// Hive account name
    pub username: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Compare RC before and after a claim
#[derive(Args, Debug)]
pub struct UsageArgs {
    /// Hive account name
    pub username: String,

    /// RC the account had before the claim
    #[arg(long, value_name = "RC")]
    pub before: u64,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct RcReport<'a> {
    username: &'a str,
    claims: Option<u64>,
    #[serde(flatten)]
    capacity: ClaimCapacity,
}

/// Fetch account RC and the latest cost estimate together.
/// A failed estimate degrades to "no estimate"; a failed account lookup is an error.
async fn fetch_account_and_estimate(
    ctx: &Context,
    username: &str,
) -> Result<(AccountRc, Option<f64>)> {
    let (account, history) = tokio::join!(
        ctx.client.account_rc(username),
        ctx.client.cost_history(ESTIMATE_HOURS)
    );

    let estimate = match history {
        Ok(history) => history.most_recent_cost,
        Err(e) => {
            tracing::warn!(error = %e, "could not fetch claim cost estimate");
            None
        }
    };
    Ok((account?, estimate))
}

impl RcArgs {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let (account, estimate) = fetch_account_and_estimate(ctx, &self.username).await?;
        let capacity = claim_capacity(&account.manabar, estimate);

        if self.json {
            let report = RcReport {
                username: &self.username,
                claims: account.claims,
                capacity,
            };
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| RctrackError::Parse(e.to_string()))?;
            println!("{}", json);
        } else {
            print!("{}", render_rc(&self.username, &capacity, account.claims));
        }
        Ok(())
    }
}

impl UsageArgs {
    pub async fn run(self, ctx: &Context) -> Result<()> {
        let (account, estimate) = fetch_account_and_estimate(ctx, &self.username).await?;
        let usage = claim_usage(self.before, account.manabar.current_mana, estimate);

        if self.json {
            let json = serde_json::to_string_pretty(&usage)
                .map_err(|e| RctrackError::Parse(e.to_string()))?;
            println!("{}", json);
        } else {
            print!("{}", render_usage(&usage));
        }
        Ok(())
    }
}

/// Text rendering of an RC check
pub fn render_rc(username: &str, capacity: &ClaimCapacity, claims: Option<u64>) -> String {
    let current = format_thousands(capacity.current_mana);
    let mut out = format!(
        "{}\nRC: {} / {} ({}%)\n{}\n",
        username,
        current,
        format_thousands(capacity.max_mana),
        capacity.percent,
        format_sparkline(capacity.percent as f64, 100.0, BAR_WIDTH)
    );

    if capacity.sufficient {
        out.push_str(&format!(
            "You have enough RC ({}) to claim {} account(s)!\n",
            current, capacity.max_claims
        ));
    } else {
        out.push_str(&format!(
            "Not enough RC. You have {}, need {} to claim 1 account.\n",
            current,
            format_amount(capacity.estimated_cost)
        ));
    }

    if let Some(n) = claims {
        out.push_str(&format!(
            "You already have {} claimed account{} ready to use.\n",
            n,
            if n == 1 { "" } else { "s" }
        ));
    }
    out
}

/// Text rendering of a claim usage comparison
pub fn render_usage(usage: &ClaimUsage) -> String {
    let used = if usage.rc_used < 0 {
        format!("-{}", format_thousands(usage.rc_used.unsigned_abs() as u64))
    } else {
        format_thousands(usage.rc_used as u64)
    };

    format!(
        "RC Before Claim:   {}\nRC After Claim:    {}\nActual RC Used:    {}\nEstimated RC Cost: {}\n{}\nActual RC used is {}% of estimated cost\n",
        format_thousands(usage.rc_before),
        format_thousands(usage.rc_after),
        used,
        format_amount(usage.estimated_cost),
        format_sparkline(usage.percent_of_estimate, 100.0, BAR_WIDTH),
        usage.percent_of_estimate
    )
}
