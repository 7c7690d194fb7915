mod account;
mod chart;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::services::ApiClient;

pub use account::{RcArgs, UsageArgs};
pub use chart::{format_sparkline, latest_line, BucketsArgs, ChartArgs};

/// Track the RC cost of claiming Hive accounts
#[derive(Parser)]
#[command(name = "rctrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Cost service base URL (overrides config and RCTRACK_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    api_url: Option<String>,

    /// Config file (default: ~/.rctrack/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch interactive TUI (default)
    Tui {
        /// Show RC status for this account
        #[arg(long)]
        user: Option<String>,
    },

    /// Print the claim-cost chart for a view range
    Chart(ChartArgs),

    /// Bucket the cost history by an arbitrary interval
    Buckets(BucketsArgs),

    /// Show an account's RC and how many accounts it can claim
    Rc(RcArgs),

    /// Compare RC spent by a claim against the estimated cost
    Usage(UsageArgs),
}

/// Resolved configuration and API client shared by all commands
pub struct Context {
    pub config: Config,
    pub client: ApiClient,
}

impl Context {
    fn new(config: Config) -> crate::types::Result<Self> {
        let client = ApiClient::new(&config.api_url, config.request_timeout())?;
        Ok(Self { config, client })
    }
}

/// Log file for the TUI; no home directory means no file logging
fn tui_log_path(config_dir: crate::types::Result<PathBuf>) -> Option<PathBuf> {
    config_dir.ok().map(|dir| dir.join("rctrack.log"))
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let is_tui = matches!(self.command, None | Some(Commands::Tui { .. }));
        if is_tui {
            if let Some(path) = tui_log_path(Config::config_dir()) {
                crate::logging::init_file(&path);
            }
        } else {
            crate::logging::init_stderr();
        }

        let config = Config::load(self.config.as_deref())?.with_api_url_override(self.api_url);
        let ctx = Context::new(config)?;
        tracing::debug!(api = %ctx.client.base_url(), "configuration loaded");

        match self.command {
            None => run_tui(ctx, None),
            Some(Commands::Tui { user }) => run_tui(ctx, user),
            Some(Commands::Chart(args)) => Ok(args.run(&ctx).await?),
            Some(Commands::Buckets(args)) => Ok(args.run(&ctx).await?),
            Some(Commands::Rc(args)) => Ok(args.run(&ctx).await?),
            Some(Commands::Usage(args)) => Ok(args.run(&ctx).await?),
        }
    }
}

/// The TUI loop is synchronous; HTTP work is spawned onto the current runtime
fn run_tui(ctx: Context, user: Option<String>) -> anyhow::Result<()> {
    let handle = tokio::runtime::Handle::current();
    tokio::task::block_in_place(|| crate::tui::run(ctx, user, handle))
}
