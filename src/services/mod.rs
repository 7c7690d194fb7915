//! Services for fetching, aggregating and shaping claim-cost data

pub mod aggregator;
pub mod api;
pub mod chart;
pub mod claims;
pub mod samples;

pub use aggregator::TimeSeriesAggregator;
pub use api::ApiClient;
pub use chart::{ChartData, ChartOptions, ChartPayload, ViewRange};
pub use samples::samples_from_history;
