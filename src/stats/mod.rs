//! Descriptive statistics over collected measurements

pub mod aggregator;
pub mod summary;

pub use aggregator::{AggregateConfig, StatisticRecord, StatisticsAggregator};
pub use summary::SizeSummary;
