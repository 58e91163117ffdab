//! # Statistics
//!
//! View counting for the statistics companion service: the consumer that
//! increments per-advertisement counters from `statistics.adIsShown`
//! events, the periodic sender that publishes aggregated snapshots, and the
//! advertisements-side listener that receives them.

pub mod counter;
pub mod increment_listener;
pub mod listener;
pub mod sender;

pub use counter::{StatisticsCounter, ViewStatistics};
pub use increment_listener::IncrementCounterListener;
pub use listener::StatisticsListener;
pub use sender::PeriodicStatisticsSender;
