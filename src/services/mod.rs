pub mod response;
pub mod sonic_api;
pub mod stats;

pub use sonic_api::SonicApiService;
pub use stats::{AggregationMode, UnitOutcome};
