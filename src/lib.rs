pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use config::{resolve_base_url, ClientConfig, Environment};
pub use errors::SonicError;
pub use services::{AggregationMode, SonicApiService};
