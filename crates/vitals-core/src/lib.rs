pub mod config;
pub mod types;

pub use config::{ConfigError, VitalsConfig, parse_duration};
pub use types::*;
