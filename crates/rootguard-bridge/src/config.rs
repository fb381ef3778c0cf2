mod constants;
mod env;
mod file;
mod paths;
mod types;
mod util;

pub use types::{BridgeConfig, LoggingConfig};
