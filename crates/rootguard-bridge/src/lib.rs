mod bridge;
mod config;

pub use bridge::{
    RequestState, SecurityBridge, CHECK_SECURITY_ACTION, COMPROMISED, NOT_COMPROMISED,
};
pub use config::{BridgeConfig, LoggingConfig};
