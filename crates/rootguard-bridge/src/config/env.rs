use tracing::warn;

use super::types::BridgeConfig;
use super::util::{env_non_empty, parse_bool, parse_ports};

impl BridgeConfig {
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_posture();
        self.apply_env_logging();
    }

    fn apply_env_posture(&mut self) {
        if let Some(v) = env_non_empty("ROOTGUARD_PROBE_TIMEOUT_MS") {
            match v.trim().parse::<u64>() {
                Ok(parsed) if parsed > 0 => self.posture.probe_timeout_ms = parsed,
                _ => warn!(value = %v, "ignoring invalid ROOTGUARD_PROBE_TIMEOUT_MS"),
            }
        }
        if let Some(v) = env_non_empty("ROOTGUARD_LOOPBACK_HOST") {
            self.posture.loopback_host = v.trim().to_string();
        }
        if let Some(v) = env_non_empty("ROOTGUARD_INSTRUMENTATION_PORTS") {
            match parse_ports(&v) {
                Some(ports) if !ports.is_empty() => self.posture.instrumentation_ports = ports,
                _ => warn!(value = %v, "ignoring invalid ROOTGUARD_INSTRUMENTATION_PORTS"),
            }
        }
    }

    fn apply_env_logging(&mut self) {
        if let Some(enabled) = env_non_empty("ROOTGUARD_LOG_ENABLED").and_then(|v| parse_bool(&v)) {
            self.logging.enabled = enabled;
        }
    }
}
