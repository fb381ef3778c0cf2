use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Wall-clock budget for every external command and every port connect.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_LOOPBACK_HOST: &str = "127.0.0.1";
pub const DEFAULT_INSTRUMENTATION_PORTS: [u16; 2] = [27042, 27043];
pub const DEFAULT_SYSTEM_MOUNT_POINT: &str = "/system";
pub const DEFAULT_MAPS_PATH: &str = "/proc/self/maps";

const DEFAULT_ROOT_ARTIFACT_PATHS: [&str; 11] = [
    "/system/app/Superuser.apk",
    "/system/xbin/su",
    "/system/bin/su",
    "/sbin/su",
    "/system/sd/xbin/su",
    "/system/bin/failsafe/su",
    "/data/local/xbin/su",
    "/data/local/bin/su",
    "/data/local/su",
    "/system/su",
    "/sbin/.magisk",
];

const DEFAULT_SU_FALLBACK_PATHS: [&str; 5] = [
    "/system/xbin/su",
    "/system/bin/su",
    "/sbin/su",
    "/vendor/bin/su",
    "/su/bin/su",
];

const DEFAULT_MAPS_MARKERS: [&str; 3] = ["frida", "gadget", "gum-js"];

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_string()).collect()
}

pub fn default_root_artifact_paths() -> Vec<String> {
    owned(&DEFAULT_ROOT_ARTIFACT_PATHS)
}

pub fn default_su_fallback_paths() -> Vec<String> {
    owned(&DEFAULT_SU_FALLBACK_PATHS)
}

pub fn default_maps_markers() -> Vec<String> {
    owned(&DEFAULT_MAPS_MARKERS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    pub probe_timeout_ms: u64,
    pub root_artifact_paths: Vec<String>,
    pub su_binary: String,
    pub which_program: String,
    pub su_fallback_paths: Vec<String>,
    pub mount_program: String,
    pub system_mount_point: String,
    pub loopback_host: String,
    pub instrumentation_ports: Vec<u16>,
    pub maps_path: String,
    pub maps_markers: Vec<String>,
    pub pidof_program: String,
    pub instrumentation_process: String,
    pub property_program: String,
    pub property_marker: String,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            root_artifact_paths: default_root_artifact_paths(),
            su_binary: "su".to_string(),
            which_program: "which".to_string(),
            su_fallback_paths: default_su_fallback_paths(),
            mount_program: "mount".to_string(),
            system_mount_point: DEFAULT_SYSTEM_MOUNT_POINT.to_string(),
            loopback_host: DEFAULT_LOOPBACK_HOST.to_string(),
            instrumentation_ports: DEFAULT_INSTRUMENTATION_PORTS.to_vec(),
            maps_path: DEFAULT_MAPS_PATH.to_string(),
            maps_markers: default_maps_markers(),
            pidof_program: "pidof".to_string(),
            instrumentation_process: "frida-server".to_string(),
            property_program: "getprop".to_string(),
            property_marker: "frida".to_string(),
        }
    }
}

impl PostureConfig {
    /// Replaces a zero probe timeout with the default. A zero budget makes
    /// every connect fail with `InvalidInput`, which would read as "no
    /// listener".
    pub fn sanitize(&mut self) {
        if self.probe_timeout_ms == 0 {
            warn!(
                default_ms = DEFAULT_PROBE_TIMEOUT_MS,
                "probe_timeout_ms = 0 is not allowed; using default"
            );
            self.probe_timeout_ms = DEFAULT_PROBE_TIMEOUT_MS;
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        if self.probe_timeout_ms == 0 {
            warn!(
                default_ms = DEFAULT_PROBE_TIMEOUT_MS,
                "zero probe timeout requested; using default"
            );
            return Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS);
        }
        Duration::from_millis(self.probe_timeout_ms)
    }
}
