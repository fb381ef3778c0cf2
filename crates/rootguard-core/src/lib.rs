//! Point-in-time root and instrumentation detection.
//!
//! Probes observe the device through [`Device`], are grouped into ordered
//! [`SignalSet`]s and folded by [`PostureEngine`] into a single boolean.
//! Inconclusive probes resolve fail-safe: a missing diagnostic tool is
//! benign, a hang or any other error counts as compromised.

mod config;
mod device;
mod engine;
mod errors;
mod outcome;
mod probe;
mod runner;
mod scan;
mod signals;

pub use config::{
    default_maps_markers, default_root_artifact_paths, default_su_fallback_paths, PostureConfig,
    DEFAULT_INSTRUMENTATION_PORTS, DEFAULT_LOOPBACK_HOST, DEFAULT_MAPS_PATH,
    DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_SYSTEM_MOUNT_POINT,
};
pub use device::{Device, LocalDevice};
pub use engine::{Finding, PostureEngine, PostureReport};
pub use errors::{ProbeError, ProbeResult};
pub use outcome::ProbeOutcome;
pub use probe::{Probe, ProbeKind, StatErrorPolicy, StreamSource};
pub use runner::{run_bounded, ChildGuard, CommandOutcome, CommandSpec};
pub use scan::{is_writable_mount_line, maps_line_marker, maps_pathname, LineMatcher};
pub use signals::{
    default_signal_sets, instrumentation_signal_set, root_signal_set, SignalHit, SignalSet,
    INSTRUMENTATION_SIGNAL_SET, ROOT_SIGNAL_SET,
};
