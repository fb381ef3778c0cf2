use std::path::PathBuf;

use crate::config::PostureConfig;
use crate::device::Device;
use crate::outcome::ProbeOutcome;
use crate::probe::{Probe, ProbeKind, StatErrorPolicy, StreamSource};
use crate::runner::CommandSpec;
use crate::scan::LineMatcher;

pub const ROOT_SIGNAL_SET: &str = "root";
pub const INSTRUMENTATION_SIGNAL_SET: &str = "instrumentation";

/// An ordered list of probes combined with short-circuit OR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSet {
    name: String,
    probes: Vec<Probe>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalHit<'a> {
    pub probe: &'a Probe,
    pub outcome: ProbeOutcome,
}

impl SignalSet {
    pub fn new(name: impl Into<String>, probes: Vec<Probe>) -> Self {
        Self {
            name: name.into(),
            probes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    /// Runs probes in order and stops at the first positive one.
    /// `evaluated` is incremented for every probe actually run.
    pub fn first_positive(
        &self,
        device: &dyn Device,
        evaluated: &mut usize,
    ) -> Option<SignalHit<'_>> {
        for probe in &self.probes {
            *evaluated += 1;
            let outcome = probe.evaluate(device);
            if outcome.is_positive() {
                return Some(SignalHit { probe, outcome });
            }
        }
        None
    }

    pub fn any(&self, device: &dyn Device) -> bool {
        let mut evaluated = 0;
        self.first_positive(device, &mut evaluated).is_some()
    }
}

fn paths(values: &[String]) -> Vec<PathBuf> {
    values.iter().map(PathBuf::from).collect()
}

pub fn root_signal_set(config: &PostureConfig) -> SignalSet {
    let timeout = config.probe_timeout();
    SignalSet::new(
        ROOT_SIGNAL_SET,
        vec![
            Probe::new(
                "root_artifact_files",
                ProbeKind::FileCheck {
                    paths: paths(&config.root_artifact_paths),
                    on_error: StatErrorPolicy::TreatAsAbsent,
                },
                timeout,
            ),
            // su resolution: PATH lookup first, then well-known locations.
            Probe::new(
                "su_which",
                ProbeKind::CommandCheck {
                    command: CommandSpec::new(
                        config.which_program.as_str(),
                        &[config.su_binary.as_str()],
                    ),
                },
                timeout,
            ),
            Probe::new(
                "su_fallback_paths",
                ProbeKind::FileCheck {
                    paths: paths(&config.su_fallback_paths),
                    on_error: StatErrorPolicy::TreatAsDetected,
                },
                timeout,
            ),
            Probe::new(
                "system_mount_state",
                ProbeKind::StreamScanCheck {
                    source: StreamSource::Command(CommandSpec::new(
                        config.mount_program.as_str(),
                        &[],
                    )),
                    matcher: LineMatcher::WritableMount {
                        mount_point: config.system_mount_point.clone(),
                    },
                },
                timeout,
            ),
        ],
    )
}

pub fn instrumentation_signal_set(config: &PostureConfig) -> SignalSet {
    let timeout = config.probe_timeout();
    SignalSet::new(
        INSTRUMENTATION_SIGNAL_SET,
        vec![
            Probe::new(
                "listener_ports",
                ProbeKind::SocketCheck {
                    host: config.loopback_host.clone(),
                    ports: config.instrumentation_ports.clone(),
                },
                timeout,
            ),
            Probe::new(
                "memory_map_scan",
                ProbeKind::StreamScanCheck {
                    source: StreamSource::File(PathBuf::from(&config.maps_path)),
                    matcher: LineMatcher::MapsMarker {
                        markers: config.maps_markers.clone(),
                    },
                },
                timeout,
            ),
            Probe::new(
                "process_presence",
                ProbeKind::CommandCheck {
                    command: CommandSpec::new(
                        config.pidof_program.as_str(),
                        &[config.instrumentation_process.as_str()],
                    ),
                },
                timeout,
            ),
            Probe::new(
                "system_properties",
                ProbeKind::StreamScanCheck {
                    source: StreamSource::Command(CommandSpec::new(
                        config.property_program.as_str(),
                        &[],
                    )),
                    matcher: LineMatcher::ContainsIgnoreCase {
                        needle: config.property_marker.clone(),
                    },
                },
                timeout,
            ),
        ],
    )
}

pub fn default_signal_sets(config: &PostureConfig) -> Vec<SignalSet> {
    vec![root_signal_set(config), instrumentation_signal_set(config)]
}
