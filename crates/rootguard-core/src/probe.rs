use std::io::{self, BufRead};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::device::Device;
use crate::errors::ProbeError;
use crate::outcome::ProbeOutcome;
use crate::runner::{CommandOutcome, CommandSpec};
use crate::scan::LineMatcher;

/// What a `FileCheck` does when existence of a path cannot be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatErrorPolicy {
    TreatAsAbsent,
    TreatAsDetected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
    Command(CommandSpec),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeKind {
    FileCheck {
        paths: Vec<PathBuf>,
        on_error: StatErrorPolicy,
    },
    CommandCheck {
        command: CommandSpec,
    },
    SocketCheck {
        host: String,
        ports: Vec<u16>,
    },
    StreamScanCheck {
        source: StreamSource,
        matcher: LineMatcher,
    },
}

impl ProbeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FileCheck { .. } => "file_check",
            Self::CommandCheck { .. } => "command_check",
            Self::SocketCheck { .. } => "socket_check",
            Self::StreamScanCheck { .. } => "stream_scan_check",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub name: String,
    pub kind: ProbeKind,
    pub timeout: Duration,
}

impl Probe {
    pub fn new(name: impl Into<String>, kind: ProbeKind, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            kind,
            timeout,
        }
    }

    pub fn evaluate(&self, device: &dyn Device) -> ProbeOutcome {
        let outcome = match &self.kind {
            ProbeKind::FileCheck { paths, on_error } => check_paths(device, paths, *on_error),
            ProbeKind::CommandCheck { command } => device
                .run_command(command, self.timeout)
                .into_presence_outcome(command),
            ProbeKind::SocketCheck { host, ports } => {
                check_ports(device, host, ports, self.timeout)
            }
            ProbeKind::StreamScanCheck { source, matcher } => {
                scan_stream(device, source, matcher, self.timeout)
            }
        };
        self.log_outcome(&outcome);
        outcome
    }

    fn log_outcome(&self, outcome: &ProbeOutcome) {
        match outcome {
            ProbeOutcome::Detected { detail } => {
                info!(probe = %self.name, kind = self.kind.label(), detail = %detail, "posture signal fired")
            }
            ProbeOutcome::TimedOut { detail } => {
                warn!(probe = %self.name, detail = %detail, "posture probe hung; treating as compromised")
            }
            ProbeOutcome::Faulted { detail } => {
                warn!(probe = %self.name, detail = %detail, "posture probe failed; treating as compromised")
            }
            ProbeOutcome::ToolMissing { tool } => {
                debug!(probe = %self.name, tool = %tool, "diagnostic tool not installed")
            }
            ProbeOutcome::Clear => debug!(probe = %self.name, "posture probe clear"),
        }
    }
}

fn check_paths(
    device: &dyn Device,
    paths: &[PathBuf],
    on_error: StatErrorPolicy,
) -> ProbeOutcome {
    for path in paths {
        match device.path_exists(path) {
            Ok(true) => return ProbeOutcome::detected(format!("{} exists", path.display())),
            Ok(false) => {}
            Err(err) => match on_error {
                StatErrorPolicy::TreatAsAbsent => {
                    debug!(path = %path.display(), error = %err, "path not checkable; treated as absent");
                }
                StatErrorPolicy::TreatAsDetected => {
                    return ProbeOutcome::faulted(format!(
                        "checking {}: {}",
                        path.display(),
                        ProbeError::from(err)
                    ));
                }
            },
        }
    }
    ProbeOutcome::Clear
}

fn check_ports(device: &dyn Device, host: &str, ports: &[u16], timeout: Duration) -> ProbeOutcome {
    let ip = match host.parse::<IpAddr>() {
        Ok(ip) => ip,
        Err(_) => return ProbeOutcome::faulted(ProbeError::InvalidAddress(host.to_string())),
    };
    for port in ports {
        let addr = SocketAddr::new(ip, *port);
        match device.connect(addr, timeout) {
            Ok(()) => return ProbeOutcome::detected(format!("listener on {}", addr)),
            Err(err) => debug!(addr = %addr, error = %err, "no listener"),
        }
    }
    ProbeOutcome::Clear
}

fn scan_stream(
    device: &dyn Device,
    source: &StreamSource,
    matcher: &LineMatcher,
    timeout: Duration,
) -> ProbeOutcome {
    match source {
        StreamSource::Command(command) => match device.run_command(command, timeout) {
            CommandOutcome::Output(text) => match text.lines().find(|line| matcher.matches(line)) {
                Some(line) => ProbeOutcome::detected(format!(
                    "`{}` line matched {}: {}",
                    command,
                    matcher.describe(),
                    line.trim()
                )),
                None => ProbeOutcome::Clear,
            },
            other => other.into_presence_outcome(command),
        },
        StreamSource::File(path) => {
            let reader = match device.open_stream(path) {
                Ok(reader) => reader,
                Err(err) => {
                    return ProbeOutcome::faulted(format!(
                        "reading {}: {}",
                        path.display(),
                        ProbeError::from(err)
                    ))
                }
            };
            match first_matching_line(reader, matcher) {
                Ok(Some(line)) => ProbeOutcome::detected(format!(
                    "{} line matched {}: {}",
                    path.display(),
                    matcher.describe(),
                    line.trim()
                )),
                Ok(None) => ProbeOutcome::Clear,
                Err(err) => ProbeOutcome::faulted(format!(
                    "reading {}: {}",
                    path.display(),
                    ProbeError::from(err)
                )),
            }
        }
    }
}

/// Lines are decoded lossily; a non-UTF-8 path in the maps file is not a
/// read failure.
fn first_matching_line(
    mut reader: Box<dyn BufRead + Send>,
    matcher: &LineMatcher,
) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if matcher.matches(line) {
            return Ok(Some(line.to_string()));
        }
    }
}
