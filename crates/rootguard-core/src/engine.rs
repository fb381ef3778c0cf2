use serde::Serialize;
use tracing::{debug, info};

use crate::config::PostureConfig;
use crate::device::{Device, LocalDevice};
use crate::outcome::ProbeOutcome;
use crate::signals::{default_signal_sets, SignalSet};

/// The probe that decided a compromised verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub signal_set: String,
    pub probe: String,
    pub outcome: ProbeOutcome,
}

impl Finding {
    pub fn code(&self) -> String {
        format!("{}:{}:{}", self.signal_set, self.probe, self.outcome.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostureReport {
    pub compromised: bool,
    pub finding: Option<Finding>,
    pub probes_evaluated: usize,
}

impl PostureReport {
    pub fn clean(probes_evaluated: usize) -> Self {
        Self {
            compromised: false,
            finding: None,
            probes_evaluated,
        }
    }

    pub fn compromised_by(finding: Finding, probes_evaluated: usize) -> Self {
        Self {
            compromised: true,
            finding: Some(finding),
            probes_evaluated,
        }
    }

    /// Host-facing encoding: `1` compromised, `0` not compromised.
    pub fn verdict_code(&self) -> i32 {
        i32::from(self.compromised)
    }

    pub fn summary(&self) -> String {
        match &self.finding {
            None => "ok".to_string(),
            Some(finding) => format!(
                "{}/{}: {}",
                finding.signal_set, finding.probe, finding.outcome
            ),
        }
    }
}

#[derive(Debug)]
pub struct PostureEngine<D = LocalDevice> {
    device: D,
    signal_sets: Vec<SignalSet>,
}

impl PostureEngine<LocalDevice> {
    pub fn new(config: &PostureConfig) -> Self {
        Self::with_device(config, LocalDevice)
    }
}

impl<D: Device> PostureEngine<D> {
    pub fn with_device(config: &PostureConfig, device: D) -> Self {
        Self::with_signal_sets(device, default_signal_sets(config))
    }

    pub fn with_signal_sets(device: D, signal_sets: Vec<SignalSet>) -> Self {
        Self {
            device,
            signal_sets,
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn signal_sets(&self) -> &[SignalSet] {
        &self.signal_sets
    }

    /// Evaluates signal sets in order; the first positive probe ends the
    /// evaluation, skipping every remaining probe and set.
    pub fn evaluate(&self) -> PostureReport {
        let mut evaluated = 0;
        for set in &self.signal_sets {
            if let Some(hit) = set.first_positive(&self.device, &mut evaluated) {
                let finding = Finding {
                    signal_set: set.name().to_string(),
                    probe: hit.probe.name.clone(),
                    outcome: hit.outcome,
                };
                info!(
                    finding = %finding.code(),
                    probes_evaluated = evaluated,
                    "device posture compromised"
                );
                return PostureReport::compromised_by(finding, evaluated);
            }
            debug!(signal_set = set.name(), "signal set clear");
        }
        debug!(probes_evaluated = evaluated, "device posture clean");
        PostureReport::clean(evaluated)
    }

    pub fn is_compromised(&self) -> bool {
        self.evaluate().compromised
    }
}
