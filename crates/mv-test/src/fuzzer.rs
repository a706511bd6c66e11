//! Authority Fuzzer - Randomized event sequences against the state machine
//!
//! Checks after every event:
//! - Local physics is authoritative exactly when not in parcel mode
//! - A parcel id is held exactly when not in street mode
//! - Parcel mode is never entered under script blocking the user refused
//! - A request id is pending exactly while negotiating

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mv_authority::{
    check_rights, AuthorityManager, AuthorityPhase, HandoffResponse, Mandate, Transition,
};
use mv_core::{ConnectionInfo, ParcelId, RequestId, UserId, UserPrivacySettings};

use crate::recorder::Recorder;

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Number of events to generate
    pub event_count: usize,
    /// Probability a response carries the outstanding request id
    pub matching_prob: f64,
    /// Probability a response approves
    pub approve_prob: f64,
    /// Probability of each mandate on a response
    pub mandate_prob: f64,
    /// User settings under test
    pub settings: UserPrivacySettings,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            event_count: 1000,
            matching_prob: 0.8,
            approve_prob: 0.6,
            mandate_prob: 0.2,
            settings: UserPrivacySettings::default(),
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            event_count: 100,
            ..Self::default()
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            event_count: 20_000,
            ..Self::default()
        }
    }

    /// Servers that answer late, out of turn, and demand everything
    pub fn adversarial() -> Self {
        FuzzerConfig {
            event_count: 5000,
            matching_prob: 0.3,
            approve_prob: 0.9,
            mandate_prob: 0.6,
            settings: UserPrivacySettings::strict(),
            seed: 42,
        }
    }
}

/// One input to the manager
#[derive(Clone, Debug)]
pub enum FuzzEvent {
    RequestEntry(ParcelId),
    Respond(HandoffResponse),
    Timeout(RequestId),
    EmergencyExit,
}

/// Fuzzing outcome
#[derive(Clone, Debug, Default)]
pub struct FuzzReport {
    pub events: usize,
    pub requests_sent: usize,
    pub parcels_entered: usize,
    pub aborts: usize,
    pub emergency_exits: usize,
    pub ignored: usize,
    pub violations: Vec<String>,
}

impl FuzzReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

pub struct AuthorityFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
}

impl AuthorityFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        AuthorityFuzzer { config, rng }
    }

    fn server() -> ConnectionInfo {
        ConnectionInfo::new("parcel.fuzz", 4434, [0x33; 32])
    }

    fn mandates(&mut self) -> BTreeSet<Mandate> {
        [
            Mandate::ScriptBlocking,
            Mandate::VisualOverride,
            Mandate::PhysicsOverride,
        ]
        .into_iter()
        .filter(|_| self.rng.gen_bool(self.config.mandate_prob))
        .collect()
    }

    fn next_event(&mut self, pending: Option<RequestId>) -> FuzzEvent {
        match self.rng.gen_range(0..4) {
            0 => FuzzEvent::RequestEntry(ParcelId::new(self.rng.gen_range(1..8))),
            1 => {
                let id = match pending {
                    Some(id) if self.rng.gen_bool(self.config.matching_prob) => id,
                    _ => RequestId::new(self.rng.gen_range(0..64)),
                };
                let mut response = if self.rng.gen_bool(self.config.approve_prob) {
                    HandoffResponse::approve(id)
                } else {
                    HandoffResponse::reject(id, "fuzzed rejection")
                };
                response.mandates = self.mandates();
                FuzzEvent::Respond(response)
            }
            2 => FuzzEvent::Timeout(
                pending
                    .filter(|_| self.rng.gen_bool(self.config.matching_prob))
                    .unwrap_or(RequestId::new(0)),
            ),
            _ => FuzzEvent::EmergencyExit,
        }
    }

    /// Generate and apply `event_count` events
    pub fn run(&mut self) -> FuzzReport {
        let recorder = Recorder::new();
        let mut manager =
            AuthorityManager::new(self.config.settings, recorder.hooks(UserId::default()));
        let mut report = FuzzReport::default();

        for step in 0..self.config.event_count {
            let event = self.next_event(manager.pending_request());

            let transition = match &event {
                FuzzEvent::RequestEntry(parcel) => manager.request_entry(*parcel, Self::server()),
                FuzzEvent::Respond(response) => {
                    let transition = manager.on_handoff_response(response.clone());
                    if matches!(transition, Transition::EnteredParcel(_))
                        && check_rights(&response.mandates, &self.config.settings).is_err()
                    {
                        report.violations.push(format!(
                            "step {}: entered despite refused script blocking",
                            step
                        ));
                    }
                    transition
                }
                FuzzEvent::Timeout(id) => manager.on_negotiation_timeout(*id),
                FuzzEvent::EmergencyExit => manager.emergency_exit(),
            };

            report.events += 1;
            match transition {
                Transition::Ignored => report.ignored += 1,
                Transition::RequestSent(_) => report.requests_sent += 1,
                Transition::EnteredParcel(_) => report.parcels_entered += 1,
                Transition::Aborted(_) => report.aborts += 1,
                Transition::EmergencyExited => report.emergency_exits += 1,
            }

            let phase = manager.phase();
            let local = recorder.physics().last().copied().unwrap_or(true);
            if local == (phase == AuthorityPhase::ParcelMode) {
                report.violations.push(format!(
                    "step {}: local physics {} in {:?}",
                    step, local, phase
                ));
            }
            if manager.current_parcel().is_some() == (phase == AuthorityPhase::StreetMode) {
                report
                    .violations
                    .push(format!("step {}: parcel id out of sync in {:?}", step, phase));
            }
            if manager.pending_request().is_some() != (phase == AuthorityPhase::Negotiating) {
                report
                    .violations
                    .push(format!("step {}: pending request out of sync", step));
            }
        }

        report
    }
}
