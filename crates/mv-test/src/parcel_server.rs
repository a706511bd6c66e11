//! Simulated parcel server
//!
//! Drains the client's outbound queue and answers every handoff request
//! according to a fixed policy, the way a real server would over the
//! network.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use mv_authority::{AuthorityHandle, HandoffRequest, HandoffResponse, Mandate};
use mv_runtime::{Outbound, OutboundReceiver};

/// How the simulated server answers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerPolicy {
    /// Approve with the given mandates
    Approve(BTreeSet<Mandate>),
    /// Decline with a reason
    Reject(String),
    /// Never answer
    Silent,
}

impl ServerPolicy {
    pub fn approve() -> Self {
        ServerPolicy::Approve(BTreeSet::new())
    }

    pub fn approve_with(mandates: &[Mandate]) -> Self {
        ServerPolicy::Approve(mandates.iter().copied().collect())
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        ServerPolicy::Reject(reason.into())
    }
}

/// What the server saw
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerLog {
    pub requests: Vec<HandoffRequest>,
    pub disconnects: usize,
}

pub struct ParcelServerSim {
    policy: ServerPolicy,
    manifest: Option<String>,
    log: Arc<Mutex<ServerLog>>,
}

impl ParcelServerSim {
    pub fn new(policy: ServerPolicy) -> Self {
        ParcelServerSim {
            policy,
            manifest: None,
            log: Arc::default(),
        }
    }

    pub fn with_manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    /// Answer to `request` under the current policy
    pub fn answer(&self, request: &HandoffRequest) -> Option<HandoffResponse> {
        match &self.policy {
            ServerPolicy::Approve(mandates) => {
                let mut response = HandoffResponse::approve(request.request_id);
                for mandate in mandates {
                    response = response.with_mandate(*mandate);
                }
                if let Some(manifest) = &self.manifest {
                    response = response.with_manifest(manifest.clone());
                }
                Some(response)
            }
            ServerPolicy::Reject(reason) => {
                Some(HandoffResponse::reject(request.request_id, reason.clone()))
            }
            ServerPolicy::Silent => None,
        }
    }

    /// Snapshot of everything received so far
    pub fn log(&self) -> ServerLog {
        self.log.lock().clone()
    }

    /// Handle one outbound item; returns the response to deliver, if any
    pub fn handle(&self, outbound: Outbound) -> Option<HandoffResponse> {
        match outbound {
            Outbound::Request { request, .. } => {
                let response = self.answer(&request);
                self.log.lock().requests.push(request);
                response
            }
            Outbound::Disconnect => {
                self.log.lock().disconnects += 1;
                None
            }
        }
    }

    /// Serve `outbound` until it closes, delivering answers to `authority`
    pub fn spawn(
        self: Arc<Self>,
        mut outbound: OutboundReceiver,
        authority: AuthorityHandle,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(item) = outbound.recv().await {
                if let Some(response) = self.handle(item) {
                    authority.on_handoff_response(response);
                }
            }
        })
    }
}
