//! Outbound handoff queue
//!
//! The authority manager must never wait on the network, so requests are
//! pushed onto an unbounded channel and the host's network driver drains
//! it at its own pace.

use tokio::sync::mpsc;

use mv_authority::{HandoffRequest, HandoffTransport};
use mv_core::{ConnectionInfo, MvError, MvResult};

/// Work for the network driver
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    /// Deliver a handoff request to a parcel server
    Request {
        server: ConnectionInfo,
        request: HandoffRequest,
    },
    /// Drop the parcel session
    Disconnect,
}

/// Outbound receiver, owned by the network driver
pub type OutboundReceiver = mpsc::UnboundedReceiver<Outbound>;

/// `HandoffTransport` backed by a channel
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ChannelTransport {
    pub fn new() -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelTransport { tx }, rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl HandoffTransport for ChannelTransport {
    fn send_request(&self, server: &ConnectionInfo, request: &HandoffRequest) -> MvResult<()> {
        self.tx
            .send(Outbound::Request {
                server: server.clone(),
                request: request.clone(),
            })
            .map_err(|_| MvError::TransportClosed)
    }

    fn disconnect(&self) {
        if self.tx.send(Outbound::Disconnect).is_err() {
            tracing::debug!("disconnect with no network driver attached");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mv_core::{ParcelId, RequestId, UserId, UserPrivacySettings};

    fn request() -> HandoffRequest {
        HandoffRequest::from_settings(
            RequestId::new(1),
            UserId::default(),
            ParcelId::new(2),
            &UserPrivacySettings::default(),
        )
    }

    #[test]
    fn test_queue_order() {
        let (transport, mut rx) = ChannelTransport::new();
        let server = ConnectionInfo::new("parcel.example", 4433, [0; 32]);

        transport.send_request(&server, &request()).unwrap();
        transport.disconnect();

        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Request {
                server,
                request: request()
            }
        );
        assert_eq!(rx.try_recv().unwrap(), Outbound::Disconnect);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_driver() {
        let (transport, rx) = ChannelTransport::new();
        drop(rx);
        assert!(transport.is_closed());

        let server = ConnectionInfo::new("parcel.example", 4433, [0; 32]);
        assert_eq!(
            transport.send_request(&server, &request()),
            Err(MvError::TransportClosed)
        );
        // Never fails, never blocks
        transport.disconnect();
    }
}
