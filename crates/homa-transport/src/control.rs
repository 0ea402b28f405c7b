//! Component D — Control Sender.
//!
//! Emits fixed-size control packets (grant, resend, ack, ...) at highest
//! priority, independent of pacing. Control packets are never throttled and
//! never touch the Link-Idle Clock.

use std::sync::atomic::Ordering;

use tracing::warn;

use crate::error::HomaError;
use crate::ip::BufferAllocator;
use crate::priority::priority_tag;
use crate::rpc::OutboundRpc;
use crate::wire::{ControlBody, ControlHeader, ControlPacket};
use crate::Homa;

/// Send a control packet to `rpc`'s peer. `is_client` selects which of the
/// RPC's two ports is the source (client-port vs server-port).
pub fn send_control(
    rpc: &OutboundRpc,
    is_client: bool,
    sport: u16,
    dport: u16,
    body: ControlBody,
    homa: &Homa,
    alloc: &dyn BufferAllocator,
) -> Result<(), HomaError> {
    let header = ControlHeader {
        sport: if is_client { sport } else { dport },
        dport: if is_client { dport } else { sport },
        id: rpc.id,
        ctype: body.control_type(),
    };
    let packet = ControlPacket { header, body };
    let encoded = packet.encode().freeze();

    // Allocation here stands in for `alloc_skb(MAX_HEADER)`; failures never
    // make it to the IP layer.
    match alloc.alloc(0) {
        Ok(_) => {}
        Err(_) => {
            homa.metrics.control_xmit_errors.fetch_add(1, Ordering::Relaxed);
            return Err(HomaError::NoBuffers);
        }
    }

    let buffer = crate::buffer::PacketBuffer::new_control(header, encoded);
    buffer.set_priority_tag(priority_tag(homa.config.max_prio));

    let route = rpc.peer.route();
    match homa.ip.queue_xmit(buffer, &route) {
        Ok(()) => {
            homa.metrics
                .packets_sent_control
                .fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        Err(errno) => {
            homa.metrics.control_xmit_errors.fetch_add(1, Ordering::Relaxed);
            warn!(errno, rpc = rpc.id, "control packet transmit failed");
            Err(HomaError::Transport(errno))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HomaConfig;
    use crate::ip::{IpTransmit, SystemAllocator};
    use crate::message::OutboundMessage;
    use crate::peer::{Peer, Route, StaticPeer};
    use crate::wire::GrantBody;
    use std::sync::{Arc, Mutex};

    fn route() -> Route {
        Route {
            dst_ip: "127.0.0.1".parse().unwrap(),
            dst_port: 9000,
        }
    }

    fn rpc() -> OutboundRpc {
        let peer = Arc::new(StaticPeer::new(route()));
        let msg = OutboundMessage::init(&[0u8; 10], 7, 1000, 2000, peer.as_ref(), &HomaConfig::default(), &SystemAllocator)
            .unwrap();
        OutboundRpc::new(msg, peer as Arc<dyn Peer>)
    }

    struct CountingTransmit {
        calls: Mutex<Vec<u8>>,
    }

    impl IpTransmit for CountingTransmit {
        fn queue_xmit(&self, buffer: crate::buffer::PacketBuffer, _route: &Route) -> Result<(), i32> {
            self.calls.lock().unwrap().push(buffer.priority_tag());
            Ok(())
        }
    }

    #[test]
    fn control_packet_tagged_at_max_priority() {
        let rpc = rpc();
        let ip = Arc::new(CountingTransmit { calls: Mutex::new(Vec::new()) });
        let homa = Homa::new(HomaConfig::default(), ip.clone());

        let body = ControlBody::Grant(GrantBody { offset: 1400, priority: 3 });
        send_control(&rpc, true, 1000, 2000, body, &homa, &SystemAllocator).unwrap();

        assert_eq!(ip.calls.lock().unwrap()[0], priority_tag(homa.config.max_prio));
        assert_eq!(homa.metrics.snapshot().packets_sent_control, 1);
    }

    #[test]
    fn control_packet_does_not_advance_link_idle_clock() {
        let rpc = rpc();
        let ip = Arc::new(CountingTransmit { calls: Mutex::new(Vec::new()) });
        let homa = Homa::new(HomaConfig::default(), ip.clone());
        let before = homa.clock.peek();

        send_control(&rpc, true, 1000, 2000, ControlBody::Ack, &homa, &SystemAllocator).unwrap();

        assert_eq!(homa.clock.peek(), before);
    }

    #[test]
    fn transmit_failure_increments_control_errors() {
        struct FailingTransmit;
        impl IpTransmit for FailingTransmit {
            fn queue_xmit(&self, _buffer: crate::buffer::PacketBuffer, _route: &Route) -> Result<(), i32> {
                Err(105)
            }
        }
        let rpc = rpc();
        let homa = Homa::new(HomaConfig::default(), Arc::new(FailingTransmit));
        let err = send_control(&rpc, true, 1000, 2000, ControlBody::Ack, &homa, &SystemAllocator)
            .unwrap_err();
        assert_eq!(err, HomaError::Transport(105));
        assert_eq!(homa.metrics.snapshot().control_xmit_errors, 1);
    }
}
