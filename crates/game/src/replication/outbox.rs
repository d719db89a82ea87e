use std::collections::VecDeque;
use std::net::SocketAddr;

use log::debug;

use crate::net::{NetworkMessage, PeerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Unicast(SocketAddr),
    /// The host a client joined. Dropped when hosting.
    Host,
    /// Every registered peer, optionally skipping the one a relayed message came from.
    Peers { except: Option<SocketAddr> },
}

#[derive(Debug, Default)]
pub struct Outbox {
    queue: VecDeque<(NetworkMessage, Destination)>,
}

impl Outbox {
    pub fn push(&mut self, message: NetworkMessage, destination: Destination) {
        self.queue.push_back((message, destination));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(NetworkMessage, Destination)> {
        self.queue.iter()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Empties the queue, expanding each destination into concrete addresses.
    pub fn resolve(
        &mut self,
        registry: &PeerRegistry,
        host: Option<SocketAddr>,
    ) -> Vec<(NetworkMessage, SocketAddr)> {
        let mut sends = Vec::with_capacity(self.queue.len());

        for (message, destination) in self.queue.drain(..) {
            match destination {
                Destination::Unicast(addr) => sends.push((message, addr)),
                Destination::Host => match host {
                    Some(addr) => sends.push((message, addr)),
                    None => debug!("no host for {}", message.payload.kind()),
                },
                Destination::Peers { except } => registry.for_each(|peer| {
                    if Some(peer.addr) != except {
                        sends.push((message, peer.addr));
                    }
                }),
            }
        }

        sends
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Payload, PeerId};

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    #[test]
    fn peers_destination_skips_the_source() {
        let mut registry = PeerRegistry::new(16, 10.0);
        for port in [1, 2, 3] {
            registry.add_if_absent(addr(port), 0.0);
        }

        let mut outbox = Outbox::default();
        let message = NetworkMessage::new(PeerId::new("a"), Payload::Leave);
        outbox.push(
            message,
            Destination::Peers {
                except: Some(addr(2)),
            },
        );

        let targets: Vec<u16> = outbox
            .resolve(&registry, None)
            .iter()
            .map(|(_, a)| a.port())
            .collect();
        assert_eq!(targets, vec![1, 3]);
        assert!(outbox.is_empty());
    }

    #[test]
    fn host_destination_needs_a_host() {
        let registry = PeerRegistry::new(16, 10.0);
        let mut outbox = Outbox::default();
        let message = NetworkMessage::new(PeerId::new("a"), Payload::Ping { sent_at: 1.0 });

        outbox.push(message, Destination::Host);
        assert!(outbox.resolve(&registry, None).is_empty());

        outbox.push(message, Destination::Host);
        assert_eq!(outbox.resolve(&registry, Some(addr(9))), vec![(message, addr(9))]);
    }
}
