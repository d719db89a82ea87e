use std::net::SocketAddr;

use super::protocol::PeerId;

#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredPeer {
    pub addr: SocketAddr,
    pub peer_id: Option<PeerId>,
    pub last_seen: f64,
}

/// Host-side list of client addresses, in registration order.
#[derive(Debug)]
pub struct PeerRegistry {
    peers: Vec<RegisteredPeer>,
    capacity: usize,
    idle_timeout: f64,
}

impl PeerRegistry {
    /// A non-positive `idle_timeout` disables eviction.
    pub fn new(capacity: usize, idle_timeout: f64) -> Self {
        Self {
            peers: Vec::with_capacity(capacity),
            capacity,
            idle_timeout,
        }
    }

    pub fn add_if_absent(&mut self, addr: SocketAddr, now: f64) -> bool {
        if self.contains(addr) || self.peers.len() >= self.capacity {
            return false;
        }

        self.peers.push(RegisteredPeer {
            addr,
            peer_id: None,
            last_seen: now,
        });
        true
    }

    pub fn contains(&self, addr: SocketAddr) -> bool {
        self.peers.iter().any(|p| p.addr == addr)
    }

    pub fn touch(&mut self, addr: SocketAddr, now: f64) -> bool {
        match self.peers.iter_mut().find(|p| p.addr == addr) {
            Some(peer) => {
                peer.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Ties `addr` to `peer_id`. Any other entry already bound to that id is dropped
    /// and returned, so a peer that came back on a new socket is registered once.
    pub fn bind_peer(&mut self, addr: SocketAddr, peer_id: PeerId) -> Vec<RegisteredPeer> {
        let mut stale = Vec::new();
        if !self.contains(addr) {
            return stale;
        }

        self.peers.retain(|peer| {
            if peer.addr != addr && peer.peer_id == Some(peer_id) {
                stale.push(peer.clone());
                false
            } else {
                true
            }
        });
        if let Some(peer) = self.peers.iter_mut().find(|p| p.addr == addr) {
            peer.peer_id = Some(peer_id);
        }
        stale
    }

    pub fn remove(&mut self, addr: SocketAddr) -> Option<RegisteredPeer> {
        let index = self.peers.iter().position(|p| p.addr == addr)?;
        Some(self.peers.remove(index))
    }

    pub fn evict_idle(&mut self, now: f64) -> Vec<RegisteredPeer> {
        if self.idle_timeout <= 0.0 {
            return Vec::new();
        }

        let timeout = self.idle_timeout;
        let mut evicted = Vec::new();
        self.peers.retain(|peer| {
            if now - peer.last_seen > timeout {
                evicted.push(peer.clone());
                false
            } else {
                true
            }
        });
        evicted
    }

    pub fn for_each(&self, mut f: impl FnMut(&RegisteredPeer)) {
        for peer in &self.peers {
            f(peer);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredPeer> {
        self.peers.iter()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("203.0.113.5:{}", port).parse().unwrap()
    }

    #[test]
    fn add_if_absent_deduplicates() {
        let mut registry = PeerRegistry::new(16, 10.0);

        assert!(registry.add_if_absent(addr(40000), 0.0));
        assert!(!registry.add_if_absent(addr(40000), 1.0));
        assert_eq!(registry.len(), 1);

        assert!(registry.add_if_absent(addr(40001), 1.0));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn capacity_is_enforced() {
        let mut registry = PeerRegistry::new(2, 10.0);
        registry.add_if_absent(addr(1), 0.0);
        registry.add_if_absent(addr(2), 0.0);

        assert!(!registry.add_if_absent(addr(3), 0.0));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn idle_peers_are_evicted() {
        let mut registry = PeerRegistry::new(16, 10.0);
        registry.add_if_absent(addr(1), 0.0);
        registry.add_if_absent(addr(2), 0.0);
        registry.bind_peer(addr(1), PeerId::new("abc123"));

        assert!(registry.touch(addr(2), 8.0));
        assert!(registry.evict_idle(9.0).is_empty());

        let evicted = registry.evict_idle(10.5);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].addr, addr(1));
        assert_eq!(evicted[0].peer_id, Some(PeerId::new("abc123")));
        assert!(registry.contains(addr(2)));
        assert!(!registry.contains(addr(1)));
    }

    #[test]
    fn rebinding_an_id_drops_its_old_address() {
        let mut registry = PeerRegistry::new(16, 10.0);
        registry.add_if_absent(addr(1000), 0.0);
        registry.add_if_absent(addr(7), 0.0);
        assert!(registry.bind_peer(addr(1000), PeerId::new("p1")).is_empty());
        registry.bind_peer(addr(7), PeerId::new("p7"));

        registry.add_if_absent(addr(2000), 5.0);
        let stale = registry.bind_peer(addr(2000), PeerId::new("p1"));

        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].addr, addr(1000));
        assert!(!registry.contains(addr(1000)));
        assert!(registry.contains(addr(7)));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn binding_an_unknown_address_changes_nothing() {
        let mut registry = PeerRegistry::new(16, 10.0);
        registry.add_if_absent(addr(1), 0.0);
        registry.bind_peer(addr(1), PeerId::new("p1"));

        assert!(registry.bind_peer(addr(2), PeerId::new("p1")).is_empty());
        assert!(registry.contains(addr(1)));
    }

    #[test]
    fn zero_timeout_never_evicts() {
        let mut registry = PeerRegistry::new(16, 0.0);
        registry.add_if_absent(addr(1), 0.0);
        assert!(registry.evict_idle(1_000.0).is_empty());
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut registry = PeerRegistry::new(16, 10.0);
        for port in [3, 1, 2] {
            registry.add_if_absent(addr(port), 0.0);
        }

        let mut ports = Vec::new();
        registry.for_each(|p| ports.push(p.addr.port()));
        assert_eq!(ports, vec![3, 1, 2]);

        registry.remove(addr(1));
        let ports: Vec<u16> = registry.iter().map(|p| p.addr.port()).collect();
        assert_eq!(ports, vec![3, 2]);
    }
}
