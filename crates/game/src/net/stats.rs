use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::protocol::PeerId;

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub malformed: u64,
    pub send_failures: u64,
    pub receive_errors: u64,
}

pub fn rand_u64() -> u64 {
    let mut hasher = DefaultHasher::new();
    Instant::now().hash(&mut hasher);
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
        .hash(&mut hasher);
    std::process::id().hash(&mut hasher);
    hasher.finish()
}

/// Five digits of wall-clock seconds followed by ten random alphanumerics.
/// Not collision-proof, only unlikely to collide within one session.
pub fn generate_peer_id() -> PeerId {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut rng = ChaCha8Rng::seed_from_u64(rand_u64() ^ (u64::from(std::process::id()) << 32));
    let mut id = format!("{:05}", secs % 100_000);
    for _ in 0..10 {
        id.push(ALPHABET[rng.gen_range(0..ALPHABET.len())] as char);
    }

    PeerId::new(&id)
}
