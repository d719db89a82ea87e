use glam::Vec2;

/// Snaps to `incoming` when it is more than `snap_threshold` away, otherwise blends toward it.
pub fn reconcile_position(current: Vec2, incoming: Vec2, snap_threshold: f32, blend: f32) -> Vec2 {
    if current.distance(incoming) > snap_threshold {
        incoming
    } else {
        current + (incoming - current) * blend
    }
}
