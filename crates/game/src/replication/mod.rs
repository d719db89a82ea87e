mod engine;
mod outbox;
mod reconcile;

pub use engine::{Context, IntervalTimer, Replicator, chat_payload};
pub use outbox::{Destination, Outbox};
pub use reconcile::reconcile_position;
