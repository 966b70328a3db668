//! Deadline computation for downstream calls.
//!
//! # Design Decisions
//! - Every downstream call has a deadline
//! - A call's deadline never extends past the inbound request's deadline
//! - Expired deadlines surface as "unavailable", never as a hang

use std::time::Duration;

use tokio::time::Instant;

/// Effective deadline for a downstream call: the earlier of the inbound
/// deadline (if any) and `now + ceiling`.
pub fn capped_deadline(inbound: Option<Instant>, ceiling: Duration) -> Instant {
    let ceiling = Instant::now() + ceiling;
    match inbound {
        Some(deadline) => deadline.min(ceiling),
        None => ceiling,
    }
}

/// Time left until `deadline`, or `None` when it has already passed.
pub fn remaining(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    (!left.is_zero()).then_some(left)
}
