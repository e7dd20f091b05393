use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Lease {
    holder: u64,
    expires_at: Instant,
}

/// Lease based leader latch hosted by the coordination service.
///
/// At most one participant holds the latch at a time. A holder that stops renewing
/// loses it once its lease runs out, so a crashed replica cannot block failover.
#[derive(Debug, Default)]
pub struct LeaderLatch {
    lease: Mutex<Option<Lease>>,
}

impl LeaderLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires or renews the latch for `ttl`. Returns whether `participant` now
    /// holds it.
    pub fn try_acquire(
        &self,
        participant: u64,
        ttl: Duration,
    ) -> bool {
        let now = Instant::now();
        let mut lease = self.lease.lock();
        match *lease {
            Some(l) if l.holder != participant && l.expires_at > now => false,
            _ => {
                *lease = Some(Lease {
                    holder: participant,
                    expires_at: now + ttl,
                });
                true
            }
        }
    }

    /// Gives the latch up if `participant` holds it.
    pub fn release(
        &self,
        participant: u64,
    ) {
        let mut lease = self.lease.lock();
        if matches!(*lease, Some(l) if l.holder == participant) {
            *lease = None;
        }
    }

    /// Current unexpired holder
    pub fn leader(&self) -> Option<u64> {
        let now = Instant::now();
        let lease = *self.lease.lock();
        lease.filter(|l| l.expires_at > now).map(|l| l.holder)
    }
}
