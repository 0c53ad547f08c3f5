use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    NotReady,
    Ready,
}

/// Read side of the process readiness flag.
///
/// Cheap to clone and safe to poll from any thread. The flag starts
/// `NotReady` and can only be flipped by the matching [`ReadyLatch`].
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    ready: Arc<AtomicBool>,
}

/// The single write handle of a [`ReadinessGate`].
///
/// Not `Clone`; releasing consumes it, so the flag flips at most once and
/// there is no path back to `NotReady`.
#[derive(Debug)]
pub struct ReadyLatch {
    ready: Arc<AtomicBool>,
}

impl ReadinessGate {
    /// Create a gate in the `NotReady` state together with its only latch.
    pub fn new() -> (Self, ReadyLatch) {
        let ready = Arc::new(AtomicBool::new(false));
        (
            Self {
                ready: Arc::clone(&ready),
            },
            ReadyLatch { ready },
        )
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn state(&self) -> Readiness {
        if self.is_ready() {
            Readiness::Ready
        } else {
            Readiness::NotReady
        }
    }
}

impl ReadyLatch {
    pub fn release(self) {
        self.ready.store(true, Ordering::Release);
        tracing::info!("readiness gate released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_not_ready() {
        let (gate, _latch) = ReadinessGate::new();
        assert!(!gate.is_ready());
        assert_eq!(gate.state(), Readiness::NotReady);
    }

    #[test]
    fn release_is_visible_to_all_clones() {
        let (gate, latch) = ReadinessGate::new();
        let probe = gate.clone();
        latch.release();
        assert!(gate.is_ready());
        assert_eq!(probe.state(), Readiness::Ready);
    }

    #[test]
    fn dropping_latch_does_not_release() {
        let (gate, latch) = ReadinessGate::new();
        drop(latch);
        assert!(!gate.is_ready());
    }

    #[test]
    fn concurrent_readers_observe_monotonic_flag() {
        let (gate, latch) = ReadinessGate::new();
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let gate = gate.clone();
                thread::spawn(move || {
                    let mut seen_ready = false;
                    for _ in 0..10_000 {
                        let now = gate.is_ready();
                        assert!(!(seen_ready && !now), "gate reverted to not ready");
                        seen_ready |= now;
                    }
                })
            })
            .collect();
        latch.release();
        for r in readers {
            r.join().unwrap();
        }
        assert!(gate.is_ready());
    }
}
