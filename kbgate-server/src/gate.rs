//! Execution gate
//!
//! A single exclusive permit deciding whether a heavyweight job may start.
//! Acquisition never waits: either the permit is free and the caller gets it,
//! or the caller is turned away immediately. The permit is released by
//! dropping the returned [`GatePermit`], so a release without a matching
//! acquire cannot be written.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Shared handle to one gate; clones refer to the same permit
#[derive(Debug, Clone)]
pub struct ExecutionGate {
    permit: Arc<Semaphore>,
}

/// Proof of holding the gate; dropping it frees the gate
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ExecutionGate {
    pub fn new() -> Self {
        Self {
            permit: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the permit if it is free, without waiting
    pub fn try_acquire(&self) -> Option<GatePermit> {
        self.permit
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| GatePermit { _permit: permit })
    }

    pub fn is_held(&self) -> bool {
        self.permit.available_permits() == 0
    }
}

impl Default for ExecutionGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    #[test]
    fn test_second_acquire_fails_while_held() {
        let gate = ExecutionGate::new();

        let permit = gate.try_acquire().expect("free gate");
        assert!(gate.is_held());
        assert!(gate.try_acquire().is_none());
        assert!(gate.clone().try_acquire().is_none());

        drop(permit);
        assert!(!gate.is_held());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn test_independent_gates_do_not_interfere() {
        let a = ExecutionGate::new();
        let b = ExecutionGate::new();

        let _held = a.try_acquire().unwrap();
        assert!(b.try_acquire().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_one_racer_wins() {
        const RACERS: usize = 16;

        let gate = ExecutionGate::new();
        let barrier = Arc::new(Barrier::new(RACERS));
        let winners = Arc::new(AtomicUsize::new(0));
        let release = Arc::new(Barrier::new(RACERS));

        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let gate = gate.clone();
                let barrier = barrier.clone();
                let winners = winners.clone();
                let release = release.clone();
                tokio::spawn(async move {
                    barrier.wait().await;
                    let permit = gate.try_acquire();
                    if permit.is_some() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                    // Hold until everyone has tried.
                    release.wait().await;
                    drop(permit);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(!gate.is_held());
    }
}
