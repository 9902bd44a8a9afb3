use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Pause and stop requests shared between the host and the monitor worker.
///
/// Clones observe the same flags. The worker checks them once per poll
/// interval.
#[derive(Debug, Clone, Default)]
pub struct RunSignals {
    paused: Arc<AtomicBool>,
    stopped: Arc<AtomicBool>,
}

impl RunSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_flags() {
        let signals = RunSignals::new();
        let worker_view = signals.clone();

        signals.pause();
        assert!(worker_view.is_paused());
        signals.resume();
        assert!(!worker_view.is_paused());

        assert!(!worker_view.is_stopped());
        signals.stop();
        assert!(worker_view.is_stopped());
    }
}
