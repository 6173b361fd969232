//! Host side of the worker lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerPhase {
    #[default]
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; the host discards this worker
    Redundant,
}

impl WorkerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerPhase::Parsed => "parsed",
            WorkerPhase::Installing => "installing",
            WorkerPhase::Installed => "installed",
            WorkerPhase::Activating => "activating",
            WorkerPhase::Activated => "activated",
            WorkerPhase::Redundant => "redundant",
        }
    }
}

/// Directives the proxy sends to whatever hosts it.
pub trait ClientHost: Send + Sync {
    /// Activate as soon as install finishes instead of waiting for open pages to close
    fn skip_waiting(&self);

    /// Take control of already open pages without a reload
    fn claim_clients(&self);

    fn transition(&self, _phase: WorkerPhase) {}
}

/// In-process host that records the phase and which directives were issued.
#[derive(Debug, Default)]
pub struct WorkerLifecycle {
    phase: Mutex<WorkerPhase>,
    skip_waiting: AtomicBool,
    clients_claimed: AtomicBool,
}

impl WorkerLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> WorkerPhase {
        match self.phase.lock() {
            Ok(phase) => *phase,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::SeqCst)
    }

    /// Whether fetch events for open pages are routed to this worker
    pub fn controls_clients(&self) -> bool {
        self.phase() == WorkerPhase::Activated && self.clients_claimed()
    }
}

impl ClientHost for WorkerLifecycle {
    fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    fn claim_clients(&self) {
        self.clients_claimed.store(true, Ordering::SeqCst);
    }

    fn transition(&self, phase: WorkerPhase) {
        let mut current = match self.phase.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        info!(from = current.as_str(), to = phase.as_str(), "Worker phase changed");
        *current = phase;
    }
}
