//! Pass scheduling.
//!
//! `PassGate` is the single-flight guard: whoever holds a `PassPermit` owns
//! the pass, and the permit releases the gate when dropped, including on an
//! early `?` return.
//!
//! `ReconTask` is the periodic trigger. The host owns it and polls it from
//! whatever loop it has (a timer, the runner's tick command, a test). A due
//! task that finds the gate busy skips that round instead of queueing.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::MAX_PASS_INTERVAL_SECS, engine::ReconEngine, error::EngineResult,
    subsystem::PassReport,
};

#[derive(Debug, Clone, Default)]
pub struct PassGate {
    busy: Arc<AtomicBool>,
}

impl PassGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when a pass is already in flight.
    pub fn try_acquire(&self) -> Option<PassPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct PassPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for PassPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// What the hosting environment can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// The host can fire a recurring timer.
    pub background_timer: bool,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            background_timer: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconTask {
    interval: Duration,
    next_due: Option<DateTime<Utc>>,
}

impl ReconTask {
    /// A task that is due immediately, then every `interval_secs`, held
    /// to 1..=`MAX_PASS_INTERVAL_SECS`.
    pub fn new(interval_secs: u64) -> Self {
        let secs = interval_secs.clamp(1, MAX_PASS_INTERVAL_SECS);
        Self {
            interval: Duration::seconds(secs as i64),
            next_due: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The periodic task for this host, or `None` when the host has no
    /// timer and passes only run on demand.
    pub fn for_host(caps: HostCapabilities, interval_secs: u64) -> Option<Self> {
        if !caps.background_timer {
            log::info!("scheduler: host has no background timer, passes run on demand");
            return None;
        }
        Some(Self::new(interval_secs))
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_due.map_or(true, |due| now >= due)
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.next_due
    }

    /// Run a pass if one is due and the gate is free.
    /// `None` means nothing ran this round.
    pub fn poll(&mut self, engine: &mut ReconEngine) -> Option<EngineResult<PassReport>> {
        let now = engine.clock.now();
        if !self.is_due(now) {
            return None;
        }
        if engine.pass_gate().is_busy() {
            log::debug!("scheduler: pass in flight, skipping this round");
            return None;
        }
        self.next_due = Some(now + self.interval);
        Some(engine.run_pass())
    }
}
