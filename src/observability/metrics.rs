//! Thread-safe metrics collection system
//!
//! Provides atomic counters and mutex-protected collections for tracking
//! invocation outcomes and per-stage hook statistics.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Maximum number of hook timings retained per stage
const MAX_HOOK_TIMINGS: usize = 1000;

/// Global metrics collector instance
pub static METRICS: Lazy<PipelineMetrics> = Lazy::new(PipelineMetrics::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static PipelineMetrics {
    &METRICS
}

/// Thread-safe metrics collector using atomics and mutexes
pub struct PipelineMetrics {
    // Invocation metrics (atomic for high frequency)
    invocations_started: AtomicU64,
    invocations_completed: AtomicU64,
    invocations_faulted: AtomicU64,
    in_flight: AtomicU64,

    // Dispatch metrics
    dispatch_steps: AtomicU64,
    stages_skipped: AtomicU64,
    fault_switches: AtomicU64,
    fault_handler_failures: AtomicU64,

    // Per-stage hook statistics (mutex protected for complex data)
    stage_stats: Mutex<HashMap<String, StageStats>>,

    started_at: AtomicU64,
}

/// Hook statistics of one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageStats {
    pub name: String,
    pub hooks_invoked: u64,
    pub hook_failures: u64,
    pub hook_times_us: Vec<u64>,
    pub last_invoked: u64,
}

impl StageStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            hooks_invoked: 0,
            hook_failures: 0,
            hook_times_us: Vec::new(),
            last_invoked: 0,
        }
    }

    pub fn average_hook_time_us(&self) -> f64 {
        if self.hook_times_us.is_empty() {
            return 0.0;
        }
        self.hook_times_us.iter().sum::<u64>() as f64 / self.hook_times_us.len() as f64
    }
}

/// Point-in-time copy of all metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub invocations_started: u64,
    pub invocations_completed: u64,
    pub invocations_faulted: u64,
    pub in_flight: u64,
    pub dispatch_steps: u64,
    pub stages_skipped: u64,
    pub fault_switches: u64,
    pub fault_handler_failures: u64,
    pub stages: Vec<StageStats>,
    pub uptime_seconds: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            invocations_started: AtomicU64::new(0),
            invocations_completed: AtomicU64::new(0),
            invocations_faulted: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            dispatch_steps: AtomicU64::new(0),
            stages_skipped: AtomicU64::new(0),
            fault_switches: AtomicU64::new(0),
            fault_handler_failures: AtomicU64::new(0),
            stage_stats: Mutex::new(HashMap::new()),
            started_at: AtomicU64::new(current_timestamp()),
        }
    }

    // Invocation metrics
    pub fn invocation_started(&self) {
        self.invocations_started.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invocation_completed(&self) {
        self.invocations_completed.fetch_add(1, Ordering::Relaxed);
        self.leave_flight();
    }

    pub fn invocation_faulted(&self) {
        self.invocations_faulted.fetch_add(1, Ordering::Relaxed);
        self.leave_flight();
    }

    fn leave_flight(&self) {
        let _ = self
            .in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    // Dispatch metrics
    pub fn dispatch_step(&self) {
        self.dispatch_steps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stage_skipped(&self) {
        self.stages_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fault_switched(&self) {
        self.fault_switches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fault_handler_failed(&self) {
        self.fault_handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one hook execution of `stage`
    pub fn hook_executed(&self, stage: &str, duration: Duration, success: bool) {
        if let Ok(mut stats) = self.stage_stats.lock() {
            let entry = stats
                .entry(stage.to_string())
                .or_insert_with(|| StageStats::new(stage));

            entry.hooks_invoked += 1;
            entry.last_invoked = current_timestamp();
            entry.hook_times_us.push(duration.as_micros() as u64);
            if entry.hook_times_us.len() > MAX_HOOK_TIMINGS {
                entry.hook_times_us.remove(0);
            }
            if !success {
                entry.hook_failures += 1;
            }
        }
    }

    pub fn stage_stats(&self, stage: &str) -> Option<StageStats> {
        self.stage_stats
            .lock()
            .ok()
            .and_then(|stats| stats.get(stage).cloned())
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut stages: Vec<StageStats> = self
            .stage_stats
            .lock()
            .map(|stats| stats.values().cloned().collect())
            .unwrap_or_default();
        stages.sort_by(|a, b| a.name.cmp(&b.name));

        MetricsSnapshot {
            invocations_started: self.invocations_started.load(Ordering::Relaxed),
            invocations_completed: self.invocations_completed.load(Ordering::Relaxed),
            invocations_faulted: self.invocations_faulted.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            dispatch_steps: self.dispatch_steps.load(Ordering::Relaxed),
            stages_skipped: self.stages_skipped.load(Ordering::Relaxed),
            fault_switches: self.fault_switches.load(Ordering::Relaxed),
            fault_handler_failures: self.fault_handler_failures.load(Ordering::Relaxed),
            stages,
            uptime_seconds: current_timestamp()
                .saturating_sub(self.started_at.load(Ordering::Relaxed)),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
