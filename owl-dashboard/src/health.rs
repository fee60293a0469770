use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardHealth {
    pub uptime_seconds: u64,
    pub poller_status: String,
    pub units_tracked: u32,
    pub cycles_started: u64,
    pub overview_fetch_failures: u64,
    pub listing_fetch_failures: u64,
    pub unit_fetch_failures: u64,
    pub unit_updates: u64,
    pub stale_results_dropped: u64,
    pub card_renders: u64,
    pub last_overview_at: Option<String>,
}

#[derive(Debug, Default)]
struct Counters {
    cycles_started: AtomicU64,
    overview_failures: AtomicU64,
    listing_failures: AtomicU64,
    unit_failures: AtomicU64,
    unit_updates: AtomicU64,
    stale_dropped: AtomicU64,
    card_renders: AtomicU64,
}

/// Compteurs d'exécution du dashboard, partagés entre poller, controller et HTTP
#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    counters: Arc<Counters>,
    poller_status: Arc<parking_lot::Mutex<String>>,
    last_overview: Arc<parking_lot::Mutex<Option<OffsetDateTime>>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            counters: Arc::new(Counters::default()),
            poller_status: Arc::new(parking_lot::Mutex::new("idle".to_string())),
            last_overview: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    pub fn mark_poller_running(&self) {
        *self.poller_status.lock() = "running".to_string();
    }

    pub fn mark_poller_stopped(&self) {
        *self.poller_status.lock() = "stopped".to_string();
    }

    pub fn poller_status(&self) -> String {
        self.poller_status.lock().clone()
    }

    pub fn record_cycle(&self) {
        self.counters.cycles_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overview_ok(&self) {
        *self.last_overview.lock() = Some(OffsetDateTime::now_utc());
    }

    pub fn record_overview_failure(&self) {
        self.counters.overview_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_listing_failure(&self) {
        self.counters.listing_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unit_failure(&self) {
        self.counters.unit_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unit_update(&self) {
        self.counters.unit_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_dropped(&self) {
        self.counters.stale_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_card_render(&self) {
        self.counters.card_renders.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_health(&self, units_tracked: usize) -> DashboardHealth {
        let c = &self.counters;
        let last_overview = *self.last_overview.lock();
        DashboardHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            poller_status: self.poller_status(),
            units_tracked: units_tracked as u32,
            cycles_started: c.cycles_started.load(Ordering::Relaxed),
            overview_fetch_failures: c.overview_failures.load(Ordering::Relaxed),
            listing_fetch_failures: c.listing_failures.load(Ordering::Relaxed),
            unit_fetch_failures: c.unit_failures.load(Ordering::Relaxed),
            unit_updates: c.unit_updates.load(Ordering::Relaxed),
            stale_results_dropped: c.stale_dropped.load(Ordering::Relaxed),
            card_renders: c.card_renders.load(Ordering::Relaxed),
            last_overview_at: last_overview.and_then(|ts| ts.format(&Rfc3339).ok()),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}
