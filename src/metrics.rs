//! Per-cell simulation metrics
//!
//! Atomic counters the embedding server scrapes between ticks. Entity
//! gauges are refreshed each tick; event counters are cumulative since
//! the cell came up.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::game::state::CellState;

/// Rolling window size for tick-time percentiles
const TICK_HISTORY_LEN: usize = 1000;

/// Metrics registry for one cell controller
#[derive(Debug)]
pub struct CellMetrics {
    // Entity gauges (refreshed each tick)
    pub players: AtomicU64,
    pub bots: AtomicU64,
    pub alive_players: AtomicU64,
    pub coins: AtomicU64,
    pub waves: AtomicU64,
    /// Candidate pairs recorded by the last spatial pass
    pub overlap_pairs: AtomicU64,

    // Cumulative event counters
    pub collisions_resolved: AtomicU64,
    pub deaths: AtomicU64,
    pub coins_spawned: AtomicU64,
    pub coins_collected: AtomicU64,
    pub waves_spawned: AtomicU64,
    pub groups_committed: AtomicU64,
    pub groups_local_authority: AtomicU64,

    // Tick timing (microseconds)
    pub tick_count: AtomicU64,
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_p99_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    start_time: Instant,

    // Rolling tick times for percentile calculation
    tick_history: RwLock<VecDeque<u64>>,
}

impl CellMetrics {
    pub fn new() -> Self {
        Self {
            players: AtomicU64::new(0),
            bots: AtomicU64::new(0),
            alive_players: AtomicU64::new(0),
            coins: AtomicU64::new(0),
            waves: AtomicU64::new(0),
            overlap_pairs: AtomicU64::new(0),
            collisions_resolved: AtomicU64::new(0),
            deaths: AtomicU64::new(0),
            coins_spawned: AtomicU64::new(0),
            coins_collected: AtomicU64::new(0),
            waves_spawned: AtomicU64::new(0),
            groups_committed: AtomicU64::new(0),
            groups_local_authority: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_p99_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY_LEN)),
        }
    }

    /// Refresh entity gauges from the current state
    pub fn update_entity_counts(&self, state: &CellState) {
        self.players.store(state.players.len() as u64, Ordering::Relaxed);
        self.bots.store(state.bot_count() as u64, Ordering::Relaxed);
        self.alive_players
            .store(state.live_player_count() as u64, Ordering::Relaxed);
        self.coins.store(state.live_coin_count() as u64, Ordering::Relaxed);
        self.waves.store(state.live_wave_count() as u64, Ordering::Relaxed);
    }

    /// Record a tick time and update percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY_LEN {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();
            let p95 = sorted[sorted.len() * 95 / 100];
            let p99 = sorted[sorted.len() * 99 / 100];
            let max = sorted[sorted.len() - 1];
            self.tick_time_p95_us.store(p95, Ordering::Relaxed);
            self.tick_time_p99_us.store(p99, Ordering::Relaxed);
            self.tick_time_max_us.store(max, Ordering::Relaxed);
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self::new()
    }
}
