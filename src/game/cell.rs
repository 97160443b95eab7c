//! Cell controller - the per-tick simulation pipeline
//!
//! One controller owns the authoritative state of everything inside its
//! rectangular cell and advances it once per fixed tick, in a fixed
//! stage order. Overlap detection and targeting run first against the
//! stable pre-movement snapshot; movement and resolution run last.
//! Entity iteration everywhere follows ascending id order so that a
//! neighboring cell independently recomputing a shared interaction
//! converges to the same result.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use rand::Rng;
use thiserror::Error;

use crate::config::{CellConfig, ConfigError};
use crate::game::grouping::{GroupingCoordinator, GroupingError, NeighborLink};
use crate::game::spatial::{self, SpatialOverlapIndex};
use crate::game::state::{CellState, Coin, EntityId, OpSet, Player, Wave};
use crate::game::systems::coins::{SpawnDistribution, SpawnError};
use crate::game::systems::{bots, coins, collision, movement, waves};
use crate::metrics::CellMetrics;
use crate::util::vec2::Vec2;

/// Errors that abort a tick. Both variants are fatal to the cell: a
/// spawn error means the configuration is broken, a grouping error means
/// the neighbor link died mid-handshake.
#[derive(Debug, Error)]
pub enum TickError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Grouping(#[from] GroupingError),
}

/// What one tick did, for the embedding server and tests
#[derive(Debug, Clone, Copy, Default)]
pub struct TickReport {
    pub tick: u64,
    pub overlap_pairs: usize,
    pub coins_spawned: usize,
    pub waves_spawned: usize,
    pub collisions_resolved: usize,
    pub deaths: usize,
    pub coins_collected: usize,
}

/// Authoritative controller for one world cell
pub struct CellController {
    pub config: CellConfig,
    pub state: CellState,
    distribution: SpawnDistribution,
    grouping: GroupingCoordinator,
    metrics: Arc<CellMetrics>,
    /// Seconds since the last coin spawn
    coin_timer: f32,
    /// Seconds since the last wave spawn
    wave_timer: f32,
}

impl CellController {
    pub fn new(config: CellConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let distribution = SpawnDistribution::new(&config.coin.archetypes)?;
        Ok(Self {
            config,
            state: CellState::new(),
            distribution,
            grouping: GroupingCoordinator::new(),
            metrics: Arc::new(CellMetrics::new()),
            coin_timer: 0.0,
            wave_timer: 0.0,
        })
    }

    /// Wire up the grouping link to the neighboring cell
    pub fn set_neighbor(&mut self, link: NeighborLink) {
        self.grouping.set_neighbor(link);
    }

    /// Shared handle for scraping between ticks
    pub fn metrics(&self) -> Arc<CellMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Fill the cell's bot population up to the configured count.
    /// Returns how many bots were created.
    pub fn populate_bots<R: Rng>(&mut self, rng: &mut R) -> usize {
        let missing = self.config.bot.count.saturating_sub(self.state.bot_count());
        for _ in 0..missing {
            let radius = self.config.bot.diameter / 2.0;
            let position = Vec2::new(
                rng.gen_range(radius..self.config.cell_width - radius),
                rng.gen_range(radius..self.config.cell_height - self.config.beach_size),
            );
            let initial = bots::random_direction(rng);
            self.state
                .add_player(Player::bot(EntityId::new(), position, initial, &self.config));
        }
        if missing > 0 {
            tracing::info!(added = missing, "bot population filled");
        }
        missing
    }

    /// Session attach: create a human player with configured default
    /// stats, spawned in the upper (sea) half of the cell.
    pub fn attach_player<R: Rng>(&mut self, rng: &mut R) -> EntityId {
        let radius = self.config.player_diameter / 2.0;
        let position = Vec2::new(
            rng.gen_range(radius..self.config.cell_width - radius),
            rng.gen_range(radius..self.config.cell_height / 2.0),
        );
        let id = self
            .state
            .add_player(Player::human(EntityId::new(), position, &self.config));
        tracing::info!(player = %id, "player attached");
        id
    }

    /// Queue pending input for an internally-owned player. Unknown ids
    /// and external copies are ignored.
    pub fn queue_ops(&mut self, id: EntityId, ops: OpSet) {
        if let Some(player) = self.state.players.get_mut(&id) {
            if !player.core.external {
                player.ops.insert(ops);
            }
        }
    }

    /// Adopt a read-only copy of a player owned by a neighboring cell
    pub fn adopt_external_player(&mut self, mut player: Player) -> EntityId {
        player.core.external = true;
        self.state.add_player(player)
    }

    /// Adopt a read-only copy of a coin owned by a neighboring cell
    pub fn adopt_external_coin(&mut self, mut coin: Coin) -> EntityId {
        coin.core.external = true;
        self.state.add_coin(coin)
    }

    /// Adopt a read-only copy of a wave owned by a neighboring cell
    pub fn adopt_external_wave(&mut self, mut wave: Wave) -> EntityId {
        wave.core.external = true;
        self.state.add_wave(wave)
    }

    /// Drop an external copy once the neighbor withdraws it
    pub fn release_external(&mut self, id: EntityId) {
        if self.state.players.get(&id).is_some_and(|p| p.core.external) {
            self.state.players.remove(&id);
        }
        if self.state.coins.get(&id).is_some_and(|c| c.core.external) {
            self.state.coins.remove(&id);
        }
        if self.state.waves.get(&id).is_some_and(|w| w.core.external) {
            self.state.waves.remove(&id);
        }
    }

    /// Advance the cell by the configured fixed tick period. The
    /// embedding scheduler calls this once per period; `tick` accepts a
    /// measured dt for drivers that compensate for jitter.
    pub fn tick_fixed<R: Rng>(&mut self, rng: &mut R) -> Result<TickReport, TickError> {
        let dt = self.config.tick_interval;
        self.tick(dt, rng)
    }

    /// Advance the cell by one tick of `dt` seconds.
    pub fn tick<R: Rng>(&mut self, dt: f32, rng: &mut R) -> Result<TickReport, TickError> {
        let started = Instant::now();
        self.state.tick += 1;
        self.state.clock += dt;
        let mut report = TickReport {
            tick: self.state.tick,
            ..Default::default()
        };

        // (1) Overlaps, targeting, and boost zones against last tick's
        // positions
        let index = SpatialOverlapIndex::build(&self.state);
        let overlaps = index.collect_overlaps(&self.state, rng);
        report.overlap_pairs = overlaps.pair_count;
        spatial::assign_bot_targets(&mut self.state);
        waves::apply_boost_zones(&mut self.state);

        // (2) Maybe spawn a coin
        self.coin_timer += dt;
        if self.coin_timer >= self.config.coin.spawn_interval
            && self.state.live_coin_count() < self.config.coin.cap
        {
            coins::spawn(&mut self.state, &self.config, &self.distribution, rng)?;
            self.coin_timer = 0.0;
            report.coins_spawned = 1;
        }

        // (3) Maybe spawn a wave
        self.wave_timer += dt;
        if self.wave_timer >= self.config.wave.spawn_interval {
            self.state.add_wave(waves::generate(&self.config, rng));
            self.wave_timer = 0.0;
            report.waves_spawned = 1;
        }

        // (4) Bot decisions
        bots::decide(&mut self.state, &self.config, rng);

        // (5) Advance existing waves
        waves::advance(&mut self.state, &self.config, dt);

        // (6) Movement, collision resolution, pickups, clamp
        movement::apply_ops(&mut self.state, &self.config, dt);
        let resolved = collision::resolve(&mut self.state, &overlaps, &mut self.grouping)?;
        report.collisions_resolved = resolved.resolved;
        report.deaths = resolved.deaths;
        report.coins_collected =
            coins::collect(&mut self.state, &overlaps.coin_overlaps, &mut self.grouping)?;
        movement::clamp_to_world(&mut self.state, &self.config);

        self.observe(&report);
        self.metrics.record_tick_time(started.elapsed());
        tracing::debug!(
            tick = report.tick,
            players = self.state.players.len(),
            coins = self.state.live_coin_count(),
            waves = self.state.live_wave_count(),
            pairs = report.overlap_pairs,
            "cell tick complete"
        );
        Ok(report)
    }

    fn observe(&self, report: &TickReport) {
        self.metrics.update_entity_counts(&self.state);
        self.metrics
            .overlap_pairs
            .store(report.overlap_pairs as u64, Ordering::Relaxed);
        self.metrics
            .collisions_resolved
            .fetch_add(report.collisions_resolved as u64, Ordering::Relaxed);
        self.metrics
            .deaths
            .fetch_add(report.deaths as u64, Ordering::Relaxed);
        self.metrics
            .coins_spawned
            .fetch_add(report.coins_spawned as u64, Ordering::Relaxed);
        self.metrics
            .coins_collected
            .fetch_add(report.coins_collected as u64, Ordering::Relaxed);
        self.metrics
            .waves_spawned
            .fetch_add(report.waves_spawned as u64, Ordering::Relaxed);
        self.metrics
            .groups_committed
            .store(self.grouping.committed, Ordering::Relaxed);
        self.metrics
            .groups_local_authority
            .store(self.grouping.local_authority, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoinArchetype;
    use crate::game::constants::tick::DT;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn controller() -> CellController {
        CellController::new(CellConfig::default()).unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xB0A7)
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = CellConfig::default();
        config.coin.archetypes = vec![CoinArchetype::new(0.5, 1, 10.0, "bronze")];
        assert!(matches!(
            CellController::new(config),
            Err(ConfigError::WeightSum { .. })
        ));
    }

    #[test]
    fn test_populate_bots_fills_to_count() {
        let mut cell = controller();
        let mut rng = rng();
        let added = cell.populate_bots(&mut rng);
        assert_eq!(added, cell.config.bot.count);
        assert_eq!(cell.state.bot_count(), cell.config.bot.count);

        // Idempotent once full
        assert_eq!(cell.populate_bots(&mut rng), 0);
    }

    #[test]
    fn test_tick_advances_clock_and_counter() {
        let mut cell = controller();
        let mut rng = rng();
        cell.tick(DT, &mut rng).unwrap();
        cell.tick(DT, &mut rng).unwrap();
        assert_eq!(cell.state.tick, 2);
        assert!((cell.state.clock - 2.0 * DT).abs() < 1e-6);

        // tick_fixed advances by the configured period
        cell.tick_fixed(&mut rng).unwrap();
        assert!((cell.state.clock - (2.0 * DT + cell.config.tick_interval)).abs() < 1e-6);
    }

    #[test]
    fn test_coin_spawn_respects_interval() {
        let mut cell = controller();
        let mut rng = rng();
        let interval = cell.config.coin.spawn_interval;

        // First tick: under the interval, no spawn
        let first = cell.tick(interval * 0.66, &mut rng).unwrap();
        assert_eq!(first.coins_spawned, 0);

        // Second tick crosses the interval
        let second = cell.tick(interval * 0.66, &mut rng).unwrap();
        assert_eq!(second.coins_spawned, 1);

        // Third tick is again under the interval: no-op, count unchanged
        let coins_before = cell.state.live_coin_count();
        let third = cell.tick(interval * 0.66, &mut rng).unwrap();
        assert_eq!(third.coins_spawned, 0);
        assert_eq!(cell.state.live_coin_count(), coins_before);
    }

    #[test]
    fn test_coin_spawn_respects_cap() {
        let mut config = CellConfig::default();
        config.coin.cap = 2;
        let mut cell = CellController::new(config).unwrap();
        let mut rng = rng();
        let interval = cell.config.coin.spawn_interval;

        for _ in 0..10 {
            cell.tick(interval, &mut rng).unwrap();
        }
        assert_eq!(cell.state.live_coin_count(), 2);
    }

    #[test]
    fn test_wave_spawn_interval() {
        let mut cell = controller();
        let mut rng = rng();
        let interval = cell.config.wave.spawn_interval;

        let report = cell.tick(interval, &mut rng).unwrap();
        assert_eq!(report.waves_spawned, 1);
        // The wave stays in the map until the membership layer purges it,
        // even if this first large dt already tombstoned it
        assert_eq!(cell.state.waves.len(), 1);

        let report = cell.tick(DT, &mut rng).unwrap();
        assert_eq!(report.waves_spawned, 0);
    }

    #[test]
    fn test_queued_ops_move_player() {
        let mut cell = controller();
        let mut rng = rng();
        let config = cell.config.clone();
        let id = cell.state.add_player(Player::human(
            EntityId::from_u128(1),
            Vec2::new(400.0, 400.0),
            &config,
        ));

        cell.queue_ops(id, OpSet::RIGHT);
        cell.tick(DT, &mut rng).unwrap();

        let after = cell.state.players[&id].core.position;
        assert!(after.x > 400.0);
        assert_eq!(after.y, 400.0);
    }

    #[test]
    fn test_ops_ignored_for_external_copies() {
        let mut cell = controller();
        let mut rng = rng();
        let config = cell.config.clone();
        let id = cell.adopt_external_player(Player::human(
            EntityId::from_u128(9),
            Vec2::new(300.0, 300.0),
            &config,
        ));

        cell.queue_ops(id, OpSet::RIGHT);
        cell.tick(DT, &mut rng).unwrap();

        assert_eq!(cell.state.players[&id].core.position, Vec2::new(300.0, 300.0));
    }

    #[test]
    fn test_release_external_only_drops_external() {
        let mut cell = controller();
        let mut rng = rng();
        let internal = cell.attach_player(&mut rng);
        let config = cell.config.clone();
        let external = cell.adopt_external_player(Player::human(
            EntityId::from_u128(9),
            Vec2::new(300.0, 300.0),
            &config,
        ));

        cell.release_external(internal);
        cell.release_external(external);

        assert!(cell.state.players.contains_key(&internal));
        assert!(!cell.state.players.contains_key(&external));
    }

    #[test]
    fn test_pipeline_keeps_players_inside_world() {
        let mut cell = controller();
        let mut rng = rng();
        cell.populate_bots(&mut rng);
        let player = cell.attach_player(&mut rng);

        for tick in 0..300 {
            cell.queue_ops(
                player,
                match tick % 4 {
                    0 => OpSet::LEFT,
                    1 => OpSet::UP,
                    2 => OpSet::RIGHT,
                    _ => OpSet::DOWN,
                },
            );
            cell.tick(DT, &mut rng).unwrap();

            for p in cell.state.players.values() {
                let r = p.radius();
                let pos = p.core.position;
                assert!(pos.x - r >= -1e-3 && pos.x + r <= cell.config.world_width + 1e-3);
                assert!(pos.y - r >= -1e-3 && pos.y + r <= cell.config.world_height + 1e-3);
            }
        }

        // Long runs spawn coins and waves
        assert!(cell.metrics().coins_spawned.load(Ordering::Relaxed) > 0);
        assert!(cell.metrics().waves_spawned.load(Ordering::Relaxed) > 0);
    }

    #[test]
    fn test_metrics_gauges_track_state() {
        let mut cell = controller();
        let mut rng = rng();
        cell.populate_bots(&mut rng);
        cell.attach_player(&mut rng);
        cell.tick(DT, &mut rng).unwrap();

        let metrics = cell.metrics();
        assert_eq!(
            metrics.players.load(Ordering::Relaxed),
            cell.state.players.len() as u64
        );
        assert_eq!(metrics.tick_count.load(Ordering::Relaxed), 1);
    }
}
