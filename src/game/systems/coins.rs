//! Coin spawning and pickup
//!
//! Archetype weights are converted at initialization into cumulative
//! lower-bound thresholds over ascending-probability order; selection
//! scans them in descending order. A draw that matches nothing means the
//! weights do not sum to 1 - that is a fatal configuration error, not a
//! runtime condition.

use std::cmp::Ordering;

use rand::Rng;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::{CellConfig, CoinArchetype, ConfigError};
use crate::game::grouping::{GroupMember, GroupingCoordinator, GroupingError};
use crate::game::state::{CellState, Coin, EntityHandle, EntityId};
use crate::util::vec2::Vec2;

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("no coin archetype matches draw {draw}; weights do not sum to 1")]
    NoArchetype { draw: f32 },
}

#[derive(Debug, Clone)]
struct Threshold {
    lower_bound: f32,
    archetype: CoinArchetype,
}

/// Weighted-random coin archetype picker.
#[derive(Debug, Clone)]
pub struct SpawnDistribution {
    /// Descending lower-bound order; built from ascending probabilities
    thresholds: Vec<Threshold>,
}

impl SpawnDistribution {
    pub fn new(archetypes: &[CoinArchetype]) -> Result<Self, ConfigError> {
        if archetypes.is_empty() {
            return Err(ConfigError::NoArchetypes);
        }
        let mut ascending = archetypes.to_vec();
        ascending.sort_by(|a, b| {
            a.probability
                .partial_cmp(&b.probability)
                .unwrap_or(Ordering::Equal)
        });

        let mut cumulative = 0.0;
        let thresholds = ascending
            .into_iter()
            .map(|archetype| {
                cumulative += archetype.probability;
                Threshold {
                    lower_bound: 1.0 - cumulative,
                    archetype,
                }
            })
            .collect();
        Ok(Self { thresholds })
    }

    /// Pick the last archetype, in descending threshold order, whose
    /// lower bound does not exceed the uniform [0,1) draw.
    pub fn select(&self, draw: f32) -> Result<&CoinArchetype, SpawnError> {
        self.thresholds
            .iter()
            .find(|t| t.lower_bound <= draw)
            .map(|t| &t.archetype)
            .ok_or(SpawnError::NoArchetype { draw })
    }
}

/// Spawn one coin from the distribution at a uniform position inside the
/// cell. The caller has already checked the interval/cap policy.
pub fn spawn<R: Rng>(
    state: &mut CellState,
    config: &CellConfig,
    distribution: &SpawnDistribution,
    rng: &mut R,
) -> Result<EntityId, SpawnError> {
    let archetype = distribution.select(rng.gen::<f32>())?;
    let r = archetype.radius;
    let position = Vec2::new(
        rng.gen_range(r..config.cell_width - r),
        rng.gen_range(r..config.cell_height - r),
    );
    let id = state.add_coin(Coin::new(
        EntityId::new(),
        position,
        archetype.value,
        archetype.radius,
        &archetype.subtype,
    ));
    tracing::debug!(coin = %id, subtype = %archetype.subtype, "coin spawned");
    Ok(id)
}

/// Apply coin pickups from the spatial pass assignments. The assignment
/// already picked exactly one player per coin; acceptance still requires
/// a true circle intersection at current positions. Pickups touching an
/// external copy go through the grouping protocol.
pub fn collect(
    state: &mut CellState,
    assignments: &FxHashMap<EntityId, EntityId>,
    grouping: &mut GroupingCoordinator,
) -> Result<usize, GroupingError> {
    let mut collected = 0;
    let mut coin_ids: Vec<EntityId> = assignments.keys().copied().collect();
    coin_ids.sort_unstable();

    for coin_id in coin_ids {
        let player_id = assignments[&coin_id];
        let Some((coin_pos, coin_radius, coin_value, coin_external)) = state
            .coins
            .get(&coin_id)
            .filter(|c| !c.core.delete)
            .map(|c| (c.core.position, c.radius, c.value, c.core.external))
        else {
            continue;
        };
        let Some((player_pos, player_radius, player_external)) = state
            .players
            .get(&player_id)
            .filter(|p| p.interactive())
            .map(|p| (p.core.position, p.radius(), p.core.external))
        else {
            tracing::warn!(coin = %coin_id, player = %player_id, "pickup assignee vanished");
            continue;
        };

        if coin_pos.distance_to(player_pos) >= coin_radius + player_radius {
            continue;
        }

        if coin_external || player_external {
            grouping.submit(&[
                GroupMember {
                    handle: EntityHandle::coin(coin_id),
                    external: coin_external,
                },
                GroupMember {
                    handle: EntityHandle::player(player_id),
                    external: player_external,
                },
            ])?;
        }

        if let Some(player) = state.players.get_mut(&player_id) {
            player.score += coin_value;
        }
        if let Some(coin) = state.coins.get_mut(&coin_id) {
            coin.core.delete = true;
        }
        collected += 1;
    }

    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Player;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn archetypes(weights: &[f32]) -> Vec<CoinArchetype> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| CoinArchetype::new(w, i as u32 + 1, 10.0, &format!("type{}", i)))
            .collect()
    }

    #[test]
    fn test_thresholds_partition_unit_interval() {
        let distribution = SpawnDistribution::new(&archetypes(&[0.25, 0.6, 0.1, 0.05])).unwrap();
        // Draw inside each band selects the matching archetype
        assert_eq!(distribution.select(0.97).unwrap().probability, 0.05);
        assert_eq!(distribution.select(0.9).unwrap().probability, 0.1);
        assert_eq!(distribution.select(0.7).unwrap().probability, 0.25);
        assert_eq!(distribution.select(0.3).unwrap().probability, 0.6);
        assert_eq!(distribution.select(0.0).unwrap().probability, 0.6);
    }

    #[test]
    fn test_selection_converges_to_weights() {
        let weights = [0.25, 0.6, 0.1, 0.05];
        let distribution = SpawnDistribution::new(&archetypes(&weights)).unwrap();
        let mut rng = StdRng::seed_from_u64(0xC01);
        let draws = 100_000;
        let mut counts = [0usize; 4];

        for _ in 0..draws {
            let archetype = distribution.select(rng.gen::<f32>()).unwrap();
            let index = weights
                .iter()
                .position(|&w| (w - archetype.probability).abs() < 1e-6)
                .unwrap();
            counts[index] += 1;
        }

        for (index, &weight) in weights.iter().enumerate() {
            let frequency = counts[index] as f32 / draws as f32;
            assert!(
                (frequency - weight).abs() < 0.01,
                "archetype {} frequency {} vs weight {}",
                index,
                frequency,
                weight
            );
        }
    }

    #[test]
    fn test_under_sum_weights_leave_unmatched_band() {
        // Weights summing to 0.85: draws below 0.15 match nothing
        let distribution = SpawnDistribution::new(&archetypes(&[0.25, 0.6])).unwrap();
        assert!(matches!(
            distribution.select(0.1),
            Err(SpawnError::NoArchetype { .. })
        ));
        assert!(distribution.select(0.2).is_ok());
    }

    #[test]
    fn test_empty_archetypes_rejected() {
        assert!(matches!(
            SpawnDistribution::new(&[]),
            Err(ConfigError::NoArchetypes)
        ));
    }

    #[test]
    fn test_spawn_places_coin_inside_cell() {
        let config = CellConfig::default();
        let distribution = SpawnDistribution::new(&config.coin.archetypes).unwrap();
        let mut state = CellState::new();
        let mut rng = StdRng::seed_from_u64(3);

        for _ in 0..50 {
            let id = spawn(&mut state, &config, &distribution, &mut rng).unwrap();
            let coin = &state.coins[&id];
            assert!(coin.core.position.x >= coin.radius);
            assert!(coin.core.position.x <= config.cell_width - coin.radius);
            assert!(coin.core.position.y >= coin.radius);
            assert!(coin.core.position.y <= config.cell_height - coin.radius);
        }
        assert_eq!(state.coins.len(), 50);
    }

    #[test]
    fn test_collect_awards_value_and_tombstones() {
        let config = CellConfig::default();
        let mut state = CellState::new();
        let player = state.add_player(Player::human(
            EntityId::from_u128(1),
            Vec2::new(100.0, 100.0),
            &config,
        ));
        let coin = state.add_coin(Coin::new(
            EntityId::from_u128(2),
            Vec2::new(105.0, 100.0),
            20,
            14.0,
            "gold",
        ));
        let mut assignments = FxHashMap::default();
        assignments.insert(coin, player);
        let mut grouping = GroupingCoordinator::new();

        let collected = collect(&mut state, &assignments, &mut grouping).unwrap();

        assert_eq!(collected, 1);
        assert_eq!(state.players[&player].score, 20);
        assert!(state.coins[&coin].core.delete);
        // Fully internal pickup needs no group
        assert_eq!(grouping.local_authority, 0);
    }

    #[test]
    fn test_collect_rejects_non_intersecting_assignment() {
        let config = CellConfig::default();
        let mut state = CellState::new();
        let player = state.add_player(Player::human(
            EntityId::from_u128(1),
            Vec2::new(100.0, 100.0),
            &config,
        ));
        let coin = state.add_coin(Coin::new(
            EntityId::from_u128(2),
            Vec2::new(500.0, 500.0),
            20,
            14.0,
            "gold",
        ));
        let mut assignments = FxHashMap::default();
        assignments.insert(coin, player);
        let mut grouping = GroupingCoordinator::new();

        let collected = collect(&mut state, &assignments, &mut grouping).unwrap();

        assert_eq!(collected, 0);
        assert_eq!(state.players[&player].score, 0);
        assert!(!state.coins[&coin].core.delete);
    }

    #[test]
    fn test_collect_groups_external_pickup() {
        let config = CellConfig::default();
        let mut state = CellState::new();
        let player = state.add_player(Player::human(
            EntityId::from_u128(1),
            Vec2::new(100.0, 100.0),
            &config,
        ));
        let coin = {
            let mut c = Coin::new(EntityId::from_u128(2), Vec2::new(105.0, 100.0), 20, 14.0, "gold");
            c.core.external = true;
            state.add_coin(c)
        };
        let mut assignments = FxHashMap::default();
        assignments.insert(coin, player);
        // No neighbor link: local authority is assumed
        let mut grouping = GroupingCoordinator::new();

        let collected = collect(&mut state, &assignments, &mut grouping).unwrap();

        assert_eq!(collected, 1);
        assert_eq!(grouping.local_authority, 1);
    }

    #[test]
    fn test_collect_skips_vanished_player() {
        let config = CellConfig::default();
        let mut state = CellState::new();
        let coin = state.add_coin(Coin::new(
            EntityId::from_u128(2),
            Vec2::new(105.0, 100.0),
            20,
            14.0,
            "gold",
        ));
        let mut assignments = FxHashMap::default();
        assignments.insert(coin, EntityId::from_u128(1));
        let mut grouping = GroupingCoordinator::new();

        let collected = collect(&mut state, &assignments, &mut grouping).unwrap();

        assert_eq!(collected, 0);
        assert!(!state.coins[&coin].core.delete);
    }
}
