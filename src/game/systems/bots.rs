//! Bot behavior
//!
//! Per-tick movement decision for autonomous players, evaluated for
//! live, internally-owned bots only. Priority order: terrain-safety
//! overrides (three nested y-bands above the beach), then chasing an
//! assigned target, then repeating the last random direction.

use rand::Rng;
use rustc_hash::FxHashMap;

use crate::config::CellConfig;
use crate::game::constants::bot::TERRAIN_COOLDOWN_TICKS;
use crate::game::constants::terrain::{HARD_BAND_FACTOR, SNAP_FACTOR, SOFT_BAND_FACTOR};
use crate::game::state::{CellState, EntityId, OpSet};
use crate::util::vec2::Vec2;

/// Decide this tick's pending op for every bot in the cell.
pub fn decide<R: Rng>(state: &mut CellState, config: &CellConfig, rng: &mut R) {
    // Stable position/liveness snapshot for target chasing
    let positions: FxHashMap<EntityId, (Vec2, bool)> = state
        .players
        .iter()
        .map(|(&id, p)| (id, (p.core.position, p.interactive())))
        .collect();

    let hard_band = config.world_height - config.beach_size * HARD_BAND_FACTOR;
    let soft_band = config.world_height - config.beach_size * SOFT_BAND_FACTOR;

    for id in state.sorted_player_ids() {
        let Some(player) = state.players.get_mut(&id) else {
            continue;
        };
        if player.core.external || !player.interactive() || player.bot.is_none() {
            continue;
        }
        let pos = player.core.position;
        let radius = player.radius();

        // (a) Terrain-safety overrides, deepest band first. Past the hard
        // band the bot is snapped back up and skips all other logic.
        if pos.y > hard_band {
            player.ops = OpSet::UP;
            player.core.position.y -= config.beach_size * SNAP_FACTOR;
            continue;
        }
        if player.bot.as_ref().map_or(0, |b| b.terrain_cooldown) > 0 {
            if let Some(bot) = player.bot.as_mut() {
                bot.terrain_cooldown -= 1;
            }
            player.ops = OpSet::UP;
            continue;
        }
        if pos.y > soft_band {
            if let Some(bot) = player.bot.as_mut() {
                bot.terrain_cooldown = TERRAIN_COOLDOWN_TICKS;
            }
            player.ops = OpSet::UP;
            continue;
        }

        // (b) Chase a living target greedily, independently on each axis
        let target = player.bot.as_ref().and_then(|b| b.target_id);
        if let Some(target_id) = target {
            if let Some(&(target_pos, live)) = positions.get(&target_id) {
                if live {
                    let mut ops = OpSet::EMPTY;
                    if target_pos.x < pos.x {
                        ops.insert(OpSet::LEFT);
                    } else if target_pos.x > pos.x {
                        ops.insert(OpSet::RIGHT);
                    }
                    if target_pos.y < pos.y {
                        ops.insert(OpSet::UP);
                    } else if target_pos.y > pos.y {
                        ops.insert(OpSet::DOWN);
                    }
                    player.ops = ops;
                    continue;
                }
            }
        }

        // (c) Wander: repeat the last random direction unless the change
        // draw fires or the bot is pinned against a world edge
        let at_edge = pos.x <= radius
            || pos.x >= config.world_width - radius
            || pos.y <= radius
            || pos.y >= config.world_height - radius;
        let repeat = player.bot.as_ref().map_or(OpSet::EMPTY, |b| b.repeat_op);
        let change_prob = player.bot.as_ref().map_or(0.0, |b| b.change_dir_prob);

        let ops = if at_edge || repeat.is_empty() || rng.gen::<f32>() < change_prob {
            let fresh = random_direction(rng);
            if let Some(bot) = player.bot.as_mut() {
                bot.repeat_op = fresh;
            }
            fresh
        } else {
            repeat
        };
        player.ops = ops;
    }
}

/// One of the four cardinal directions, uniformly
pub(crate) fn random_direction<R: Rng>(rng: &mut R) -> OpSet {
    match rng.gen_range(0..4) {
        0 => OpSet::UP,
        1 => OpSet::DOWN,
        2 => OpSet::LEFT,
        _ => OpSet::RIGHT,
    }
}
