//! Movement stage: applies each internal player's pending ops, boost
//! translation, and attack gating, then clamps everything back inside the
//! world. Runs last in the tick so overlap detection saw a stable
//! pre-movement snapshot.

use crate::config::CellConfig;
use crate::game::state::{CellState, OpSet};
use crate::util::vec2::Vec2;

/// Apply and consume pending ops for every live, internally-owned player.
/// A missing op (empty bitset) is a no-op for the tick, never an error.
pub fn apply_ops(state: &mut CellState, config: &CellConfig, dt: f32) {
    let clock = state.clock;
    for id in state.sorted_player_ids() {
        let Some(player) = state.players.get_mut(&id) else {
            continue;
        };
        if player.core.external || !player.interactive() {
            continue;
        }

        let ops = player.ops;
        let (dx, dy) = ops.axis_steps();
        if dx != 0.0 || dy != 0.0 {
            player.core.position.x += dx * player.speed * dt;
            player.core.position.y += dy * player.speed * dt;
            player.direction = Vec2::new(dx, dy).normalize();
        }

        // Attacks are rate limited by the configured timeout
        if ops.contains(OpSet::ATTACK) && clock - player.last_attack >= config.attack_timeout {
            player.attacking = true;
            player.last_attack = clock;
            player.attack_count += 1;
        } else {
            player.attacking = false;
        }

        // Boosted players ride the wave's velocity and accrue score
        // proportional to time and boost magnitude
        if player.boosting {
            player.core.position += player.boost * dt;
            player.boost_score += player.boost.length() * player.boost_multiplier * dt;
            player.boost_remaining -= dt;
            if player.boost_remaining <= 0.0 {
                player.boosting = false;
                player.boost = Vec2::ZERO;
                player.boost_multiplier = 0.0;
                player.boost_remaining = 0.0;
            }
        }

        player.ops.clear();
    }
}

/// Clamp every player's circular bounds fully inside the world rectangle.
pub fn clamp_to_world(state: &mut CellState, config: &CellConfig) {
    for player in state.players.values_mut() {
        let r = player.radius();
        player.core.position = player.core.position.clamp_rect(
            Vec2::new(r, r),
            Vec2::new(config.world_width - r, config.world_height - r),
        );
    }
}
