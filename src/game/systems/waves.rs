//! Wave generation and simulation
//!
//! Waves spawn high in the world and roll down toward the beach. A
//! wave's multiplier is fixed at spawn from its altitude above the
//! vertical midline; speed, crest size, and lifespan all scale with it.
//! The boost zone is deliberately a segment-distance check against the
//! crest line, not a full wave-front collision.

use rand::Rng;

use crate::config::CellConfig;
use crate::game::constants::wave::{
    BASE_LIFESPAN, BASE_SIZE, BASE_SPEED, BOOST_BAND, BOOST_DURATION, EDGE_MARGIN,
    LIFESPAN_SPREAD, SIZE_SPREAD, SPEED_MIN_FACTOR, SPEED_SPREAD,
};
use crate::game::state::{CellState, EntityCore, EntityId, Wave};
use crate::util::vec2::{Segment, Vec2};

/// Spawn-time stats derived from the multiplier and three uniform rolls.
/// For a fixed roll, speed, size, and lifespan are all monotonically
/// increasing in the multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveProfile {
    pub velocity: Vec2,
    pub size: f32,
    pub lifespan: f32,
}

pub fn derive_profile(
    multiplier: f32,
    speed_roll: f32,
    size_roll: f32,
    lifespan_roll: f32,
) -> WaveProfile {
    let speed = BASE_SPEED * (SPEED_MIN_FACTOR + multiplier * speed_roll * SPEED_SPREAD);
    WaveProfile {
        velocity: Vec2::DOWN * speed,
        size: BASE_SIZE + multiplier * size_roll * SIZE_SPREAD,
        lifespan: BASE_LIFESPAN + multiplier * lifespan_roll * LIFESPAN_SPREAD,
    }
}

/// Generate one wave. Spawn altitude is uniform over the upper world
/// half, restricted to the uppermost quarter half the time; the
/// multiplier is the normalized distance above the vertical midline.
pub fn generate<R: Rng>(config: &CellConfig, rng: &mut R) -> Wave {
    let half = config.world_height / 2.0;
    let mut y = rng.gen_range(0.0..half);
    if rng.gen_bool(0.5) {
        y = rng.gen_range(0.0..half / 2.0);
    }
    let x = rng.gen_range(0.0..config.world_width);
    let multiplier = ((half - y) / half).clamp(0.0, 1.0);

    let profile = derive_profile(multiplier, rng.gen(), rng.gen(), rng.gen());
    Wave {
        core: EntityCore::new(EntityId::new(), Vec2::new(x, y)),
        velocity: profile.velocity,
        size: profile.size,
        multiplier,
        lifespan: profile.lifespan,
        start_lifespan: profile.lifespan,
    }
}

/// Advance all internally-owned waves: integrate position, burn lifespan,
/// and tombstone waves that expired or crossed into the beach band.
pub fn advance(state: &mut CellState, config: &CellConfig, dt: f32) {
    let shoreline = config.world_height - config.beach_size;
    for id in state.sorted_wave_ids() {
        let Some(wave) = state.waves.get_mut(&id) else {
            continue;
        };
        if wave.core.delete || wave.core.external {
            continue;
        }
        wave.core.position += wave.velocity * dt;
        wave.lifespan -= dt;
        if wave.lifespan <= 0.0 || wave.core.position.y > shoreline {
            wave.core.delete = true;
            tracing::debug!(wave = %id, "wave expired");
        }
    }
}

/// The crest segment players boost against: perpendicular to the wave's
/// velocity, centered on the wave, half the crest size minus the edge
/// margin. None for waves too small to carry a rider.
pub fn boost_segment(wave: &Wave) -> Option<Segment> {
    let half = wave.size / 2.0 - EDGE_MARGIN;
    if half <= 0.0 || wave.velocity.length_sq() == 0.0 {
        return None;
    }
    let perp = wave.velocity.normalize().perpendicular();
    Some(Segment::new(
        wave.core.position - perp * half,
        wave.core.position + perp * half,
    ))
}

/// Boost detection, run inside the spatial pass against pre-movement
/// positions. Every live internal non-bot player within the boost band
/// of a crest segment is marked boosting with that wave's velocity and
/// multiplier; the boost timer only (re)starts when none is running.
pub fn apply_boost_zones(state: &mut CellState) {
    let zones: Vec<(Segment, Vec2, f32)> = state
        .sorted_wave_ids()
        .into_iter()
        .filter_map(|id| {
            let wave = state.waves.get(&id)?;
            if wave.core.delete {
                return None;
            }
            boost_segment(wave).map(|segment| (segment, wave.velocity, wave.multiplier))
        })
        .collect();
    if zones.is_empty() {
        return;
    }

    for id in state.sorted_player_ids() {
        let Some(player) = state.players.get_mut(&id) else {
            continue;
        };
        if player.core.external || !player.interactive() || player.is_bot() {
            continue;
        }
        for (segment, velocity, multiplier) in &zones {
            if segment.distance_to(player.core.position) <= BOOST_BAND {
                if !player.boosting {
                    player.boost_remaining = BOOST_DURATION;
                }
                player.boosting = true;
                player.boost = *velocity;
                player.boost_multiplier = *multiplier;
                break;
            }
        }
    }
}
