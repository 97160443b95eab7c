//! Collision resolution
//!
//! Consumes the candidate pairs recorded by the spatial pass, accepts
//! them with a true circle-circle test, and separates the circles along
//! the minimum-translation vector weighted by mass: each circle moves in
//! proportion to the *other* circle's mass share, so heavier entities
//! displace lighter ones more. Every resolved pair moved both sides and
//! is therefore submitted to the grouping protocol before the tick ends.

use crate::game::grouping::{GroupMember, GroupingCoordinator, GroupingError};
use crate::game::spatial::OverlapSet;
use crate::game::state::{CellState, EntityHandle, EntityId};
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionReport {
    pub resolved: usize,
    pub deaths: usize,
}

/// Per-pair snapshot taken before any mutation
#[derive(Clone, Copy)]
struct Body {
    position: Vec2,
    radius: f32,
    mass: f32,
    is_bot: bool,
    external: bool,
}

fn snapshot(state: &CellState, id: EntityId) -> Option<Body> {
    let player = state.players.get(&id)?;
    if !player.interactive() {
        return None;
    }
    Some(Body {
        position: player.core.position,
        radius: player.radius(),
        mass: player.mass,
        is_bot: player.is_bot(),
        external: player.core.external,
    })
}

/// Resolve all candidate player pairs. Candidates are symmetric, so each
/// pair is processed once, from the lower id's list. A pair whose members
/// vanished or degenerated since the spatial pass degrades to "no
/// collision" rather than raising.
pub fn resolve(
    state: &mut CellState,
    overlaps: &OverlapSet,
    grouping: &mut GroupingCoordinator,
) -> Result<CollisionReport, GroupingError> {
    let mut report = CollisionReport::default();

    for (a_id, candidates) in &overlaps.player_overlaps {
        for &b_id in candidates {
            if b_id <= *a_id {
                continue;
            }
            let (Some(a), Some(b)) = (snapshot(state, *a_id), snapshot(state, b_id)) else {
                // Entity died or was removed earlier in this stage
                continue;
            };

            let delta = b.position - a.position;
            let dist = delta.length();
            let overlap = a.radius + b.radius - dist;
            if overlap <= 0.0 {
                // Box pre-filter candidate rejected by the circle test
                continue;
            }
            if dist <= f32::EPSILON {
                tracing::warn!(a = %a_id, b = %b_id, "coincident collision pair, skipping");
                continue;
            }
            let total = a.mass + b.mass;
            if total <= 0.0 {
                tracing::warn!(a = %a_id, b = %b_id, "massless collision pair, skipping");
                continue;
            }

            // Minimum-translation vector, pointing from a toward b
            let mtv = delta * (overlap / dist);
            if let Some(player) = state.players.get_mut(a_id) {
                player.core.position -= mtv * (b.mass / total);
            }
            if let Some(player) = state.players.get_mut(&b_id) {
                player.core.position += mtv * (a.mass / total);
            }

            // Lethality is asymmetric across the bot boundary only: the
            // non-bot party dies, the bot never does
            if a.is_bot != b.is_bot {
                let victim = if a.is_bot { b_id } else { *a_id };
                if let Some(player) = state.players.get_mut(&victim) {
                    player.alive = false;
                    report.deaths += 1;
                    tracing::debug!(player = %victim, "player beached by bot collision");
                }
            }

            grouping.submit(&[
                GroupMember {
                    handle: EntityHandle::player(*a_id),
                    external: a.external,
                },
                GroupMember {
                    handle: EntityHandle::player(b_id),
                    external: b.external,
                },
            ])?;
            report.resolved += 1;
        }
    }

    Ok(report)
}
