//! Per-tick spatial overlap index
//!
//! Rebuilt from scratch each tick: every live player and coin is bulk
//! loaded into an R-tree keyed by its axis-aligned bounding box. Queries
//! exclude the querying entity by predicate instead of removing and
//! reinserting its box. Box overlap is a conservative pre-filter; the
//! collision resolver does the true circle-circle acceptance.

use rand::Rng;
use rstar::{RTree, RTreeObject, AABB};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::game::constants::bot::TARGET_RADIUS;
use crate::game::state::{CellState, EntityHandle, EntityId, EntityKind};
use crate::util::vec2::Vec2;

/// Inline capacity for per-player candidate lists
const CANDIDATES_INLINE: usize = 8;

/// Candidate ids overlapping one entity's bounding box
pub type Candidates = SmallVec<[EntityId; CANDIDATES_INLINE]>;

/// One entry in the index: a circle approximated by its bounding box
#[derive(Debug, Clone, Copy)]
pub struct IndexedEntity {
    pub handle: EntityHandle,
    pub center: Vec2,
    pub radius: f32,
}

impl IndexedEntity {
    fn aabb(&self) -> AABB<[f32; 2]> {
        AABB::from_corners(
            [self.center.x - self.radius, self.center.y - self.radius],
            [self.center.x + self.radius, self.center.y + self.radius],
        )
    }
}

impl RTreeObject for IndexedEntity {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb()
    }
}

/// Candidate overlaps computed against last tick's positions.
///
/// `player_overlaps` holds, per player in ascending id order, the other
/// players whose boxes intersect its own. `coin_overlaps` assigns each
/// overlapped coin to exactly one randomly chosen overlapping player so
/// a pickup is never double-counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlapSet {
    pub player_overlaps: Vec<(EntityId, Candidates)>,
    pub coin_overlaps: FxHashMap<EntityId, EntityId>,
    /// Total candidate pairs recorded (for metrics)
    pub pair_count: usize,
}

/// Bulk-built bounding-box index over the cell's live players and coins
pub struct SpatialOverlapIndex {
    tree: RTree<IndexedEntity>,
    len: usize,
}

impl SpatialOverlapIndex {
    /// Build the index from the current state. Dead and tombstoned
    /// entities never enter the tree; external copies do, because
    /// boundary-spanning overlaps are exactly what the grouping
    /// protocol exists for.
    pub fn build(state: &CellState) -> Self {
        let mut entries = Vec::with_capacity(state.players.len() + state.coins.len());
        for (&id, player) in &state.players {
            if !player.interactive() {
                continue;
            }
            entries.push(IndexedEntity {
                handle: EntityHandle::player(id),
                center: player.core.position,
                radius: player.radius(),
            });
        }
        for (&id, coin) in &state.coins {
            if coin.core.delete {
                continue;
            }
            entries.push(IndexedEntity {
                handle: EntityHandle::coin(id),
                center: coin.core.position,
                radius: coin.radius,
            });
        }
        let len = entries.len();
        Self {
            tree: RTree::bulk_load(entries),
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All entries whose boxes intersect the given circle's box, except
    /// the excluded entity itself.
    pub fn query_excluding(
        &self,
        center: Vec2,
        radius: f32,
        exclude: EntityId,
    ) -> impl Iterator<Item = &IndexedEntity> {
        let envelope = AABB::from_corners(
            [center.x - radius, center.y - radius],
            [center.x + radius, center.y + radius],
        );
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(move |entry| entry.handle.id != exclude)
    }

    /// Record candidate overlaps for the tick. Iteration is in ascending
    /// id order and candidate lists are sorted, so two runs over the same
    /// positions produce identical output (given an equally seeded rng
    /// for the coin assignment).
    pub fn collect_overlaps<R: Rng>(&self, state: &CellState, rng: &mut R) -> OverlapSet {
        let mut set = OverlapSet::default();

        for id in state.sorted_player_ids() {
            let player = match state.players.get(&id) {
                Some(p) if p.interactive() => p,
                _ => continue,
            };
            let mut candidates: Candidates = self
                .query_excluding(player.core.position, player.radius(), id)
                .filter(|entry| entry.handle.kind == EntityKind::Player)
                .map(|entry| entry.handle.id)
                .collect();
            candidates.sort_unstable();
            if !candidates.is_empty() {
                set.pair_count += candidates.len();
                set.player_overlaps.push((id, candidates));
            }
        }

        for coin_id in state.sorted_coin_ids() {
            let coin = match state.coins.get(&coin_id) {
                Some(c) if !c.core.delete => c,
                _ => continue,
            };
            let mut players: Candidates = self
                .query_excluding(coin.core.position, coin.radius, coin_id)
                .filter(|entry| entry.handle.kind == EntityKind::Player)
                .map(|entry| entry.handle.id)
                .collect();
            if players.is_empty() {
                continue;
            }
            players.sort_unstable();
            let chosen = players[rng.gen_range(0..players.len())];
            set.coin_overlaps.insert(coin_id, chosen);
            set.pair_count += 1;
        }

        set
    }
}

/// Bot targeting: nearest live non-bot player within a fixed radius,
/// computed by brute-force pairwise distance, independent of the tree.
pub fn assign_bot_targets(state: &mut CellState) {
    let humans: Vec<(EntityId, Vec2)> = {
        let mut ids: Vec<EntityId> = state
            .players
            .iter()
            .filter(|(_, p)| !p.is_bot() && p.interactive())
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        ids.iter()
            .map(|id| (*id, state.players[id].core.position))
            .collect()
    };

    for id in state.sorted_player_ids() {
        let Some(player) = state.players.get_mut(&id) else {
            continue;
        };
        if player.core.external || !player.interactive() {
            continue;
        }
        let position = player.core.position;
        let Some(bot) = player.bot.as_mut() else {
            continue;
        };

        let mut best: Option<(f32, EntityId)> = None;
        for &(human_id, human_pos) in &humans {
            let dist_sq = position.distance_sq_to(human_pos);
            if dist_sq > TARGET_RADIUS * TARGET_RADIUS {
                continue;
            }
            if best.map_or(true, |(best_sq, _)| dist_sq < best_sq) {
                best = Some((dist_sq, human_id));
            }
        }
        bot.target_id = best.map(|(_, human_id)| human_id);
    }
}
