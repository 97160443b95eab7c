//! Entity model and cell-local simulation state
//!
//! Contains all entities (players, coins, waves) and the map-of-maps the
//! tick pipeline mutates in place. Entities owned by a neighboring cell
//! carry the `external` flag and are read-only here unless grouped.

use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CellConfig;
use crate::util::vec2::Vec2;

/// Opaque entity identifier. Iteration over entities always follows the
/// ascending `Ord` order of these ids (lexicographic over the canonical
/// byte encoding) so that a neighboring cell recomputing the same
/// cross-boundary interaction converges to an identical result.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic id for tests and benchmarks
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Entity type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Coin,
    Wave,
}

/// Kind-erased entity reference (spatial index entries, grouping members)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityHandle {
    pub fn player(id: EntityId) -> Self {
        Self {
            kind: EntityKind::Player,
            id,
        }
    }

    pub fn coin(id: EntityId) -> Self {
        Self {
            kind: EntityKind::Coin,
            id,
        }
    }

    pub fn wave(id: EntityId) -> Self {
        Self {
            kind: EntityKind::Wave,
            id,
        }
    }
}

/// Pending-input bitset: movement directions plus attack, consumed once
/// per tick by the movement stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpSet(u8);

impl OpSet {
    pub const EMPTY: OpSet = OpSet(0);
    pub const UP: OpSet = OpSet(1);
    pub const DOWN: OpSet = OpSet(1 << 1);
    pub const LEFT: OpSet = OpSet(1 << 2);
    pub const RIGHT: OpSet = OpSet(1 << 3);
    pub const ATTACK: OpSet = OpSet(1 << 4);

    #[inline]
    pub fn contains(self, other: OpSet) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: OpSet) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Axis step deltas in {-1, 0, 1}. Opposed bits cancel; diagonal
    /// movement keeps full speed on both axes.
    pub fn axis_steps(self) -> (f32, f32) {
        let mut dx = 0.0;
        let mut dy = 0.0;
        if self.contains(Self::LEFT) {
            dx -= 1.0;
        }
        if self.contains(Self::RIGHT) {
            dx += 1.0;
        }
        if self.contains(Self::UP) {
            dy -= 1.0;
        }
        if self.contains(Self::DOWN) {
            dy += 1.0;
        }
        (dx, dy)
    }
}

/// Common entity header shared by every variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityCore {
    pub id: EntityId,
    /// Position in world pixel space
    pub position: Vec2,
    /// True when the authoritative owner is a different cell
    pub external: bool,
    /// Tombstone consumed by the external membership layer
    pub delete: bool,
}

impl EntityCore {
    pub fn new(id: EntityId, position: Vec2) -> Self {
        Self {
            id,
            position,
            external: false,
            delete: false,
        }
    }
}

/// Bot-only state, present when a player is autonomous
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotState {
    /// Currently chased player, if any
    pub target_id: Option<EntityId>,
    /// Per-tick probability of picking a fresh random direction
    pub change_dir_prob: f32,
    /// Last random direction, repeated until a change fires
    pub repeat_op: OpSet,
    /// Remaining ticks of forced upward movement after entering the soft
    /// terrain band
    pub terrain_cooldown: u32,
}

/// Player state (human or bot)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub core: EntityCore,
    /// Pending input applied (and consumed) by the movement stage
    pub ops: OpSet,
    pub mass: f32,
    /// Movement speed in pixels per second per axis
    pub speed: f32,
    /// Facing, unit length while moving
    pub direction: Vec2,
    /// Collision diameter in pixels
    pub diameter: f32,
    pub alive: bool,
    pub score: u32,
    // Attack state
    pub attacking: bool,
    /// Sim-clock seconds of the last accepted attack
    pub last_attack: f32,
    pub attack_count: u32,
    // Boost state
    pub boosting: bool,
    /// Translation applied each tick while boosting (a wave's velocity)
    pub boost: Vec2,
    /// The granting wave's multiplier
    pub boost_multiplier: f32,
    /// Remaining boost seconds; the timer is only (re)started when no
    /// boost is currently running
    pub boost_remaining: f32,
    /// Accumulated boost score, proportional to time and boost magnitude
    pub boost_score: f32,
    /// Present iff this player is a bot
    pub bot: Option<BotState>,
}

impl Player {
    /// Session-attach constructor with configured default stats
    pub fn human(id: EntityId, position: Vec2, config: &CellConfig) -> Self {
        Self {
            core: EntityCore::new(id, position),
            ops: OpSet::EMPTY,
            mass: config.player_mass,
            speed: config.player_speed,
            direction: Vec2::ZERO,
            diameter: config.player_diameter,
            alive: true,
            score: 0,
            attacking: false,
            last_attack: f32::NEG_INFINITY,
            attack_count: 0,
            boosting: false,
            boost: Vec2::ZERO,
            boost_multiplier: 0.0,
            boost_remaining: 0.0,
            boost_score: 0.0,
            bot: None,
        }
    }

    /// Bot factory contract: a bot player with default stats and an id
    pub fn bot(id: EntityId, position: Vec2, initial_op: OpSet, config: &CellConfig) -> Self {
        let mut player = Self::human(id, position, config);
        player.mass = config.bot.mass;
        player.speed = config.bot.speed;
        player.diameter = config.bot.diameter;
        player.bot = Some(BotState {
            target_id: None,
            change_dir_prob: config.bot.change_dir_prob,
            repeat_op: initial_op,
            terrain_cooldown: 0,
        });
        player
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.diameter / 2.0
    }

    #[inline]
    pub fn is_bot(&self) -> bool {
        self.bot.is_some()
    }

    /// Alive, not tombstoned: participates in interactions this tick
    #[inline]
    pub fn interactive(&self) -> bool {
        self.alive && !self.core.delete
    }
}

/// Coin state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coin {
    pub core: EntityCore,
    pub value: u32,
    pub radius: f32,
    pub subtype: String,
}

impl Coin {
    /// Coin factory contract: create a coin given value, subtype, radius
    pub fn new(id: EntityId, position: Vec2, value: u32, radius: f32, subtype: &str) -> Self {
        Self {
            core: EntityCore::new(id, position),
            value,
            radius,
            subtype: subtype.to_string(),
        }
    }
}

/// Wave state. Multiplier and size are fixed at spawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    pub core: EntityCore,
    /// Downward velocity in pixels per second
    pub velocity: Vec2,
    /// Crest size (full boost segment length before edge margins)
    pub size: f32,
    /// Altitude-derived score/boost multiplier in [0, 1]
    pub multiplier: f32,
    /// Remaining lifespan in seconds
    pub lifespan: f32,
    /// Lifespan at spawn
    pub start_lifespan: f32,
}

/// Cell-local simulation state: one map per entity type, keyed by id,
/// mutated in place by the tick pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CellState {
    pub players: HashMap<EntityId, Player>,
    pub coins: HashMap<EntityId, Coin>,
    pub waves: HashMap<EntityId, Wave>,
    /// Ticks advanced since the cell came up
    pub tick: u64,
    /// Monotone sim-clock seconds, advanced by the measured tick dt
    pub clock: f32,
}

impl CellState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Player ids in ascending (lexicographic) order
    pub fn sorted_player_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.players.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Coin ids in ascending (lexicographic) order
    pub fn sorted_coin_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.coins.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Wave ids in ascending (lexicographic) order
    pub fn sorted_wave_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.waves.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn add_player(&mut self, player: Player) -> EntityId {
        let id = player.core.id;
        self.players.insert(id, player);
        id
    }

    pub fn add_coin(&mut self, coin: Coin) -> EntityId {
        let id = coin.core.id;
        self.coins.insert(id, coin);
        id
    }

    pub fn add_wave(&mut self, wave: Wave) -> EntityId {
        let id = wave.core.id;
        self.waves.insert(id, wave);
        id
    }

    pub fn remove_player(&mut self, id: EntityId) -> Option<Player> {
        self.players.remove(&id)
    }

    /// Live (alive, non-tombstoned) player count
    pub fn live_player_count(&self) -> usize {
        self.players.values().filter(|p| p.interactive()).count()
    }

    /// Live coin count, the number the spawn cap is checked against
    pub fn live_coin_count(&self) -> usize {
        self.coins.values().filter(|c| !c.core.delete).count()
    }

    pub fn live_wave_count(&self) -> usize {
        self.waves.values().filter(|w| !w.core.delete).count()
    }

    pub fn bot_count(&self) -> usize {
        self.players
            .values()
            .filter(|p| p.is_bot() && p.interactive())
            .count()
    }

    /// Membership-layer contract: remove tombstoned coins/waves and
    /// tombstoned or dead players, returning what was purged. The core
    /// never calls this itself; the external layer runs it after a tick.
    pub fn purge_removed(&mut self) -> Vec<EntityHandle> {
        let mut purged = Vec::new();
        self.players.retain(|&id, p| {
            if p.core.delete || !p.alive {
                purged.push(EntityHandle::player(id));
                false
            } else {
                true
            }
        });
        self.coins.retain(|&id, c| {
            if c.core.delete {
                purged.push(EntityHandle::coin(id));
                false
            } else {
                true
            }
        });
        self.waves.retain(|&id, w| {
            if w.core.delete {
                purged.push(EntityHandle::wave(id));
                false
            } else {
                true
            }
        });
        purged.sort_unstable();
        purged
    }
}
