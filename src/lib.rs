//! Swell Cell Simulation Core
//!
//! Per-shard authoritative simulation for a continuously-running 2D
//! multiplayer world. The world is statically partitioned into rectangular
//! cells; a [`game::cell::CellController`] owns every entity inside its cell
//! (players, bots, coins, waves) and advances them once per fixed tick.
//!
//! Network transport, worker topology, and the membership layer that purges
//! tombstoned entities all live outside this crate; the controller exposes
//! the contracts they drive ([`game::state::CellState::purge_removed`],
//! [`game::grouping`]).

pub mod config;
pub mod util;
pub mod game;
pub mod metrics;
