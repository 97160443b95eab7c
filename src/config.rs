//! Cell configuration
//!
//! All tunables consumed by the simulation core, with environment
//! overrides. Invalid overrides are logged and ignored; structural
//! violations (coin weights not summing to 1, non-positive dimensions)
//! are fatal at validation time.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::constants::{attack, bot, coin, player, terrain, tick, wave, world};

/// Configuration invariant violations. These are configuration errors,
/// not runtime conditions, and abort controller construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value})")]
    NonPositive { field: &'static str, value: f32 },
    #[error("no coin archetypes configured")]
    NoArchetypes,
    #[error("coin archetype weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f32 },
    #[error("cell dimensions {cell_width}x{cell_height} exceed world {world_width}x{world_height}")]
    CellExceedsWorld {
        cell_width: f32,
        cell_height: f32,
        world_width: f32,
        world_height: f32,
    },
}

/// One coin archetype: relative spawn probability plus the stats handed
/// to the coin factory on spawn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoinArchetype {
    pub probability: f32,
    pub value: u32,
    pub radius: f32,
    pub subtype: String,
}

impl CoinArchetype {
    pub fn new(probability: f32, value: u32, radius: f32, subtype: &str) -> Self {
        Self {
            probability,
            value,
            radius,
            subtype: subtype.to_string(),
        }
    }
}

/// Coin spawn policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinConfig {
    /// Seconds that must elapse between spawns
    pub spawn_interval: f32,
    /// Maximum live coins in the cell
    pub cap: usize,
    /// Archetype table; probabilities must sum to 1
    pub archetypes: Vec<CoinArchetype>,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            spawn_interval: coin::SPAWN_INTERVAL,
            cap: coin::CAP,
            archetypes: vec![
                CoinArchetype::new(0.6, 1, 10.0, "bronze"),
                CoinArchetype::new(0.25, 5, 12.0, "silver"),
                CoinArchetype::new(0.1, 20, 14.0, "gold"),
                CoinArchetype::new(0.05, 50, 16.0, "pearl"),
            ],
        }
    }
}

/// Bot population defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub count: usize,
    pub speed: f32,
    pub mass: f32,
    pub diameter: f32,
    /// Per-tick probability of picking a fresh random direction
    pub change_dir_prob: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            count: bot::COUNT,
            speed: bot::SPEED,
            mass: bot::MASS,
            diameter: bot::DIAMETER,
            change_dir_prob: bot::CHANGE_DIR_PROB,
        }
    }
}

/// Wave generation policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Seconds between wave spawns
    pub spawn_interval: f32,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            spawn_interval: wave::SPAWN_INTERVAL,
        }
    }
}

/// Full per-cell configuration, read-only for the simulation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellConfig {
    /// World width in pixels
    pub world_width: f32,
    /// World height in pixels
    pub world_height: f32,
    /// Width of the rectangular cell this controller owns
    pub cell_width: f32,
    /// Height of the rectangular cell this controller owns
    pub cell_height: f32,
    /// Fixed tick period in seconds
    pub tick_interval: f32,
    pub coin: CoinConfig,
    pub bot: BotConfig,
    pub wave: WaveConfig,
    /// Minimum seconds between player attacks
    pub attack_timeout: f32,
    /// Height of the beach terrain band at the bottom of the world
    pub beach_size: f32,
    /// Default player stats applied on session attach
    pub player_speed: f32,
    pub player_mass: f32,
    pub player_diameter: f32,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            world_width: world::WIDTH,
            world_height: world::HEIGHT,
            cell_width: world::WIDTH,
            cell_height: world::HEIGHT,
            tick_interval: tick::DT,
            coin: CoinConfig::default(),
            bot: BotConfig::default(),
            wave: WaveConfig::default(),
            attack_timeout: attack::TIMEOUT,
            beach_size: terrain::BEACH_SIZE,
            player_speed: player::SPEED,
            player_mass: player::MASS,
            player_diameter: player::DIAMETER,
        }
    }
}

impl CellConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        read_f32("WORLD_WIDTH", &mut config.world_width);
        read_f32("WORLD_HEIGHT", &mut config.world_height);
        read_f32("CELL_WIDTH", &mut config.cell_width);
        read_f32("CELL_HEIGHT", &mut config.cell_height);
        read_f32("COIN_SPAWN_INTERVAL", &mut config.coin.spawn_interval);
        read_usize("COIN_CAP", &mut config.coin.cap);
        read_usize("BOT_COUNT", &mut config.bot.count);
        read_f32("BOT_SPEED", &mut config.bot.speed);
        read_f32("BOT_CHANGE_DIR_PROB", &mut config.bot.change_dir_prob);
        read_f32("WAVE_SPAWN_INTERVAL", &mut config.wave.spawn_interval);
        read_f32("ATTACK_TIMEOUT", &mut config.attack_timeout);
        read_f32("BEACH_SIZE", &mut config.beach_size);

        if let Ok(raw) = std::env::var("COIN_ARCHETYPES") {
            match serde_json::from_str::<Vec<CoinArchetype>>(&raw) {
                Ok(archetypes) if !archetypes.is_empty() => config.coin.archetypes = archetypes,
                Ok(_) => tracing::warn!("COIN_ARCHETYPES is empty, using defaults"),
                Err(e) => tracing::warn!("Invalid COIN_ARCHETYPES ({}), using defaults", e),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("world_width", self.world_width),
            ("world_height", self.world_height),
            ("cell_width", self.cell_width),
            ("cell_height", self.cell_height),
            ("tick_interval", self.tick_interval),
            ("coin.spawn_interval", self.coin.spawn_interval),
            ("wave.spawn_interval", self.wave.spawn_interval),
            ("attack_timeout", self.attack_timeout),
            ("beach_size", self.beach_size),
            ("bot.speed", self.bot.speed),
            ("bot.mass", self.bot.mass),
            ("bot.diameter", self.bot.diameter),
            ("player_speed", self.player_speed),
            ("player_mass", self.player_mass),
            ("player_diameter", self.player_diameter),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }

        if self.cell_width > self.world_width || self.cell_height > self.world_height {
            return Err(ConfigError::CellExceedsWorld {
                cell_width: self.cell_width,
                cell_height: self.cell_height,
                world_width: self.world_width,
                world_height: self.world_height,
            });
        }

        validate_archetypes(&self.coin.archetypes)
    }
}

/// Archetype table invariant: weights must sum to 1.
pub fn validate_archetypes(archetypes: &[CoinArchetype]) -> Result<(), ConfigError> {
    if archetypes.is_empty() {
        return Err(ConfigError::NoArchetypes);
    }
    let sum: f32 = archetypes.iter().map(|a| a.probability).sum();
    if (sum - 1.0).abs() > 1e-3 {
        return Err(ConfigError::WeightSum { sum });
    }
    Ok(())
}

fn read_f32(var: &str, slot: &mut f32) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse::<f32>() {
            Ok(parsed) if parsed > 0.0 => *slot = parsed,
            _ => tracing::warn!("Invalid {} '{}', using default", var, raw),
        }
    }
}

fn read_usize(var: &str, slot: &mut usize) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse::<usize>() {
            Ok(parsed) if parsed > 0 => *slot = parsed,
            _ => tracing::warn!("Invalid {} '{}', using default", var, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CellConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = CellConfig::load_or_default();
        assert!(config.world_width > 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let config = CellConfig::default();
        let sum: f32 = config.coin.archetypes.iter().map(|a| a.probability).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weight_sum_violation_is_fatal() {
        let mut config = CellConfig::default();
        config.coin.archetypes = vec![
            CoinArchetype::new(0.5, 1, 10.0, "bronze"),
            CoinArchetype::new(0.4, 5, 12.0, "silver"),
        ];
        match config.validate() {
            Err(ConfigError::WeightSum { sum }) => assert!((sum - 0.9).abs() < 1e-6),
            other => panic!("expected WeightSum error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_archetypes_rejected() {
        let mut config = CellConfig::default();
        config.coin.archetypes.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoArchetypes)));
    }

    #[test]
    fn test_non_positive_dimension_rejected() {
        let mut config = CellConfig::default();
        config.world_width = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { field: "world_width", .. })
        ));
    }

    #[test]
    fn test_cell_larger_than_world_rejected() {
        let mut config = CellConfig::default();
        config.cell_width = config.world_width * 2.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CellExceedsWorld { .. })
        ));
    }

    #[test]
    fn test_archetype_json_round_trip() {
        let archetypes = CellConfig::default().coin.archetypes;
        let json = serde_json::to_string(&archetypes).unwrap();
        let parsed: Vec<CoinArchetype> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, archetypes);
    }
}
