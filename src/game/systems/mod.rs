pub mod movement;
pub mod collision;
pub mod bots;
pub mod waves;
pub mod coins;
