pub mod constants;
pub mod state;
pub mod spatial;
pub mod systems;
pub mod grouping;
pub mod cell;
