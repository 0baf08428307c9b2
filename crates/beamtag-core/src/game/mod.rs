pub mod logic;
pub mod player;
pub mod rules;
pub mod state;
