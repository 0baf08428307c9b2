use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use beamtag_core::game::state::GameState;

use crate::config::ServerConfig;
use crate::match_loop::MatchCommand;
use crate::roster::Roster;

pub type SharedRoster = Arc<RwLock<Roster>>;
pub type SharedGame = Arc<RwLock<GameState>>;

/// Shared state handed to every connection handler and the console.
#[derive(Clone)]
pub struct AppState {
    pub roster: SharedRoster,
    pub game: SharedGame,
    pub config: Arc<ServerConfig>,
    pub match_tx: mpsc::UnboundedSender<MatchCommand>,
}
