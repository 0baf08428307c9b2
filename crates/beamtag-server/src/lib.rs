pub mod config;
pub mod connection;
pub mod console;
pub mod match_loop;
pub mod roster;
pub mod state;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use beamtag_core::game::state::GameState;

use config::ServerConfig;
use roster::Roster;
use state::AppState;

/// Wire up shared state and spawn the match clock.
pub fn build_state(config: ServerConfig) -> (AppState, JoinHandle<()>) {
    let config = Arc::new(config);
    let roster = Arc::new(RwLock::new(Roster::new(
        config.game.team_count,
        config.limits.max_clients,
    )));
    let game = Arc::new(RwLock::new(GameState::new()));
    let (match_tx, handle) = match_loop::spawn(
        Arc::clone(&game),
        Arc::clone(&roster),
        Arc::clone(&config),
    );
    (AppState { roster, game, config, match_tx }, handle)
}

/// Accept clients forever, one task per connection.
pub async fn run(listener: TcpListener, state: AppState) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    connection::handle_client(stream, addr, state).await;
                });
            },
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
            },
        }
    }
}
