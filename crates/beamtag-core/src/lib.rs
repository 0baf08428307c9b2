pub mod game;
pub mod net;
pub mod time;

/// Test fixture helpers shared across the workspace.
///
/// Available in unit tests and to dependent crates via the `test-helpers`
/// feature.
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game::player::Player;
    use crate::game::state::GameState;

    /// A player with the default rules and the given identity.
    pub fn make_player(team_id: u8, player_id: u8) -> Player {
        Player::new(team_id, player_id)
    }

    /// A game configured for `duration_secs` and started with its clock at 0.
    pub fn running_state(duration_secs: u32) -> GameState {
        let mut state = GameState::new();
        state.configure(duration_secs);
        state.start(0.0).expect("fresh state starts");
        state
    }

    /// A game that ran and has been stopped.
    pub fn stopped_state(duration_secs: u32) -> GameState {
        let mut state = running_state(duration_secs);
        state.stop();
        state
    }
}
