use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use beamtag_core::game::player::Player;
use beamtag_core::game::state::GameState;

/// State shared between the gun loop and the network loop.
///
/// Both loops take the mutex only for complete updates, so neither can
/// observe the phase and the start time half-changed.
#[derive(Debug, Default)]
pub struct Session {
    /// Unassigned until the authority answers our hello.
    pub player: Option<Player>,
    pub game: GameState,
    /// Sender id stamped on outbound events: 0 until assignment, then the
    /// player id.
    pub sender_id: u32,
}

pub type SharedSession = Arc<Mutex<Session>>;

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current (team, player) identity, or `(0, 0)` before assignment.
    pub fn identity(&self) -> (u8, u8) {
        self.player.as_ref().map_or((0, 0), |p| (p.team_id, p.player_id))
    }
}

pub fn shared() -> SharedSession {
    Arc::new(Mutex::new(Session::new()))
}

/// Take the session lock, recovering the guard if a previous holder panicked.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_zero_zero_before_assignment() {
        let session = Session::new();
        assert_eq!(session.identity(), (0, 0));
        assert_eq!(session.sender_id, 0);
    }

    #[test]
    fn identity_follows_the_assigned_player() {
        let mut session = Session::new();
        session.player = Some(Player::new(2, 14));
        session.sender_id = 14;
        assert_eq!(session.identity(), (2, 14));
    }
}
