//! Match lifecycle: Idle -> Running -> Stopped, with `reset` re-entering
//! Idle. The authority's copy is the source of truth; clients mirror it by
//! applying the control messages it broadcasts.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    Idle,
    Running,
    Stopped,
}

#[derive(Debug)]
pub enum GameStateError {
    /// Start was requested before any duration was configured.
    DurationNotSet,
    /// Start was requested outside the Idle phase.
    NotIdle(GamePhase),
}

impl std::fmt::Display for GameStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DurationNotSet => write!(f, "no game duration configured"),
            Self::NotIdle(phase) => write!(f, "cannot start from {phase:?}, reset first"),
        }
    }
}

impl std::error::Error for GameStateError {}

#[derive(Debug, Clone, Default)]
pub struct GameState {
    phase: GamePhase,
    duration_secs: Option<u32>,
    started_at: Option<f64>,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    pub fn duration_secs(&self) -> Option<u32> {
        self.duration_secs
    }

    pub fn started_at(&self) -> Option<f64> {
        self.started_at
    }

    /// Set the match duration. Valid in any phase; never changes the phase.
    pub fn configure(&mut self, duration_secs: u32) {
        self.duration_secs = Some(duration_secs);
    }

    /// Begin the match clock at `now`. Requires a configured duration and the
    /// Idle phase; the phase and start time change together.
    pub fn start(&mut self, now: f64) -> Result<(), GameStateError> {
        if self.phase != GamePhase::Idle {
            return Err(GameStateError::NotIdle(self.phase));
        }
        if self.duration_secs.is_none() {
            return Err(GameStateError::DurationNotSet);
        }
        self.phase = GamePhase::Running;
        self.started_at = Some(now);
        Ok(())
    }

    /// End the match. Idempotent and valid from any phase.
    pub fn stop(&mut self) {
        self.phase = GamePhase::Stopped;
        self.started_at = None;
    }

    /// Return to Idle for a new match. The configured duration is kept.
    pub fn reset(&mut self) {
        self.phase = GamePhase::Idle;
        self.started_at = None;
    }

    /// Whether a running clock has used up the configured duration.
    pub fn expired(&self, now: f64) -> bool {
        match (self.phase, self.started_at, self.duration_secs) {
            (GamePhase::Running, Some(started), Some(duration)) => {
                now - started >= f64::from(duration)
            },
            _ => false,
        }
    }

    /// Seconds left on a running clock, rounded up. `None` unless running.
    pub fn remaining_secs(&self, now: f64) -> Option<u32> {
        match (self.phase, self.started_at, self.duration_secs) {
            (GamePhase::Running, Some(started), Some(duration)) => {
                let left = f64::from(duration) - (now - started);
                Some(left.max(0.0).ceil() as u32)
            },
            _ => None,
        }
    }
}
