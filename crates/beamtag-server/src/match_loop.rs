//! The authoritative match clock.
//!
//! One task owns every game state transition: console and connection
//! handlers send commands here, and a timer tick ends matches whose duration
//! has run out. Each transition is broadcast to the roster as a control
//! message.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use beamtag_core::game::state::GamePhase;
use beamtag_core::net::messages::{self, Arg, MessageKind};
use beamtag_core::time::now_secs;

use crate::config::ServerConfig;
use crate::state::{SharedGame, SharedRoster};

#[derive(Debug)]
pub enum MatchCommand {
    /// Start a match; `None` uses the configured default duration.
    Start { duration_secs: Option<u32> },
    Stop,
    Reset,
}

/// Spawn the match clock task.
pub fn spawn(
    game: SharedGame,
    roster: SharedRoster,
    config: Arc<ServerConfig>,
) -> (mpsc::UnboundedSender<MatchCommand>, JoinHandle<()>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        run_match_loop(game, roster, config, cmd_rx).await;
    });
    (cmd_tx, handle)
}

async fn run_match_loop(
    game: SharedGame,
    roster: SharedRoster,
    config: Arc<ServerConfig>,
    mut cmd_rx: mpsc::UnboundedReceiver<MatchCommand>,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(config.game.timer_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let expired = game.read().await.expired(now_secs());
                if expired {
                    game.write().await.stop();
                    broadcast_build(&roster, &messages::STOP_GAME, &[]).await;
                    tracing::info!("match time expired");
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(MatchCommand::Start { duration_secs }) => {
                        start_match(&game, &roster, &config, duration_secs).await;
                    },
                    Some(MatchCommand::Stop) => {
                        game.write().await.stop();
                        broadcast_build(&roster, &messages::STOP_GAME, &[]).await;
                        tracing::info!("match stopped");
                    },
                    Some(MatchCommand::Reset) => {
                        game.write().await.reset();
                        broadcast_build(&roster, &messages::RESET_GAME, &[]).await;
                        tracing::info!("match reset");
                    },
                    None => break,
                }
            }
        }
    }
}

/// Start a match, resetting a previous one first if needed so clients see
/// the same transition sequence the authority applied.
async fn start_match(
    game: &SharedGame,
    roster: &SharedRoster,
    config: &ServerConfig,
    duration_secs: Option<u32>,
) {
    let duration = duration_secs.unwrap_or(config.game.default_duration_secs);

    if game.read().await.phase() != GamePhase::Idle {
        game.write().await.reset();
        broadcast_build(roster, &messages::RESET_GAME, &[]).await;
    }

    let started = {
        let mut state = game.write().await;
        state.configure(duration);
        state.start(now_secs())
    };
    match started {
        Ok(()) => {
            broadcast_build(roster, &messages::START_GAME, &[Arg::Num(duration)]).await;
            tracing::info!(duration_secs = duration, "match started");
        },
        Err(e) => tracing::error!(error = %e, "failed to start match"),
    }
}

/// Build a control payload and broadcast it, logging instead of sending if
/// the template rejects the fields.
async fn broadcast_build(roster: &SharedRoster, kind: &MessageKind, args: &[Arg<'_>]) {
    match kind.build(args) {
        Ok(payload) => roster.read().await.broadcast_line(&payload),
        Err(e) => tracing::error!(kind = kind.name(), error = %e, "failed to build broadcast"),
    }
}
