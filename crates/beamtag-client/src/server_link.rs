//! The authority side of the client: outbound event queue and the network
//! read loop that mirrors authority control messages into the session.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;

use beamtag_core::game::player::Player;
use beamtag_core::game::rules::GameRules;
use beamtag_core::net::dispatch::Dispatcher;
use beamtag_core::net::messages::{self, num_field};
use beamtag_core::net::protocol::Event;
use beamtag_core::time::now_secs;

use crate::session::{self, SharedSession};

/// Handle for queueing events to the authority. Sends never block: a writer
/// task drains the queue onto the socket.
#[derive(Clone)]
pub struct ServerLink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ServerLink {
    /// Connect to the authority, returning the queue handle and the read
    /// half for the network loop.
    pub async fn connect(addr: &str) -> io::Result<(Self, BufReader<OwnedReadHalf>)> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_writer(write_half, rx);
        Ok((Self { tx }, BufReader::new(read_half)))
    }

    /// A link whose queue ends in a receiver instead of a socket.
    #[cfg(test)]
    pub(crate) fn for_test() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue one event for the authority.
    pub fn queue(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::warn!("authority writer is gone, dropping outbound event");
        }
    }

    /// Wrap a payload in an event stamped with the session's sender id and
    /// the current time, and queue it.
    pub fn queue_payload(&self, session: &SharedSession, payload: String) {
        let sender_id = session::lock(session).sender_id;
        self.queue(Event::new(sender_id, now_secs(), payload));
    }
}

fn spawn_writer(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Event>) {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let line = format!("{}\n", event.to_wire());
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });
}

/// Everything an authority-message action may touch.
pub struct AuthorityCtx<'a> {
    pub session: &'a SharedSession,
    pub rules: &'a GameRules,
}

/// The control-message table: identity assignment first, then the clock
/// transitions.
pub fn authority_table<'a>() -> Dispatcher<AuthorityCtx<'a>> {
    Dispatcher::new()
        .on(&messages::TEAM_PLAYER, on_team_player)
        .on(&messages::START_GAME, on_start_game)
        .on(&messages::STOP_GAME, on_stop_game)
        .on(&messages::RESET_GAME, on_reset_game)
        .on(&messages::DELETED, on_deleted)
}

fn on_team_player(ctx: &mut AuthorityCtx<'_>, fields: &[&str]) -> bool {
    let (Some(team), Some(player)) = (num_field(fields, 0), num_field(fields, 1)) else {
        return false;
    };
    let (Ok(team_id), Ok(player_id)) = (u8::try_from(team), u8::try_from(player)) else {
        return false;
    };
    let mut session = session::lock(ctx.session);
    session.player = Some(Player::with_rules(team_id, player_id, ctx.rules));
    session.sender_id = player;
    tracing::info!(team_id, player_id, "assigned identity");
    true
}

fn on_start_game(ctx: &mut AuthorityCtx<'_>, fields: &[&str]) -> bool {
    let mut session = session::lock(ctx.session);
    if let Some(duration) = num_field(fields, 0) {
        session.game.configure(duration);
    }
    match session.game.start(now_secs()) {
        Ok(()) => {
            tracing::info!(duration_secs = ?session.game.duration_secs(), "match started");
        },
        Err(e) => tracing::warn!(error = %e, "start from authority not applied"),
    }
    true
}

fn on_stop_game(ctx: &mut AuthorityCtx<'_>, _fields: &[&str]) -> bool {
    session::lock(ctx.session).game.stop();
    tracing::info!("match stopped");
    true
}

fn on_reset_game(ctx: &mut AuthorityCtx<'_>, _fields: &[&str]) -> bool {
    session::lock(ctx.session).game.reset();
    tracing::info!("match reset");
    true
}

fn on_deleted(ctx: &mut AuthorityCtx<'_>, _fields: &[&str]) -> bool {
    session::lock(ctx.session).game.stop();
    tracing::info!("removed by the authority, stopping match");
    true
}

/// Read authority events until the connection closes. Malformed lines are
/// logged and skipped; losing the connection stops the local match.
pub async fn network_loop<R>(reader: R, session: SharedSession, rules: GameRules)
where
    R: AsyncBufRead + Unpin,
{
    let table = authority_table();
    let mut ctx = AuthorityCtx { session: &session, rules: &rules };
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let event = match Event::parse(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "bad line from authority");
                continue;
            },
        };
        tracing::debug!(sender_id = event.sender_id, payload = %event.payload, "authority event");
        if !table.dispatch(&mut ctx, &event.payload) {
            tracing::debug!(payload = %event.payload, "unhandled authority message");
        }
    }
    tracing::info!("authority connection closed, stopping match");
    session::lock(&session).game.stop();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use beamtag_core::game::state::GamePhase;
    use beamtag_core::test_helpers::{running_state, stopped_state};

    use super::*;

    fn dispatch_one(session: &SharedSession, line: &str) -> bool {
        let rules = GameRules::default();
        let table = authority_table();
        let mut ctx = AuthorityCtx { session, rules: &rules };
        table.dispatch(&mut ctx, line)
    }

    #[test]
    fn team_player_assigns_identity_and_sender_id() {
        let session = session::shared();
        assert!(dispatch_one(&session, "TeamPlayer(2,14)"));

        let session = session::lock(&session);
        assert_eq!(session.identity(), (2, 14));
        assert_eq!(session.sender_id, 14);
        assert_eq!(session.player.as_ref().unwrap().health, 5);
    }

    #[test]
    fn reassignment_replaces_the_player() {
        let session = session::shared();
        assert!(dispatch_one(&session, "TeamPlayer(1,3)"));
        assert!(dispatch_one(&session, "TeamPlayer(2,7)"));
        assert_eq!(session::lock(&session).identity(), (2, 7));
    }

    #[test]
    fn oversized_player_id_is_declined() {
        let session = session::shared();
        assert!(!dispatch_one(&session, "TeamPlayer(1,300)"));
        assert_eq!(session::lock(&session).player, None);
    }

    #[test]
    fn start_game_with_duration_configures_and_starts() {
        let session = session::shared();
        assert!(dispatch_one(&session, "StartGame(90)"));

        let session = session::lock(&session);
        assert_eq!(session.game.phase(), GamePhase::Running);
        assert_eq!(session.game.duration_secs(), Some(90));
    }

    #[test]
    fn start_game_with_empty_duration_uses_the_configured_one() {
        let session = session::shared();
        session::lock(&session).game.configure(45);

        assert!(dispatch_one(&session, "StartGame()"));
        let session = session::lock(&session);
        assert_eq!(session.game.phase(), GamePhase::Running);
        assert_eq!(session.game.duration_secs(), Some(45));
    }

    #[test]
    fn start_game_without_any_duration_is_consumed_but_not_applied() {
        let session = session::shared();
        assert!(dispatch_one(&session, "StartGame()"));
        assert_eq!(session::lock(&session).game.phase(), GamePhase::Idle);
    }

    #[test]
    fn stop_game_stops_and_stays_stopped() {
        let session = session::shared();
        session::lock(&session).game = running_state(120);

        assert!(dispatch_one(&session, "StopGame()"));
        assert_eq!(session::lock(&session).game.phase(), GamePhase::Stopped);

        assert!(dispatch_one(&session, "StopGame()"));
        assert_eq!(session::lock(&session).game.phase(), GamePhase::Stopped);
    }

    #[test]
    fn reset_game_reenters_idle() {
        let session = session::shared();
        session::lock(&session).game = stopped_state(120);

        assert!(dispatch_one(&session, "ResetGame()"));
        let session = session::lock(&session);
        assert_eq!(session.game.phase(), GamePhase::Idle);
        assert_eq!(session.game.duration_secs(), Some(120));
    }

    #[test]
    fn deleted_stops_the_match() {
        let session = session::shared();
        session::lock(&session).game = running_state(120);

        assert!(dispatch_one(&session, "Deleted()"));
        assert_eq!(session::lock(&session).game.phase(), GamePhase::Stopped);
    }

    #[test]
    fn telemetry_payloads_are_not_control_messages() {
        let session = session::shared();
        assert!(!dispatch_one(&session, "Hello()"));
        assert!(!dispatch_one(&session, "Recv(1,2,T)"));
    }

    #[tokio::test]
    async fn network_loop_applies_events_and_stops_on_eof() {
        let (client, mut authority) = tokio::io::duplex(1024);
        let session = session::shared();

        authority
            .write_all(
                concat!(
                    "E(0,1.000000,TeamPlayer(1,7))\n",
                    "not an event\n",
                    "E(0,2.000000,StartGame(90))\n",
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        drop(authority);

        network_loop(BufReader::new(client), Arc::clone(&session), GameRules::default()).await;

        let session = session::lock(&session);
        assert_eq!(session.identity(), (1, 7));
        assert_eq!(session.sender_id, 7);
        assert_eq!(session.game.duration_secs(), Some(90));
        // The lost connection stopped the mirrored match.
        assert_eq!(session.game.phase(), GamePhase::Stopped);
    }
}
