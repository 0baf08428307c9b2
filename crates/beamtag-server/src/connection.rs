//! Per-client connection handling.
//!
//! Each connection gets a read loop and a writer task joined by an unbounded
//! queue of payloads. The writer wraps every payload in an authority event
//! stamped at send time, so queueing never blocks a handler.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;

use beamtag_core::net::messages::{self, Arg, MessageKind};
use beamtag_core::net::protocol::{AUTHORITY_ID, Event};
use beamtag_core::time::now_secs;

use crate::state::AppState;

/// Serve one client connection until it closes.
pub async fn handle_client(stream: TcpStream, addr: SocketAddr, state: AppState) {
    let (read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    spawn_writer(write_half, rx);

    tracing::info!(%addr, "client connected");

    let mut assigned: Option<(u8, u8)> = None;
    let mut lines = BufReader::new(read_half).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let event = match Event::parse(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(%addr, error = %e, "bad line from client");
                continue;
            },
        };
        if !handle_payload(&event, &tx, &mut assigned, addr, &state).await {
            break;
        }
    }

    if let Some((team_id, player_id)) = assigned.take()
        && state.roster.write().await.remove(player_id).is_some()
    {
        tracing::info!(player_id, team_id, %addr, "player disconnected");
    } else {
        tracing::info!(%addr, "client disconnected");
    }
}

/// Handle one event's payload. Returns whether the connection should keep
/// being served.
async fn handle_payload(
    event: &Event,
    tx: &mpsc::UnboundedSender<String>,
    assigned: &mut Option<(u8, u8)>,
    addr: SocketAddr,
    state: &AppState,
) -> bool {
    let payload = event.payload.as_str();

    if messages::HELLO.is_match(payload) {
        return handle_hello(tx, assigned, addr, state).await;
    }

    if let Some(fields) = messages::RECV.parse(payload) {
        tracing::info!(
            sender_id = event.sender_id,
            team = fields[0],
            player = fields[1],
            line = fields[2],
            "gun telemetry",
        );
        return true;
    }

    if let Some(fields) = messages::SENT.parse(payload) {
        tracing::info!(
            sender_id = event.sender_id,
            team = fields[0],
            player = fields[1],
            line = fields[2],
            "gun command echo",
        );
        return true;
    }

    tracing::debug!(sender_id = event.sender_id, payload, "unhandled client message");
    true
}

/// Answer a hello with an identity assignment, resending the existing one on
/// a repeat. A kicked client that hellos again is assigned afresh; a full
/// roster gets a deleted notice and the connection is dropped.
async fn handle_hello(
    tx: &mpsc::UnboundedSender<String>,
    assigned: &mut Option<(u8, u8)>,
    addr: SocketAddr,
    state: &AppState,
) -> bool {
    let current = match *assigned {
        Some((team_id, player_id)) if state.roster.read().await.contains(player_id) => {
            Some((team_id, player_id))
        },
        _ => None,
    };

    let (team_id, player_id) = match current {
        Some(identity) => identity,
        None => {
            let slot = state.roster.write().await.assign(addr, now_secs(), tx.clone());
            match slot {
                Some(identity) => {
                    *assigned = Some(identity);
                    tracing::info!(
                        player_id = identity.1,
                        team_id = identity.0,
                        %addr,
                        "player joined",
                    );
                    identity
                },
                None => {
                    tracing::warn!(%addr, "roster full, refusing client");
                    send_build(tx, &messages::DELETED, &[]);
                    return false;
                },
            }
        },
    };

    send_build(
        tx,
        &messages::TEAM_PLAYER,
        &[Arg::Num(u32::from(team_id)), Arg::Num(u32::from(player_id))],
    );

    // A joiner during a running match needs the clock too.
    let remaining = state.game.read().await.remaining_secs(now_secs());
    if let Some(remaining) = remaining {
        send_build(tx, &messages::START_GAME, &[Arg::Num(remaining)]);
    }
    true
}

/// Build a payload for one client, logging instead of sending if the
/// template rejects the fields.
fn send_build(tx: &mpsc::UnboundedSender<String>, kind: &MessageKind, args: &[Arg<'_>]) {
    match kind.build(args) {
        Ok(payload) => {
            let _ = tx.send(payload);
        },
        Err(e) => tracing::error!(kind = kind.name(), error = %e, "failed to build message"),
    }
}

fn spawn_writer(mut write_half: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let event = Event::new(AUTHORITY_ID, now_secs(), payload);
            let line = format!("{}\n", event.to_wire());
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
    });
}
