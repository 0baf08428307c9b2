//! Admin console on stdin: match control, roster inspection, kicks.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use beamtag_core::net::messages;

use crate::match_loop::MatchCommand;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start(Option<u32>),
    Stop,
    Reset,
    List,
    Kick(u8),
    Quit,
}

/// Parse one console line. `None` for anything unrecognized.
pub fn parse_command(line: &str) -> Option<ConsoleCommand> {
    let mut parts = line.split_whitespace();
    let command = parts.next()?;
    let arg = parts.next();
    if parts.next().is_some() {
        return None;
    }
    match (command, arg) {
        ("start", None) => Some(ConsoleCommand::Start(None)),
        ("start", Some(secs)) => secs.parse().ok().map(|secs| ConsoleCommand::Start(Some(secs))),
        ("stop", None) => Some(ConsoleCommand::Stop),
        ("reset", None) => Some(ConsoleCommand::Reset),
        ("list", None) => Some(ConsoleCommand::List),
        ("kick", Some(id)) => id.parse().ok().map(ConsoleCommand::Kick),
        ("quit", None) => Some(ConsoleCommand::Quit),
        _ => None,
    }
}

/// Apply one parsed command.
pub async fn handle_command(state: &AppState, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Start(duration_secs) => {
            let _ = state.match_tx.send(MatchCommand::Start { duration_secs });
        },
        ConsoleCommand::Stop => {
            let _ = state.match_tx.send(MatchCommand::Stop);
        },
        ConsoleCommand::Reset => {
            let _ = state.match_tx.send(MatchCommand::Reset);
        },
        ConsoleCommand::List => {
            let roster = state.roster.read().await;
            tracing::info!(players = roster.len(), "roster");
            for (player_id, team_id, addr) in roster.list() {
                tracing::info!(player_id, team_id, %addr, "player");
            }
        },
        ConsoleCommand::Kick(player_id) => {
            let mut roster = state.roster.write().await;
            if !roster.contains(player_id) {
                tracing::warn!(player_id, "no such player to kick");
                return;
            }
            match messages::DELETED.build(&[]) {
                Ok(payload) => {
                    roster.send_to(player_id, &payload);
                },
                Err(e) => tracing::error!(error = %e, "failed to build deleted notice"),
            }
            roster.remove(player_id);
            tracing::info!(player_id, "player kicked");
        },
        ConsoleCommand::Quit => {
            tracing::info!("console quit, shutting down");
            std::process::exit(0);
        },
    }
}

/// Drive the console from stdin until it closes.
pub fn spawn_console(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match parse_command(line) {
                Some(command) => handle_command(&state, command).await,
                None => tracing::warn!(
                    line,
                    "unknown command (start [secs] | stop | reset | list | kick <player> | quit)"
                ),
            }
        }
    })
}
