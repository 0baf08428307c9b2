//! Connected-player registry.
//!
//! A player record exists exactly as long as its connection: assignment
//! creates it, disconnect or a kick removes it. Each record carries the
//! outbound queue for that client, so control broadcasts are a walk over the
//! roster.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::mpsc;

/// Highest player id the authority will assign.
pub const MAX_PLAYER_ID: u8 = 32;

#[derive(Debug)]
pub struct PlayerEntry {
    pub team_id: u8,
    pub addr: SocketAddr,
    pub connected_at: f64,
    tx: mpsc::UnboundedSender<String>,
}

pub struct Roster {
    players: HashMap<u8, PlayerEntry>,
    team_count: u8,
    max_clients: usize,
    /// Total assignments ever made, for team rotation.
    assigned_total: u64,
}

impl Roster {
    pub fn new(team_count: u8, max_clients: usize) -> Self {
        Self {
            players: HashMap::new(),
            team_count,
            max_clients,
            assigned_total: 0,
        }
    }

    /// Assign the smallest free player id and the next team in rotation.
    /// `None` when the roster is full.
    pub fn assign(
        &mut self,
        addr: SocketAddr,
        connected_at: f64,
        tx: mpsc::UnboundedSender<String>,
    ) -> Option<(u8, u8)> {
        if self.players.len() >= self.max_clients {
            return None;
        }
        let player_id = (1..=MAX_PLAYER_ID).find(|id| !self.players.contains_key(id))?;
        let team_id = (self.assigned_total % u64::from(self.team_count)) as u8 + 1;
        self.assigned_total += 1;
        self.players.insert(
            player_id,
            PlayerEntry { team_id, addr, connected_at, tx },
        );
        Some((team_id, player_id))
    }

    pub fn remove(&mut self, player_id: u8) -> Option<PlayerEntry> {
        self.players.remove(&player_id)
    }

    pub fn contains(&self, player_id: u8) -> bool {
        self.players.contains_key(&player_id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Queue a payload to one player. False if the player is gone.
    pub fn send_to(&self, player_id: u8, payload: &str) -> bool {
        self.players
            .get(&player_id)
            .is_some_and(|entry| entry.tx.send(payload.to_string()).is_ok())
    }

    /// Queue a payload to every connected player.
    pub fn broadcast_line(&self, payload: &str) {
        for entry in self.players.values() {
            let _ = entry.tx.send(payload.to_string());
        }
    }

    /// Snapshot of (player id, team id, address), sorted by player id.
    pub fn list(&self) -> Vec<(u8, u8, SocketAddr)> {
        let mut players: Vec<_> = self
            .players
            .iter()
            .map(|(&id, entry)| (id, entry.team_id, entry.addr))
            .collect();
        players.sort_by_key(|&(id, _, _)| id);
        players
    }
}
