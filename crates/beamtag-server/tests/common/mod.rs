//! Shared helpers for authority integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use beamtag_core::net::messages;
use beamtag_core::net::protocol::Event;

use beamtag_server::config::{GameConfig, ServerConfig};
use beamtag_server::state::AppState;
use beamtag_server::{build_state, run};

pub struct TestAuthority {
    pub addr: SocketAddr,
    pub state: AppState,
    _server: tokio::task::JoinHandle<()>,
    _match_clock: tokio::task::JoinHandle<()>,
}

impl TestAuthority {
    /// Start an authority on an ephemeral port with a fast match timer.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig {
            game: GameConfig {
                timer_interval_ms: 20,
                ..GameConfig::default()
            },
            ..ServerConfig::default()
        })
        .await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let (state, match_clock) = build_state(config);
        let server_state = state.clone();
        let server = tokio::spawn(async move {
            run(listener, server_state).await;
        });
        // Give the accept loop a moment to come up.
        tokio::time::sleep(Duration::from_millis(20)).await;
        Self {
            addr,
            state,
            _server: server,
            _match_clock: match_clock,
        }
    }
}

/// A line-framed client speaking the event envelope.
pub struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write_half: OwnedWriteHalf,
    pub sender_id: u32,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to authority");
        let (read_half, write_half) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            write_half,
            sender_id: 0,
        }
    }

    /// Send a payload wrapped in an event from this client.
    pub async fn send(&mut self, payload: &str) {
        let event = Event::new(self.sender_id, 1.0, payload);
        self.send_raw(&format!("{}\n", event.to_wire())).await;
    }

    pub async fn send_raw(&mut self, line: &str) {
        self.write_half
            .write_all(line.as_bytes())
            .await
            .expect("write to authority");
    }

    /// Read the next event from the authority, panicking after 5 seconds.
    pub async fn next_event(&mut self) -> Event {
        let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for an authority event")
            .expect("read from authority")
            .expect("authority closed the connection");
        Event::parse(&line).expect("authority sent a malformed event")
    }

    /// Read one event if any arrives within `timeout_ms`.
    pub async fn try_next_event(&mut self, timeout_ms: u64) -> Option<Event> {
        match tokio::time::timeout(Duration::from_millis(timeout_ms), self.lines.next_line()).await
        {
            Ok(Ok(Some(line))) => Some(Event::parse(&line).expect("malformed authority event")),
            _ => None,
        }
    }

    /// Wait for the authority to close this connection.
    pub async fn expect_close(&mut self) {
        let line = tokio::time::timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("timed out waiting for the authority to close")
            .expect("read from authority");
        assert_eq!(line, None, "expected the connection to close");
    }

    /// Say hello and return the assigned (team, player).
    pub async fn join(&mut self) -> (u8, u8) {
        self.send(&messages::HELLO.build(&[]).unwrap()).await;
        let event = self.next_event().await;
        let fields = messages::TEAM_PLAYER
            .parse(&event.payload)
            .unwrap_or_else(|| panic!("expected TeamPlayer, got {}", event.payload));
        let team: u8 = fields[0].parse().unwrap();
        let player: u8 = fields[1].parse().unwrap();
        self.sender_id = u32::from(player);
        (team, player)
    }
}
