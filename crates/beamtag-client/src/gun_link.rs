//! The gun side of the client: serial transport, startup handshake, and the
//! blocking loop that turns gun telemetry into game state changes and
//! authority echoes.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use beamtag_core::game::logic::StandardGameLogic;
use beamtag_core::net::dispatch::Dispatcher;
use beamtag_core::net::messages::{self, Arg, num_field};
use beamtag_core::net::protocol::ProtocolError;

use crate::server_link::ServerLink;
use crate::session::{self, SharedSession};

/// Serial read timeout. Timeouts are recoverable: the reader just polls
/// again until a full line is in.
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// The line channel to the gun hardware.
///
/// The configured device is opened as a serial port; if that fails it is
/// opened as a plain file instead, which replays recorded telemetry with
/// writes dropped.
pub enum GunPort {
    Serial {
        port: Box<dyn SerialPort>,
        buf: Vec<u8>,
    },
    Replay {
        reader: Box<dyn BufRead + Send>,
    },
}

impl GunPort {
    pub fn open(device: &str, baud: u32) -> io::Result<Self> {
        match serialport::new(device, baud).timeout(READ_TIMEOUT).open() {
            Ok(port) => {
                tracing::info!(device, baud, "gun link on serial port");
                Ok(Self::Serial { port, buf: Vec::new() })
            },
            Err(serial_err) => match File::open(device) {
                Ok(file) => {
                    tracing::info!(device, "gun link replaying from file");
                    Ok(Self::Replay { reader: Box::new(BufReader::new(file)) })
                },
                Err(_) => Err(io::Error::other(format!(
                    "cannot open {device} as a serial port ({serial_err}) or as a file"
                ))),
            },
        }
    }

    /// A replay port fed from a string, for tests.
    #[cfg(test)]
    pub(crate) fn replay(lines: &str) -> Self {
        Self::Replay {
            reader: Box::new(io::Cursor::new(lines.to_string().into_bytes())),
        }
    }

    /// Block until one full line arrives, without its terminator. `Ok(None)`
    /// means the channel closed.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        match self {
            Self::Serial { port, buf } => loop {
                if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    return Ok(Some(String::from_utf8_lossy(&line).trim_end().to_string()));
                }
                let mut chunk = [0u8; 256];
                match port.read(&mut chunk) {
                    Ok(0) => return Ok(None),
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            },
            Self::Replay { reader } => {
                let mut line = String::new();
                if reader.read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                Ok(Some(line.trim_end().to_string()))
            },
        }
    }

    /// Send one line to the gun. Replay mode drops writes.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self {
            Self::Serial { port, .. } => {
                port.write_all(line.as_bytes())?;
                port.write_all(b"\n")?;
                port.flush()
            },
            Self::Replay { .. } => {
                tracing::debug!(line, "replay mode, gun write dropped");
                Ok(())
            },
        }
    }
}

#[derive(Debug)]
pub enum HandshakeError {
    /// The gun closed the channel before acknowledging.
    Closed,
    /// The gun answered with something other than the connect ack.
    BadAck(String),
    Io(io::Error),
    Protocol(ProtocolError),
}

impl std::fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "gun link closed before acknowledging connect"),
            Self::BadAck(line) => write!(f, "incorrect ack to connect: {line:?}"),
            Self::Io(e) => write!(f, "gun link i/o during handshake: {e}"),
            Self::Protocol(e) => write!(f, "gun link message error: {e}"),
        }
    }
}

impl std::error::Error for HandshakeError {}

impl From<io::Error> for HandshakeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Startup handshake: announce the client and require the gun's ack before
/// any loop runs. Failure here is fatal to startup.
pub fn handshake(port: &mut GunPort) -> Result<(), HandshakeError> {
    let connect = messages::CLIENT_CONNECT.build(&[]).map_err(HandshakeError::Protocol)?;
    port.write_line(&connect)?;
    let Some(line) = port.read_line()? else {
        return Err(HandshakeError::Closed);
    };
    if !messages::CLIENT_CONNECTED.is_match(&line) {
        return Err(HandshakeError::BadAck(line));
    }
    tracing::info!("gun link acknowledged connect");
    Ok(())
}

/// Everything a gun-telemetry action may touch. The loop owns the port, so
/// `fire` carries a gun-bound command out of dispatch for the loop to write.
struct GunCtx<'a> {
    session: &'a SharedSession,
    logic: &'a StandardGameLogic,
    fire: Option<String>,
}

fn gun_table<'a>() -> Dispatcher<GunCtx<'a>> {
    Dispatcher::new()
        .on(&messages::HIT, on_hit)
        .on(&messages::FULL_AMMO, on_full_ammo)
        .on(&messages::TRIGGER, on_trigger)
        .on(&messages::TRIGGER_RELEASE, on_trigger_release)
        .on(&messages::BATTERY, on_battery)
        .on(&messages::CORRUPT, on_corrupt)
}

fn on_hit(ctx: &mut GunCtx<'_>, fields: &[&str]) -> bool {
    let (Some(source_team), Some(source_player), Some(damage)) =
        (num_field(fields, 0), num_field(fields, 1), num_field(fields, 2))
    else {
        return false;
    };
    let mut guard = session::lock(ctx.session);
    let session = &mut *guard;
    let Some(player) = session.player.as_mut() else {
        tracing::debug!("hit before identity assignment");
        return true;
    };
    let died = ctx.logic.hit(
        &session.game,
        player,
        source_team as u8,
        source_player as u8,
        damage,
    );
    tracing::debug!(source_team, damage, health = player.health, "hit resolved");
    if died {
        tracing::info!("out of lives");
    }
    true
}

fn on_full_ammo(ctx: &mut GunCtx<'_>, _fields: &[&str]) -> bool {
    let mut guard = session::lock(ctx.session);
    let session = &mut *guard;
    let Some(player) = session.player.as_mut() else {
        tracing::debug!("full ammo before identity assignment");
        return true;
    };
    ctx.logic.full_ammo(&session.game, player);
    tracing::debug!(ammo = player.ammo, "full ammo");
    true
}

fn on_trigger(ctx: &mut GunCtx<'_>, _fields: &[&str]) -> bool {
    let mut guard = session::lock(ctx.session);
    let session = &mut *guard;
    let Some(player) = session.player.as_mut() else {
        tracing::debug!("trigger before identity assignment");
        return true;
    };
    if !ctx.logic.trigger(&session.game, player) {
        tracing::debug!(ammo = player.ammo, "trigger without a shot");
        return true;
    }
    player.ammo -= 1;
    let built = messages::FIRE.build(&[
        Arg::Num(u32::from(player.team_id)),
        Arg::Num(u32::from(player.player_id)),
        Arg::Num(player.gun_damage),
    ]);
    match built {
        Ok(line) => ctx.fire = Some(line),
        Err(e) => tracing::error!(error = %e, "failed to build fire command"),
    }
    true
}

fn on_trigger_release(_ctx: &mut GunCtx<'_>, _fields: &[&str]) -> bool {
    tracing::debug!("trigger released");
    true
}

fn on_battery(_ctx: &mut GunCtx<'_>, fields: &[&str]) -> bool {
    let Some(level) = num_field(fields, 0) else {
        return false;
    };
    tracing::info!(level, "gun battery report");
    true
}

fn on_corrupt(_ctx: &mut GunCtx<'_>, _fields: &[&str]) -> bool {
    tracing::warn!("gun reported a corrupt shot");
    true
}

/// Echo a line we sent to the gun up to the authority.
fn queue_sent_echo(session: &SharedSession, link: &ServerLink, line: &str) {
    let (team, player) = session::lock(session).identity();
    let built = messages::SENT.build(&[
        Arg::Num(u32::from(team)),
        Arg::Num(u32::from(player)),
        Arg::Text(line),
    ]);
    match built {
        Ok(payload) => link.queue_payload(session, payload),
        Err(e) => tracing::error!(error = %e, "failed to build sent echo"),
    }
}

/// Echo a raw gun line up to the authority.
fn queue_recv_echo(session: &SharedSession, link: &ServerLink, line: &str) {
    let (team, player) = session::lock(session).identity();
    let built = messages::RECV.build(&[
        Arg::Num(u32::from(team)),
        Arg::Num(u32::from(player)),
        Arg::Text(line),
    ]);
    match built {
        Ok(payload) => link.queue_payload(session, payload),
        Err(e) => tracing::error!(error = %e, "failed to build recv echo"),
    }
}

/// Drive the gun link until it closes: dispatch each telemetry line, then
/// forward the raw line to the authority whatever the dispatch outcome.
pub fn run_gun_loop(
    mut port: GunPort,
    session: SharedSession,
    logic: StandardGameLogic,
    link: ServerLink,
) -> io::Result<()> {
    let table = gun_table();
    let mut ctx = GunCtx {
        session: &session,
        logic: &logic,
        fire: None,
    };
    loop {
        let line = match port.read_line() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => return Err(e),
        };
        tracing::debug!(line = %line, "gun -> client");
        if !table.dispatch(&mut ctx, &line) {
            tracing::debug!(line = %line, "unhandled gun line");
        }
        if let Some(fire) = ctx.fire.take() {
            if let Err(e) = port.write_line(&fire) {
                tracing::warn!(error = %e, "gun write failed");
            } else {
                queue_sent_echo(&session, &link, &fire);
            }
        }
        queue_recv_echo(&session, &link, &line);
    }
    tracing::info!("gun link closed");
    match messages::CLIENT_DISCONNECT.build(&[]) {
        Ok(disconnect) => {
            if let Err(e) = port.write_line(&disconnect) {
                tracing::debug!(error = %e, "gun disconnect not delivered");
            }
        },
        Err(e) => tracing::error!(error = %e, "failed to build gun disconnect"),
    }
    Ok(())
}
