use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use beamtag_core::game::logic::StandardGameLogic;
use beamtag_core::net::messages;
use beamtag_core::net::protocol::Event;
use beamtag_core::time::now_secs;

use beamtag_client::config::ClientConfig;
use beamtag_client::gun_link::{self, GunPort};
use beamtag_client::server_link::{self, ServerLink};
use beamtag_client::session;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = ClientConfig::load();
    for arg in std::env::args().skip(1) {
        if let Some(addr) = arg.strip_prefix("--server=") {
            config.server_addr = addr.to_string();
        } else if let Some(device) = arg.strip_prefix("--serial=") {
            config.serial.device = device.to_string();
        }
    }
    config.validate();

    let (link, reader) = match ServerLink::connect(&config.server_addr).await {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(addr = %config.server_addr, error = %e, "cannot reach the authority");
            std::process::exit(1);
        },
    };
    tracing::info!(addr = %config.server_addr, "connected to the authority");

    // Announce ourselves; the authority answers with a TeamPlayer assignment.
    match messages::HELLO.build(&[]) {
        Ok(payload) => link.queue(Event::new(0, now_secs(), payload)),
        Err(e) => tracing::error!(error = %e, "failed to build hello"),
    }

    let mut port = match GunPort::open(&config.serial.device, config.serial.baud) {
        Ok(port) => port,
        Err(e) => {
            tracing::error!(error = %e, "cannot open the gun link");
            std::process::exit(1);
        },
    };
    if let Err(e) = gun_link::handshake(&mut port) {
        tracing::error!(error = %e, "gun link handshake failed");
        std::process::exit(1);
    }

    let session = session::shared();
    let logic = StandardGameLogic::new(config.rules.clone());

    tokio::spawn(server_link::network_loop(
        reader,
        Arc::clone(&session),
        config.rules.clone(),
    ));

    let gun_session = Arc::clone(&session);
    let gun_loop =
        tokio::task::spawn_blocking(move || gun_link::run_gun_loop(port, gun_session, logic, link));

    match gun_loop.await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => tracing::error!(error = %e, "gun loop failed"),
        Err(e) => tracing::error!(error = %e, "gun loop panicked"),
    }
    tracing::info!("client shut down");
}
