use tracing_subscriber::EnvFilter;

use beamtag_server::config::ServerConfig;
use beamtag_server::{build_state, console, run};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = ServerConfig::load();
    for arg in std::env::args().skip(1) {
        if let Some(addr) = arg.strip_prefix("--listen=") {
            config.listen_addr = addr.to_string();
        }
    }
    config.validate();

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "cannot bind listener");
            std::process::exit(1);
        },
    };
    tracing::info!(addr = %config.listen_addr, "authority listening");

    let (state, _match_clock) = build_state(config);
    console::spawn_console(state.clone());
    run(listener, state).await;
}
