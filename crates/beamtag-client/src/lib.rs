pub mod config;
pub mod gun_link;
pub mod server_link;
pub mod session;
