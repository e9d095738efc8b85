use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skakbord_core::board::STARTING_POSITION_FEN;
use skakbord_core::game::Game;
use skakbord_server::server::Server;

/// Host a single game of chess over TCP for two players and any number of
/// spectators.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Port to listen on.
    #[arg(default_value_t = 40000)]
    port: u16,

    /// Position to start from, in FEN.
    #[arg(default_value = STARTING_POSITION_FEN)]
    position: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let game = Game::from_fen(&args.position)
        .with_context(|| format!("invalid starting position {:?}", args.position))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let mut server = Server::bind(addr, game)
        .with_context(|| format!("could not listen on port {}", args.port))?;

    info!("server started on port {}", args.port);
    server.run().context("server failed")?;

    Ok(())
}
