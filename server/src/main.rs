use clap::Parser;
use log::info;
use server::network::Server;
use server::session::{GameConfig, Session};
use std::sync::Arc;
use std::time::Duration;

/// Parses command-line arguments, builds the shared session, and runs the
/// listener until it fails or ctrl-c arrives.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[derive(Parser, Debug)]
    #[command(author, version, about, long_about = None)]
    struct Args {
        /// Server IP address to bind to
        #[arg(short = 'H', long, default_value = "0.0.0.0")]
        host: String,

        /// Server port to listen on
        #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
        port: u16,

        /// Board size (the board is size x size)
        #[arg(short, long, default_value_t = shared::DEFAULT_BOARD_SIZE)]
        board_size: usize,

        /// Minimum players required before actions count
        #[arg(long, default_value_t = shared::DEFAULT_MIN_PLAYERS)]
        min_players: usize,

        /// Maximum players admitted to one game
        #[arg(long, default_value_t = shared::DEFAULT_MAX_PLAYERS)]
        max_players: usize,

        /// Hold-to-claim timeout in milliseconds
        #[arg(long, default_value_t = shared::DEFAULT_HOLD_MS)]
        hold_ms: u64,
    }

    env_logger::init();
    let args = Args::parse();

    let config = GameConfig {
        board_size: args.board_size,
        min_players: args.min_players,
        max_players: args.max_players,
        hold_timeout: Duration::from_millis(args.hold_ms),
    };
    info!(
        "starting {}x{} game for {}-{} players",
        config.board_size, config.board_size, config.min_players, config.max_players
    );

    let session = Arc::new(Session::new(config)?);
    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, session).await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c, shutting down");
            Ok(())
        }
    }
}
