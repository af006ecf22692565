use clap::Parser;
use client::game::BoardView;
use client::network::{ActionWriter, Connection, EventReader};
use log::{info, warn};
use rand::seq::SliceRandom;
use shared::{player_color, Action, PlayerId, ServerEvent, Verb};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:65432")]
    server: String,

    /// Board size the server was started with (display only)
    #[arg(short, long, default_value_t = shared::DEFAULT_BOARD_SIZE)]
    board_size: usize,

    /// Play automatically instead of reading commands from stdin
    #[arg(long)]
    bot: bool,

    /// How long the bot holds a cell before claiming, in milliseconds
    #[arg(long, default_value_t = shared::DEFAULT_HOLD_MS)]
    hold_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    info!("connecting to {}", args.server);
    let connection = Connection::connect(&args.server).await?;
    let (player_id, reader, writer) = connection.into_parts();
    println!(
        "joined as player {} ({})",
        player_id,
        player_color(player_id)
    );

    let view = Arc::new(Mutex::new(BoardView::new(args.board_size)));
    let reader_task = tokio::spawn(watch_events(reader, Arc::clone(&view), player_id));

    if args.bot {
        run_bot(writer, Arc::clone(&view), player_id, args.hold_ms).await?;
    } else {
        println!("commands: hold <row> <col> | claim <row> <col> | release <row> <col>");
        run_interactive(writer, Arc::clone(&view)).await?;
    }

    reader_task.abort();
    Ok(())
}

/// Applies every broadcast to the local view and narrates it.
async fn watch_events(mut reader: EventReader, view: Arc<Mutex<BoardView>>, player_id: PlayerId) {
    loop {
        match reader.next_event().await {
            Ok(Some(event)) => {
                let mut view = view.lock().await;
                view.apply(&event);
                match event {
                    ServerEvent::Update {
                        verb,
                        row,
                        col,
                        player_id: actor,
                    } => {
                        println!(
                            "{} {} ({}, {})",
                            player_color(actor),
                            verb,
                            row,
                            col
                        );
                        println!("{}", view.render());
                    }
                    ServerEvent::Win { winner: Some(id) } if id == player_id => {
                        println!("game over: you win!");
                        return;
                    }
                    ServerEvent::Win { winner: Some(id) } => {
                        println!("game over: player {} ({}) wins", id, player_color(id));
                        return;
                    }
                    ServerEvent::Win { winner: None } => {
                        println!("game over: tie");
                        return;
                    }
                    ServerEvent::Accept { .. } | ServerEvent::Reject => {}
                }
            }
            Ok(None) => {
                println!("server closed the connection");
                return;
            }
            Err(e) => {
                warn!("read failed: {}", e);
                return;
            }
        }
    }
}

/// Reads `<verb> <row> <col>` commands from stdin and forwards them.
async fn run_interactive(
    mut writer: ActionWriter,
    view: Arc<Mutex<BoardView>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = stdin.next_line().await? {
        if view.lock().await.finished() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.parse::<Action>() {
            Ok(action) => writer.send(action).await?,
            Err(e) => println!("bad command ({}); try: hold 2 3", e),
        }
    }
    Ok(())
}

/// Holds a random free cell, waits out the hold timeout, claims it,
/// repeats until the game ends.
async fn run_bot(
    mut writer: ActionWriter,
    view: Arc<Mutex<BoardView>>,
    player_id: PlayerId,
    hold_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("bot mode: holding each cell for {}ms", hold_ms);

    loop {
        let target = {
            let view = view.lock().await;
            if view.finished() {
                return Ok(());
            }
            view.free_cells()
                .choose(&mut rand::thread_rng())
                .copied()
        };

        let Some((row, col)) = target else {
            // Nothing free right now; wait for releases or the win message
            sleep(Duration::from_millis(hold_ms)).await;
            continue;
        };

        writer.send(Action::new(Verb::Hold, row, col)).await?;
        sleep(Duration::from_millis(hold_ms)).await;

        // Only claim if the hold actually won the cell
        let held_by_us = view.lock().await.cell(row, col).holder == Some(player_id);
        if held_by_us {
            writer.send(Action::new(Verb::Claim, row, col)).await?;
        }
    }
}
