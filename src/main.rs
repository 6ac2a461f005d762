use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tile_2048::engine::{Difficulty, Direction, MoveOutcome, Session, Status};
use tile_2048::history::History;
use tile_2048::serialization::{self, FileStore};

#[derive(Parser, Debug)]
#[command(name = "tile-2048", about = "Play 2048 in the terminal")]
struct Args {
    /// Grid size for a new game (resumes keep their saved size).
    #[arg(long, value_parser = clap::value_parser!(u8).range(4..=8))]
    size: Option<u8>,
    /// Hard mode: every spawned tile is a 2.
    #[arg(long)]
    hard: bool,
    /// Save file (session, config, best scores).
    #[arg(long, default_value = "tile-2048-save.json")]
    save: PathBuf,
    /// Seed the RNG for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    let args = Args::parse();

    let mut store = FileStore::open(&args.save).unwrap_or_else(|e| {
        eprintln!("save file unusable ({e}); starting over");
        FileStore::create(&args.save)
    });
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut config = serialization::load_config(&store);
    if args.hard {
        config.difficulty = Difficulty::Hard;
    }
    if let Some(size) = args.size {
        config.size = size as usize;
    }

    let mut session = match args.size {
        // An explicit size always starts a new game at that size.
        Some(size) => Session::fresh(size as usize, config.difficulty, &mut rng),
        None => serialization::resume_or_fresh(&store, &config, &mut rng),
    };
    let mut history = History::new();
    let mut won_announced = false;

    if let Err(e) = serialization::save_config(&mut store, &config) {
        eprintln!("could not store config: {e}");
    }
    checkpoint(&mut store, &session);

    println!("w/a/s/d move, u undo, n new game, q quit");
    loop {
        let best = serialization::load_best(&store, session.size());
        println!("{session}");
        println!("Score: {}  Best: {}", session.score(), best);

        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }
        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() || input.is_empty() {
            break;
        }

        let dir = match input.trim() {
            "w" => Direction::Up,
            "a" => Direction::Left,
            "s" => Direction::Down,
            "d" => Direction::Right,
            "u" => {
                match history.restore() {
                    Some(previous) => {
                        session = previous;
                        won_announced = false;
                        checkpoint(&mut store, &session);
                        println!("Move undone.");
                    }
                    None => println!("Nothing to undo."),
                }
                continue;
            }
            "n" => {
                session = Session::fresh(config.size, config.difficulty, &mut rng);
                history.clear();
                won_announced = false;
                checkpoint(&mut store, &session);
                println!("New game.");
                continue;
            }
            "q" => break,
            "" => continue,
            other => {
                println!("Unknown command {other:?}.");
                continue;
            }
        };

        history.snapshot(&session);
        match session.apply_move(dir, config.difficulty, &mut rng) {
            MoveOutcome::Moved { status, .. } => {
                serialization::update_best(&mut store, session.size(), session.score());
                checkpoint(&mut store, &session);
                match status {
                    Status::Won if !won_announced => {
                        won_announced = true;
                        println!("🎉 You made 2048! Keep going or start fresh.");
                    }
                    Status::Lost => println!("💀 Game over: no moves left. Undo still works."),
                    _ => {}
                }
            }
            MoveOutcome::Blocked => println!("Move blocked."),
        }
    }

    checkpoint(&mut store, &session);
    println!(
        "Final score {} (highest tile {}).",
        session.score(),
        session.highest_tile()
    );
}

/// Save the session and flush the store; persistence failures never stop play.
fn checkpoint(store: &mut FileStore, session: &Session) {
    if let Err(e) = serialization::save_session(store, session) {
        eprintln!("could not serialize session: {e}");
        return;
    }
    if let Err(e) = store.persist() {
        eprintln!("could not write save file: {e}");
    }
}
