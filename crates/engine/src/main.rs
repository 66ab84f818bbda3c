//! Statecraft Engine - headless terminal runner.
//!
//! Reads player input from stdin:
//!
//! - any plain line is the order for the next turn
//! - `/queue <order>` queues a structured order for the next turn
//! - `/msg Nation, Nation: text` writes to other nations
//! - `/read Nation, Nation` marks that thread as read
//! - `/status` prints the nation summary
//! - `/quit` exits

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use statecraft_domain::turn::threads;
use statecraft_domain::{GameState, PlayerOrder};
use statecraft_engine::infrastructure::{
    clock::SystemClock,
    config::{build_gateway, AppConfig},
    memory_repo::InMemoryGameRepo,
    ports::{ClockPort, GameRepo},
    saved_games::SqliteGameRepo,
};
use statecraft_engine::use_cases::session::{GameSession, Notification, SessionError};
use statecraft_engine::use_cases::turn::TurnOutcome;
use statecraft_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root (the engine may be run from `crates/engine`).
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statecraft_engine=debug,statecraft_domain=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Statecraft Engine");

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());

    let repo: Arc<dyn GameRepo> = match &config.save_db_path {
        Some(path) => {
            tracing::info!(path = %path, "Saving games to SQLite");
            Arc::new(
                SqliteGameRepo::new(path, clock.clone())
                    .await
                    .context("Failed to open save database")?,
            )
        }
        None => {
            tracing::warn!("SAVE_DB_PATH not set, games are kept in memory only");
            Arc::new(InMemoryGameRepo::new())
        }
    };

    let llm = build_gateway(&config.llm)?;
    let app = App::with_clock(llm, repo, clock, config.chaos);

    let (session, mut notifications) = match config.game_id {
        Some(game_id) => app
            .load_session(game_id)
            .await
            .with_context(|| format!("Failed to resume game {game_id}"))?,
        None => app
            .new_session(&config.player_nation)
            .context("Failed to start a new game")?,
    };
    let session = Arc::new(session);

    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            match notification {
                Notification::SaveFailed { game_id, error } => {
                    println!("! Save failed for game {game_id}: {error}");
                }
            }
        }
    });

    let state = session.snapshot().await;
    println!("Game {} - you lead {}.", session.game_id(), state.player_nation);
    print_status(&state);

    let mut queued: Vec<String> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Command::Quit => break,
            Command::Status => print_status(&session.snapshot().await),
            Command::Queue(order) => {
                queued.push(order);
                println!("Queued {} order(s) for next turn.", queued.len());
            }
            Command::Read(participants) => {
                let marked = session.mark_thread_read(&participants).await;
                println!("Marked {marked} message(s) as read.");
            }
            Command::Message { targets, text } => {
                let session = session.clone();
                tokio::spawn(async move {
                    match session.send_message(&targets, &text).await {
                        Ok(outcome) => {
                            print_new_messages(&session.snapshot().await, outcome.delivered);
                            if let Some(reason) = outcome.degraded {
                                println!("! No replies: {reason}");
                            }
                        }
                        Err(e) => println!("! Message not sent: {e}"),
                    }
                });
            }
            Command::Turn(text) => {
                let order = PlayerOrder::new(text).with_queued(std::mem::take(&mut queued));
                match session.submit_turn(order).await {
                    Ok(outcome) => {
                        print_turn(&outcome);
                        if outcome.state.is_game_over() {
                            break;
                        }
                    }
                    Err(SessionError::Turn(e)) => {
                        println!("! {e}");
                        break;
                    }
                    Err(e) => println!("! {e}"),
                }
            }
        }
    }

    tracing::info!(game_id = %session.game_id(), usage = session.usage_count(), "Exiting");
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Command {
    Turn(String),
    Queue(String),
    Message { targets: Vec<String>, text: String },
    Read(Vec<String>),
    Status,
    Quit,
}

fn parse_command(line: &str) -> Command {
    let split_names = |names: &str| -> Vec<String> {
        names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    };

    if let Some(rest) = line.strip_prefix("/msg ") {
        let (names, text) = rest.split_once(':').unwrap_or((rest, ""));
        return Command::Message {
            targets: split_names(names),
            text: text.trim().to_string(),
        };
    }
    if let Some(rest) = line.strip_prefix("/read ") {
        return Command::Read(split_names(rest));
    }
    if let Some(rest) = line.strip_prefix("/queue ") {
        return Command::Queue(rest.trim().to_string());
    }
    match line {
        "/quit" | "/exit" => Command::Quit,
        "/status" => Command::Status,
        _ => Command::Turn(line.to_string()),
    }
}

fn print_status(state: &GameState) {
    let stats = &state.stats;
    println!(
        "{} | turn {} | tension {} economy {} military {} popularity {} corruption {}",
        state.current_date,
        state.turn,
        stats.tension,
        stats.economy,
        stats.military,
        stats.popularity,
        stats.corruption
    );
    println!(
        "Territories: {} | nuclear: {} | space program: {} | unread: {}",
        state.player_territories().collect::<Vec<_>>().join(", "),
        state.has_nuclear,
        state.has_space_program,
        state.unread_message_count()
    );
    if let Some(alliance) = &state.alliance {
        println!("Alliance: {} led by {}", alliance.name(), alliance.leader());
    }
    let open_threads = threads(state);
    if !open_threads.is_empty() {
        let names: Vec<String> = open_threads
            .iter()
            .map(|thread| {
                thread
                    .participants()
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect();
        println!("Threads: {}", names.join(" | "));
    }
}

fn print_turn(outcome: &TurnOutcome) {
    for event in &outcome.new_events {
        println!("[{}] {} - {}", event.category, event.headline, event.description);
    }
    if let Some(reason) = &outcome.degraded {
        println!("! The narrative service was unavailable ({reason}); a quiet turn was played.");
    }
    print_status(&outcome.state);
    if let Some(reason) = outcome.state.game_over_reason() {
        println!("GAME OVER: {reason}");
    }
}

fn print_new_messages(state: &GameState, count: usize) {
    let skip = state.chat_history.len().saturating_sub(count);
    for message in &state.chat_history[skip..] {
        println!("<{}> {}", message.sender_nation, message.text);
    }
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
