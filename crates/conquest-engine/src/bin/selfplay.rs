//! Bot-only match runner.
//!
//! Generates a board, seats one greedy bot per player, and plays until someone owns the map or
//! the turn cap is reached.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use conquest_core::{generate, GameRng, GreedyBot, MapGenConfig, PlayerSetup};
use conquest_engine::{spawn, BotDriver, EngineConfig, FileRecordingPicker, GameController};
use conquest_protocol::GameEvent;

#[derive(Parser)]
#[command(name = "conquest-selfplay")]
#[command(about = "Play a hex conquest match between bots", version)]
struct Cli {
    /// Seed for board generation and dice
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Number of bot players
    #[arg(long, default_value_t = 4)]
    players: u8,

    /// Board radius in hexes
    #[arg(long, default_value_t = 3)]
    radius: u32,

    /// Stop after this many rounds
    #[arg(long, default_value_t = 300)]
    max_turns: u32,

    /// Lowest capture probability a bot will attack at
    #[arg(long, default_value_t = 0.35)]
    min_capture_chance: f64,

    /// Engine config (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a recording of the finished match here
    #[arg(long)]
    record: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "conquest_engine=debug,conquest_core=debug"
    } else {
        "conquest_engine=info,conquest_core=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let mapgen = MapGenConfig {
        radius: cli.radius,
        players: (1..=cli.players)
            .map(|i| PlayerSetup::bot(format!("Bot {i}")))
            .collect(),
        rules: config.rules,
        ..MapGenConfig::default()
    };
    let mut rng = GameRng::seed_from_u64(cli.seed);
    let state = generate(&mapgen, &mut rng).context("Failed to generate board")?;
    info!(
        seed = cli.seed,
        territories = state.territories().len(),
        regions = state.map().regions().len(),
        players = state.players().len(),
        "board generated"
    );

    let controller = GameController::new(state, cli.seed, &config);
    let mut events = controller.subscribe();
    let (handle, controller_task) = spawn(controller);

    let log_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match &event {
                GameEvent::GameEnded { .. } | GameEvent::PlayerEliminated { .. } => {
                    info!(?event, "event")
                }
                _ => debug!(?event, "event"),
            }
        }
        if events.dropped() > 0 {
            warn!(dropped = events.dropped(), "event log incomplete");
        }
    });

    handle.start().await?;

    let bot = Arc::new(GreedyBot::new(cli.min_capture_chance));
    let drivers: Vec<_> = handle
        .state()
        .state
        .players()
        .iter()
        .filter(|p| p.is_bot)
        .map(|p| {
            BotDriver::new(handle.clone(), p.id, bot.clone(), config.bot_timeout()).spawn()
        })
        .collect();

    let mut updates = handle.watch_state();
    loop {
        let (over, turn) = {
            let update = updates.borrow_and_update();
            (update.state.is_over(), update.state.turn())
        };
        if over || turn > cli.max_turns {
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }

    let last = handle.state();
    match last.state.winner() {
        Some(winner) => {
            let name = last.state.player(winner).map_or("?", |p| p.name.as_str());
            info!(winner = %winner, turn = last.state.turn(), "match decided");
            println!("{name} wins on turn {}", last.state.turn());
        }
        None => {
            info!(turn = last.state.turn(), "turn cap reached");
            println!("No winner after {} turns", cli.max_turns);
        }
    }

    if let Some(path) = &cli.record {
        handle
            .save_recording(&FileRecordingPicker::new(path))
            .await
            .with_context(|| format!("Failed to save recording to {}", path.display()))?;
        println!("Recording written to {}", path.display());
    }

    for driver in drivers {
        driver.abort();
    }
    drop(handle);
    controller_task.await.context("Controller task failed")?;
    log_task.await.context("Event log task failed")?;
    Ok(())
}
