//! Attha command line
//!
//! Runs computer-only games locally or across two processes:
//!
//! - `attha demo --players 4 --seed 7` plays a local game to the end
//! - `attha host --bind 0.0.0.0:9870` waits for a guest and plays the first color
//! - `attha join --url ws://HOST:9870` joins a host and plays the second color

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use attha::{
    VERSION,
    core::hash::to_hex,
    game::{
        events::GameEventData,
        snapshot::Snapshot,
        turn::{Game, GameConfig},
        Color,
    },
    network::{
        peer::{self, PeerConfig},
        session::{PeerRole, PeerSession},
    },
};

#[derive(Parser, Debug)]
#[command(name = "attha", version, about = "Attha board game engine")]
struct Cli {
    /// Dice seed; defaults to the current time
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Pause between actions like a person watching would need
    #[arg(long, global = true)]
    realtime: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a local computer-only game
    Demo {
        /// 2 or 4
        #[arg(long, default_value_t = 2)]
        players: usize,
        /// Continue from a snapshot file
        #[arg(long)]
        resume: Option<PathBuf>,
        /// Write the final snapshot here
        #[arg(long)]
        save: Option<PathBuf>,
        /// Give up after this many actions
        #[arg(long, default_value_t = 50_000)]
        max_actions: usize,
    },
    /// Host an online game and wait for a guest
    Host {
        /// Listen address
        #[arg(long, default_value = "127.0.0.1:9870")]
        bind: String,
    },
    /// Join a hosted game
    Join {
        /// Host URL, e.g. ws://127.0.0.1:9870
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let seed = cli.seed.unwrap_or_else(|| chrono::Utc::now().timestamp_millis() as u64);
    info!("Attha v{} (seed {})", VERSION, seed);

    match cli.command {
        Command::Demo { players, resume, save, max_actions } => {
            demo(players, seed, cli.realtime, resume, save, max_actions).await
        }
        Command::Host { bind } => {
            let config = peer_config(bind, cli.realtime);
            let listener = peer::bind(&config.bind_addr).await?;
            let mut link = peer::accept(&listener, &config).await?;
            let mut session = PeerSession::new(PeerRole::Host, seed);
            let winner = peer::run_computer_peer(&mut session, &mut link, &config).await?;
            report_online(&session, winner);
            link.close();
            Ok(())
        }
        Command::Join { url } => {
            let config = peer_config(String::new(), cli.realtime);
            let mut link = peer::connect(&url, &config).await?;
            let mut session = PeerSession::new(PeerRole::Guest, seed);
            let winner = peer::run_computer_peer(&mut session, &mut link, &config).await?;
            report_online(&session, winner);
            link.close();
            Ok(())
        }
    }
}

fn peer_config(bind_addr: String, realtime: bool) -> PeerConfig {
    let mut config = PeerConfig { bind_addr, ..Default::default() };
    if !realtime {
        config.pass_delay = std::time::Duration::ZERO;
        config.computer_delay = std::time::Duration::ZERO;
    }
    config
}

fn report_online(session: &PeerSession, winner: Option<Color>) {
    match winner {
        Some(winner) => info!("{} wins", winner),
        None => info!("No winner ({:?})", session.status()),
    }
    if let Some(hash) = session.state_hash() {
        info!("Final state hash: {}", hash);
    }
}

/// Play a computer-only game to the end.
async fn demo(
    players: usize,
    seed: u64,
    realtime: bool,
    resume: Option<PathBuf>,
    save: Option<PathBuf>,
    max_actions: usize,
) -> Result<()> {
    let config = GameConfig {
        player_count: players,
        computer: Color::turn_order(players).unwrap_or_default(),
        seed,
        ..Default::default()
    };

    let mut game = match resume {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let snapshot = Snapshot::from_json(&json)?;
            info!("Resuming from {} (saved {})", path.display(), snapshot.saved_at);
            Game::from_snapshot(snapshot, seed)?
        }
        None => Game::new(&config)?,
    };

    info!("=== Starting Demo Game ===");
    let mut actions = 0;
    while game.winner().is_none() && actions < max_actions {
        if realtime {
            let delay = if game.phase() == attha::game::TurnPhase::TurnOver {
                config.pass_delay
            } else {
                config.computer_delay
            };
            tokio::time::sleep(delay).await;
        }

        let Some(action) = game.computer_step()? else {
            bail!("computer stalled in phase {:?}", game.phase());
        };
        debug!(color = %game.current_color(), ?action, "Action");
        actions += 1;

        for event in game.take_events() {
            match event.data {
                GameEventData::Captured { victim, coins } => {
                    info!("{} captured {} coin(s) of {}", event.color, coins.len(), victim)
                }
                GameEventData::ReachedHeaven { coins } => {
                    info!("{} brought {} coin(s) to heaven", event.color, coins.len())
                }
                GameEventData::BonusForfeited { discarded } => {
                    info!("{} forfeited {:?}", event.color, discarded)
                }
                _ => {}
            }
        }
    }

    match game.winner() {
        Some(_) => info!("{} after {} actions", game.message(), actions),
        None => info!("Stopped after {} actions without a winner", actions),
    }
    for player in &game.state().players {
        info!("{}: {} of 4 coins in heaven", player.color, player.heaven_count());
    }
    info!("Final state hash: {}", to_hex(&game.state().compute_hash()));

    if let Some(path) = save {
        let json = game.snapshot().to_json()?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        info!("Snapshot saved to {}", path.display());
    }
    Ok(())
}
