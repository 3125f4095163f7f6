/// QuestCards — console table companion for the QuestCards board game
///
/// Architecture:
///   audio/     — rodio playback, remote TTS client, local fallback voice
///   console    — stdin commands, keyboard-wedge card reader, status output
///
/// Game logic lives in questcards-engine; this binary only wires it to
/// real devices.

mod audio;
mod console;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use questcards_common::AppConfig;
use questcards_engine::narration::NarrationQueue;
use questcards_engine::runtime::{Action, Runtime, RuntimeConfig};
use questcards_engine::scanner::ScanDispatcher;
use questcards_engine::session::Game;

use audio::{SoundEngine, SystemVoice, TtsClient};
use console::{CardDecoder, CardReader};

#[derive(Parser, Debug)]
#[command(name = "questcards")]
#[command(version, about = "QuestCards table companion: narration, turns and card scanning")]
struct Args {
    /// Configuration file
    #[arg(long, default_value = "questcards.toml")]
    config: PathBuf,

    /// Seed for reproducible events and shard schedules
    #[arg(long)]
    seed: Option<u64>,

    /// Never call the TTS provider or open an audio device
    #[arg(long)]
    mute: bool,

    /// Skip the intro and player-count screens
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    players: Option<u8>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Before the config load so its fallback message is printed
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("questcards=info")),
        )
        .init();

    tracing::info!("QuestCards v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.apply_env(|name| std::env::var(name).ok());

    let game = match args.seed {
        Some(seed) => {
            tracing::info!("Seed: {}", seed);
            Game::from_seed(seed)
        }
        None => Game::from_entropy(),
    };

    let reader = CardReader::new();
    let scanner = ScanDispatcher::new(
        reader.clone(),
        CardDecoder,
        Duration::from_millis(config.scan.rejected_hold_ms),
    );

    let (provider, output) = if args.mute {
        (TtsClient::disabled(), SoundEngine::silent())
    } else {
        (TtsClient::from_config(&config.narration), SoundEngine::new())
    };
    let voice = SystemVoice::new(config.narration.local_voice_command.as_deref());
    let narration = NarrationQueue::new(
        provider,
        output,
        voice,
        Duration::from_millis(config.narration.timeout_ms),
    );

    let runtime = Runtime::new(
        game,
        scanner,
        narration,
        RuntimeConfig {
            tick: Duration::from_millis(config.scan.tick_ms.max(1)),
            fade: Duration::from_millis(config.narration.fade_ms),
        },
    );

    let (actions, rx) = mpsc::channel(16);
    if let Some(players) = args.players {
        for action in [
            Action::StartGame,
            Action::Continue,
            Action::ChoosePlayers(players as usize),
        ] {
            actions.send(action).await.context("queueing startup actions")?;
        }
    }

    let mut state = runtime.subscribe();
    tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let text = console::describe(&state.borrow_and_update());
            println!("\n{}", text);
        }
    });

    println!("{}", console::HELP);
    tokio::spawn(console::read_input(actions, reader, runtime.subscribe()));

    let last = runtime.run(rx).await;
    tracing::info!(
        "Left at {:?} after {} round(s)",
        last.screen,
        last.rounds_completed
    );
    Ok(())
}
