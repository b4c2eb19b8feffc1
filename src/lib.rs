use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::prelude::*;
use tracing::{info, warn};

pub mod alerts;
pub mod app;
pub mod cli;
pub mod completion;
pub mod config;
pub mod mode;
pub mod quotes;
pub mod scene;
pub mod session;
pub mod settings;
pub mod spotify;
pub mod store;
pub mod timer;
pub mod ui;

pub use cli::{Cli, Command};

use crate::app::{Action, AppState, SpotifyConfig, TICK_RATE, TerminalEffects};
use crate::completion::CompletionHandler;
use crate::session::Session;
use crate::settings::{SettingsError, SettingsPatch, SettingsStore, SoundSettingsPatch, TimerSettingsPatch};
use crate::spotify::{Spotify, SpotifyClient, StaticToken};
use crate::store::{JsonDirStore, KeyValueStore, MemoryStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
    #[error("spotify error: {0}")]
    Spotify(String),
    #[error("{0}")]
    Usage(String),
}

// The TUI owns the terminal, so interactive runs log to a file.
fn init_tracing(data_dir: &Path, interactive: bool) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact();
    let res = if interactive && std::fs::create_dir_all(data_dir).is_ok() {
        builder
            .with_ansi(false)
            .with_writer(tracing_appender::rolling::never(data_dir, config::LOG_FILE))
            .try_init()
    } else {
        builder.with_writer(io::stderr).try_init()
    };
    if res.is_err() {
        eprintln!("tracing already initialised");
    }
}

fn open_store(cli: &Cli, data_dir: &Path) -> Result<Arc<dyn KeyValueStore>, AppError> {
    if cli.ephemeral {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(JsonDirStore::open(data_dir)?))
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    let data_dir = config::resolve_data_dir(cli.data_dir.clone());
    init_tracing(&data_dir, cli.command.is_none());
    info!(dir = %data_dir.display(), ephemeral = cli.ephemeral, "starting tomatick");

    let kv = open_store(&cli, &data_dir)?;

    if let Some(cmd) = &cli.command {
        return run_command(cmd, &cli, kv);
    }

    let mut settings = SettingsStore::load(kv.clone());
    apply_overrides(&mut settings, &cli)?;

    let (completion, app_rng) = match cli.seed {
        Some(seed) => (
            CompletionHandler::seeded(seed),
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        ),
        None => (CompletionHandler::from_entropy(), StdRng::from_entropy()),
    };
    let session = Session::new(settings, completion);
    let spotify = build_spotify(&cli, kv).await?;

    let mut app = AppState::new(
        session,
        spotify,
        SpotifyConfig {
            client_id: cli.spotify_client_id.clone(),
            redirect_uri: cli.spotify_redirect_uri.clone(),
        },
        TerminalEffects::new(true),
        app_rng,
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = event_loop(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    info!("bye");
    res
}

fn run_command(cmd: &Command, cli: &Cli, kv: Arc<dyn KeyValueStore>) -> Result<(), AppError> {
    match cmd {
        Command::Show => {
            print_settings(&SettingsStore::load(kv))?;
        }
        Command::Set { kind, patch } => {
            let patch = SettingsPatch::from_json(*kind, patch)
                .map_err(|e| AppError::Usage(format!("invalid patch: {e}")))?;
            let mut settings = SettingsStore::load(kv);
            settings.update_partial(&patch)?;
            print_settings(&settings)?;
        }
        Command::Reset { yes } => {
            if !yes {
                return Err(AppError::Usage(
                    "reset restores timer and general settings; pass --yes to confirm".into(),
                ));
            }
            let mut settings = SettingsStore::load(kv);
            settings.reset_to_defaults()?;
            print_settings(&settings)?;
        }
        Command::AuthUrl => {
            let client_id = cli.spotify_client_id.as_deref().ok_or_else(|| {
                AppError::Usage("set --spotify-client-id or SPOTIFY_CLIENT_ID".into())
            })?;
            let url = spotify::authorize_url(client_id, &cli.spotify_redirect_uri)
                .map_err(|e| AppError::Spotify(e.to_string()))?;
            println!("{url}");
        }
    }
    Ok(())
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsDoc<'a> {
    timer_settings: &'a settings::TimerSettings,
    sound_settings: &'a settings::SoundSettings,
    general_settings: &'a settings::GeneralSettings,
}

fn print_settings(settings: &SettingsStore) -> Result<(), AppError> {
    let doc = SettingsDoc {
        timer_settings: settings.timers(),
        sound_settings: settings.sounds(),
        general_settings: settings.general(),
    };
    let text = serde_json::to_string_pretty(&doc)
        .map_err(|e| AppError::Config(format!("serialize settings failed: {e}")))?;
    println!("{text}");
    Ok(())
}

/// Command-line durations and `--no-sound` are saved like any other edit.
fn apply_overrides(settings: &mut SettingsStore, cli: &Cli) -> Result<(), AppError> {
    let mut patches = Vec::new();
    if cli.work.is_some() || cli.short.is_some() || cli.long.is_some() {
        patches.push(SettingsPatch::Timers(TimerSettingsPatch {
            pomodoro: cli.work,
            short: cli.short,
            long: cli.long,
            custom: None,
        }));
    }
    if cli.no_sound {
        patches.push(SettingsPatch::Sounds(SoundSettingsPatch {
            enabled: Some(false),
            ..Default::default()
        }));
    }
    for patch in patches {
        match settings.update_partial(&patch) {
            Ok(()) => {}
            Err(SettingsError::Store(e)) => warn!(error = %e, "override applied but not saved"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn build_spotify(cli: &Cli, kv: Arc<dyn KeyValueStore>) -> Result<Spotify, AppError> {
    if cli.spotify_client_id.is_none() {
        info!("spotify integration disabled: no client id");
        return Ok(Spotify::disabled());
    }
    let client = SpotifyClient::new(&cli.spotify_api_base)
        .map_err(|e| AppError::Spotify(e.to_string()))?;
    let mut spotify = Spotify::new(Arc::new(client), kv);

    if let Some(token) = &cli.spotify_token {
        if let Err(e) = spotify.connect(&StaticToken(token.clone())).await {
            warn!(error = %e, "spotify token rejected");
        }
    } else if spotify.restore() {
        info!("spotify reconnected with cached token");
    }
    Ok(spotify)
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
) -> Result<(), AppError> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui::render(f, app))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.handle_input(key) {
                        Action::Quit => return Ok(()),
                        Action::ConnectSpotify(input) => app.connect_spotify(input).await,
                        Action::None => {}
                    }
                }
            }
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= TICK_RATE {
            app.update(elapsed);
            last_tick = Instant::now();
        }
    }
}
