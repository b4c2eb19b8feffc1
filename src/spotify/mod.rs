//! Spotify "now playing" integration.
//!
//! Once connected, the adapter polls the currently-playing endpoint every
//! [`POLL_INTERVAL`] and publishes the result into a shared [`NowPlaying`]
//! view. Every failure degrades to "nothing playing"; nothing is retried
//! before the next scheduled poll.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::KeyValueStore;

pub mod api;
pub mod auth;

pub use api::{CurrentlyPlaying, PlaybackApi, PlaybackCommand, SpotifyClient, SpotifyError, Track};
pub use auth::{AuthError, AuthorizationProvider, RedirectUrl, StaticToken, authorize_url};

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const REFRESH_DELAY: Duration = Duration::from_millis(500);
pub const TOKEN_KEY: &str = "spotifyToken";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NowPlaying {
    pub track: Option<Track>,
    pub is_playing: bool,
    /// Percent of the track played, 0..=100.
    pub progress: f64,
}

impl NowPlaying {
    fn from_response(cp: Option<CurrentlyPlaying>) -> Self {
        let Some(cp) = cp else {
            return Self::default();
        };
        let Some(track) = cp.item else {
            return Self::default();
        };
        let progress = match (cp.progress_ms, track.duration_ms) {
            (Some(p), d) if d > 0 => (p as f64 / d as f64 * 100.0).clamp(0.0, 100.0),
            _ => 0.0,
        };
        Self {
            track: Some(track),
            is_playing: cp.is_playing,
            progress,
        }
    }
}

#[derive(Debug, Default)]
struct View {
    now: NowPlaying,
    applied_seq: u64,
}

/// Everything a poll or control task needs; cheap to clone into tasks.
#[derive(Clone)]
struct Poller {
    api: Arc<dyn PlaybackApi>,
    token: String,
    view: Arc<Mutex<View>>,
    seq: Arc<AtomicU64>,
    cancel: CancellationToken,
}

impl Poller {
    async fn refresh(&self) {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let next = match self.api.currently_playing(&self.token).await {
            Ok(cp) => NowPlaying::from_response(cp),
            Err(e) if e.is_unauthorized() => {
                warn!(error = %e, "spotify rejected the access token");
                NowPlaying::default()
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch spotify playback");
                NowPlaying::default()
            }
        };
        self.apply(seq, next);
    }

    // Overlapping polls may finish out of order; only the newest request wins.
    fn apply(&self, seq: u64, next: NowPlaying) {
        if let Ok(mut view) = self.view.lock() {
            // checked under the lock: `stop` cancels before it resets the view
            if self.cancel.is_cancelled() {
                debug!(seq, "dropping playback response from a closed connection");
                return;
            }
            if seq <= view.applied_seq {
                debug!(seq, applied = view.applied_seq, "dropping stale playback response");
                return;
            }
            view.applied_seq = seq;
            view.now = next;
        }
    }

    async fn command(&self, command: PlaybackCommand) {
        if let Err(e) = self.api.send(&self.token, command).await {
            warn!(error = %e, ?command, "spotify playback command failed");
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(REFRESH_DELAY) => self.refresh().await,
        }
    }

    async fn run(self) {
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    let poller = self.clone();
                    tokio::spawn(async move { poller.refresh().await });
                }
            }
        }
        debug!("spotify poll loop stopped");
    }
}

struct Enabled {
    api: Arc<dyn PlaybackApi>,
    kv: Arc<dyn KeyValueStore>,
    view: Arc<Mutex<View>>,
    connection: Option<Poller>,
}

/// The integration adapter. Construct with [`Spotify::disabled`] when no
/// client id is configured; a disabled adapter never touches the network.
pub struct Spotify {
    enabled: Option<Enabled>,
}

impl Spotify {
    pub fn disabled() -> Self {
        Self { enabled: None }
    }

    pub fn new(api: Arc<dyn PlaybackApi>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            enabled: Some(Enabled {
                api,
                kv,
                view: Arc::new(Mutex::new(View::default())),
                connection: None,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.is_some()
    }

    pub fn is_connected(&self) -> bool {
        self.enabled
            .as_ref()
            .is_some_and(|e| e.connection.is_some())
    }

    pub fn now_playing(&self) -> NowPlaying {
        self.enabled
            .as_ref()
            .and_then(|e| e.view.lock().ok().map(|v| v.now.clone()))
            .unwrap_or_default()
    }

    /// Obtains a token, caches it and starts polling. Must be called from
    /// within a tokio runtime.
    pub async fn connect(&mut self, provider: &dyn AuthorizationProvider) -> Result<(), AuthError> {
        if self.enabled.is_none() {
            return Err(AuthError::Disabled);
        }
        let token = provider.authorize().await?;
        self.start(token, true);
        Ok(())
    }

    /// Reconnects with a previously cached token, if any.
    pub fn restore(&mut self) -> bool {
        let Some(enabled) = self.enabled.as_ref() else {
            return false;
        };
        match enabled.kv.get(TOKEN_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<String>(&raw) {
                Ok(token) if !token.is_empty() => {
                    self.start(token, false);
                    true
                }
                _ => {
                    warn!("cached spotify token unreadable; ignoring");
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "failed to read cached spotify token");
                false
            }
        }
    }

    fn start(&mut self, token: String, cache: bool) {
        self.stop();
        let Some(enabled) = self.enabled.as_mut() else {
            return;
        };
        if cache {
            let res = serde_json::to_string(&token)
                .map_err(crate::store::StoreError::from)
                .and_then(|raw| enabled.kv.set(TOKEN_KEY, &raw));
            if let Err(e) = res {
                warn!(error = %e, "failed to cache spotify token");
            }
        }
        let poller = Poller {
            api: enabled.api.clone(),
            token,
            view: enabled.view.clone(),
            seq: Arc::new(AtomicU64::new(0)),
            cancel: CancellationToken::new(),
        };
        tokio::spawn(poller.clone().run());
        enabled.connection = Some(poller);
        info!("spotify connected");
    }

    fn stop(&mut self) {
        let Some(enabled) = self.enabled.as_mut() else {
            return;
        };
        if let Some(conn) = enabled.connection.take() {
            conn.cancel.cancel();
        }
        if let Ok(mut view) = enabled.view.lock() {
            *view = View::default();
        }
    }

    /// Stops polling, clears the view and forgets the cached token.
    pub fn disconnect(&mut self) {
        self.stop();
        if let Some(enabled) = self.enabled.as_ref() {
            if let Err(e) = enabled.kv.remove(TOKEN_KEY) {
                warn!(error = %e, "failed to remove cached spotify token");
            }
            info!("spotify disconnected");
        }
    }

    pub fn toggle_playback(&self) -> Option<JoinHandle<()>> {
        let command = if self.now_playing().is_playing {
            PlaybackCommand::Pause
        } else {
            PlaybackCommand::Play
        };
        self.send(command)
    }

    pub fn previous_track(&self) -> Option<JoinHandle<()>> {
        self.send(PlaybackCommand::Previous)
    }

    pub fn next_track(&self) -> Option<JoinHandle<()>> {
        self.send(PlaybackCommand::Next)
    }

    fn send(&self, command: PlaybackCommand) -> Option<JoinHandle<()>> {
        let poller = self.enabled.as_ref()?.connection.clone()?;
        Some(tokio::spawn(async move { poller.command(command).await }))
    }
}

impl Drop for Spotify {
    fn drop(&mut self) {
        if let Some(conn) = self.enabled.as_ref().and_then(|e| e.connection.as_ref()) {
            conn.cancel.cancel();
        }
    }
}
