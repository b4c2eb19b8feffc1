//! Minimal Spotify Web API client for the player endpoints we use.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_API_BASE: &str = "https://api.spotify.com";

#[derive(Debug, thiserror::Error)]
pub enum SpotifyError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

impl SpotifyError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Image {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Album {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Album,
    pub duration_ms: u64,
}

impl Track {
    pub fn artist_line(&self) -> String {
        self.artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CurrentlyPlaying {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<Track>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackCommand {
    Pause,
    Play,
    Previous,
    Next,
}

/// The player endpoints the integration consumes.
#[async_trait]
pub trait PlaybackApi: Send + Sync {
    /// `Ok(None)` when nothing is playing (204 or empty body).
    async fn currently_playing(&self, token: &str)
    -> Result<Option<CurrentlyPlaying>, SpotifyError>;
    async fn send(&self, token: &str, command: PlaybackCommand) -> Result<(), SpotifyError>;
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    base: String,
}

impl SpotifyClient {
    pub fn new(base: &str) -> Result<Self, SpotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SpotifyError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/me/player/{}", self.base, path)
    }
}

#[async_trait]
impl PlaybackApi for SpotifyClient {
    async fn currently_playing(
        &self,
        token: &str,
    ) -> Result<Option<CurrentlyPlaying>, SpotifyError> {
        let res = self
            .http
            .get(self.url("currently-playing"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SpotifyError::Http(e.to_string()))?;
        let status = res.status();
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let body = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SpotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| SpotifyError::Serde(e.to_string()))
    }

    async fn send(&self, token: &str, command: PlaybackCommand) -> Result<(), SpotifyError> {
        let req = match command {
            PlaybackCommand::Pause => self.http.put(self.url("pause")),
            PlaybackCommand::Play => self.http.put(self.url("play")),
            PlaybackCommand::Previous => self.http.post(self.url("previous")),
            PlaybackCommand::Next => self.http.post(self.url("next")),
        };
        let res = req
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await
            .map_err(|e| SpotifyError::Http(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SpotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_currently_playing_payload() {
        let raw = r#"{
            "is_playing": true,
            "progress_ms": 30000,
            "item": {
                "name": "Weightless",
                "artists": [{"name": "Marconi Union"}, {"name": "Guest"}],
                "album": {"images": [{"url": "https://i.scdn.co/image/abc"}]},
                "duration_ms": 480000,
                "popularity": 50
            }
        }"#;
        let cp: CurrentlyPlaying = serde_json::from_str(raw).unwrap();
        assert!(cp.is_playing);
        let track = cp.item.unwrap();
        assert_eq!(track.artist_line(), "Marconi Union, Guest");
        assert_eq!(track.album.images.len(), 1);
    }

    #[test]
    fn ad_breaks_have_no_item() {
        let cp: CurrentlyPlaying =
            serde_json::from_str(r#"{"is_playing": true, "item": null}"#).unwrap();
        assert_eq!(cp.item, None);
    }

    #[test]
    fn builds_player_urls() {
        let c = SpotifyClient::new("http://localhost:9999/").unwrap();
        assert_eq!(c.url("next"), "http://localhost:9999/v1/me/player/next");
    }
}
