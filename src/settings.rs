use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::mode::Mode;
use crate::store::{KeyValueStore, StoreError, load_json, save_json};

pub const TIMER_SETTINGS_KEY: &str = "timerSettings";
pub const SOUND_SETTINGS_KEY: &str = "soundSettings";
pub const GENERAL_SETTINGS_KEY: &str = "generalSettings";

pub const MAX_VOLUME: u8 = 100;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{mode} duration must be a positive number of minutes, got {minutes}")]
    InvalidDuration { mode: Mode, minutes: f64 },
    #[error("failed to persist settings: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// Records
// ============================================================================

/// Minutes per mode.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TimerSettings {
    pub pomodoro: f64,
    pub short: f64,
    pub long: f64,
    pub custom: f64,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            pomodoro: 25.0,
            short: 5.0,
            long: 10.0,
            custom: 15.0,
        }
    }
}

impl TimerSettings {
    pub fn minutes(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Pomodoro => self.pomodoro,
            Mode::Short => self.short,
            Mode::Long => self.long,
            Mode::Custom => self.custom,
        }
    }

    fn minutes_mut(&mut self, mode: Mode) -> &mut f64 {
        match mode {
            Mode::Pomodoro => &mut self.pomodoro,
            Mode::Short => &mut self.short,
            Mode::Long => &mut self.long,
            Mode::Custom => &mut self.custom,
        }
    }

    /// Duration of `mode` in whole seconds, never zero.
    pub fn duration_secs(&self, mode: Mode) -> u32 {
        minutes_to_secs(self.minutes(mode))
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for mode in Mode::ALL {
            let minutes = self.minutes(mode);
            if !valid_minutes(minutes) {
                return Err(SettingsError::InvalidDuration { mode, minutes });
            }
        }
        Ok(())
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        for mode in Mode::ALL {
            if !valid_minutes(self.minutes(mode)) {
                warn!(%mode, minutes = self.minutes(mode), "stored duration invalid; using default");
                *self.minutes_mut(mode) = defaults.minutes(mode);
            }
        }
        self
    }
}

fn valid_minutes(m: f64) -> bool {
    m.is_finite() && m > 0.0
}

pub fn minutes_to_secs(minutes: f64) -> u32 {
    ((minutes * 60.0).round() as u32).max(1)
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SoundKind {
    #[default]
    Bell,
    Chime,
    Ding,
    Gong,
}

impl SoundKind {
    pub const ALL: [SoundKind; 4] = [Self::Bell, Self::Chime, Self::Ding, Self::Gong];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bell => "bell",
            Self::Chime => "chime",
            Self::Ding => "ding",
            Self::Gong => "gong",
        }
    }

    pub fn cycle(self, forward: bool) -> Self {
        cycle(&Self::ALL, self, forward)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SoundSettings {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: SoundKind,
    #[serde(deserialize_with = "clamped_volume")]
    pub volume: u8,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: SoundKind::Bell,
            volume: 70,
        }
    }
}

fn clamp_volume(v: f64) -> u8 {
    v.round().clamp(0.0, MAX_VOLUME as f64) as u8
}

fn clamped_volume<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let raw = f64::deserialize(d)?;
    Ok(clamp_volume(raw))
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Auto,
    Day,
    Night,
}

impl ThemeChoice {
    pub const ALL: [ThemeChoice; 3] = [Self::Auto, Self::Day, Self::Night];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Day => "day",
            Self::Night => "night",
        }
    }

    pub fn cycle(self, forward: bool) -> Self {
        cycle(&Self::ALL, self, forward)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneralSettings {
    pub theme: ThemeChoice,
    pub video_background: String,
    pub auto_start_breaks: bool,
    pub auto_start_pomodoros: bool,
    pub show_notifications: bool,
    pub show_spotify: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            theme: ThemeChoice::Auto,
            video_background: "auto".into(),
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            show_notifications: true,
            show_spotify: true,
        }
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, forward: bool) -> T {
    let idx = all.iter().position(|&t| t == current).unwrap_or(0);
    let next = if forward {
        (idx + 1) % all.len()
    } else if idx == 0 {
        all.len() - 1
    } else {
        idx - 1
    };
    all[next]
}

// ============================================================================
// Patches
// ============================================================================

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimerSettingsPatch {
    pub pomodoro: Option<f64>,
    pub short: Option<f64>,
    pub long: Option<f64>,
    pub custom: Option<f64>,
}

impl TimerSettingsPatch {
    pub fn only(mode: Mode, minutes: f64) -> Self {
        let mut patch = Self::default();
        match mode {
            Mode::Pomodoro => patch.pomodoro = Some(minutes),
            Mode::Short => patch.short = Some(minutes),
            Mode::Long => patch.long = Some(minutes),
            Mode::Custom => patch.custom = Some(minutes),
        }
        patch
    }

    fn apply(&self, mut base: TimerSettings) -> TimerSettings {
        if let Some(v) = self.pomodoro {
            base.pomodoro = v;
        }
        if let Some(v) = self.short {
            base.short = v;
        }
        if let Some(v) = self.long {
            base.long = v;
        }
        if let Some(v) = self.custom {
            base.custom = v;
        }
        base
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SoundSettingsPatch {
    pub enabled: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<SoundKind>,
    /// Fractional values are rounded like stored ones.
    pub volume: Option<f64>,
}

impl SoundSettingsPatch {
    fn apply(&self, mut base: SoundSettings) -> SoundSettings {
        if let Some(v) = self.enabled {
            base.enabled = v;
        }
        if let Some(v) = self.kind {
            base.kind = v;
        }
        if let Some(v) = self.volume {
            base.volume = clamp_volume(v);
        }
        base
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct GeneralSettingsPatch {
    pub theme: Option<ThemeChoice>,
    pub video_background: Option<String>,
    pub auto_start_breaks: Option<bool>,
    pub auto_start_pomodoros: Option<bool>,
    pub show_notifications: Option<bool>,
    pub show_spotify: Option<bool>,
}

impl GeneralSettingsPatch {
    fn apply(&self, mut base: GeneralSettings) -> GeneralSettings {
        if let Some(v) = self.theme {
            base.theme = v;
        }
        if let Some(v) = &self.video_background {
            base.video_background = v.clone();
        }
        if let Some(v) = self.auto_start_breaks {
            base.auto_start_breaks = v;
        }
        if let Some(v) = self.auto_start_pomodoros {
            base.auto_start_pomodoros = v;
        }
        if let Some(v) = self.show_notifications {
            base.show_notifications = v;
        }
        if let Some(v) = self.show_spotify {
            base.show_spotify = v;
        }
        base
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsKind {
    Timers,
    Sounds,
    General,
}

impl std::str::FromStr for SettingsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "timers" | "timer" => Ok(Self::Timers),
            "sounds" | "sound" => Ok(Self::Sounds),
            "general" => Ok(Self::General),
            other => Err(format!("unknown settings kind: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsPatch {
    Timers(TimerSettingsPatch),
    Sounds(SoundSettingsPatch),
    General(GeneralSettingsPatch),
}

impl SettingsPatch {
    /// Parses a JSON object into the patch type for `kind`.
    pub fn from_json(kind: SettingsKind, json: &str) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            SettingsKind::Timers => Self::Timers(serde_json::from_str(json)?),
            SettingsKind::Sounds => Self::Sounds(serde_json::from_str(json)?),
            SettingsKind::General => Self::General(serde_json::from_str(json)?),
        })
    }
}

// ============================================================================
// Store
// ============================================================================

/// Owns the three settings records and writes each one back on change.
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
    timers: TimerSettings,
    sounds: SoundSettings,
    general: GeneralSettings,
}

impl SettingsStore {
    /// Reads all three records, falling back to defaults for anything
    /// missing or unreadable.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let timers = load_or_default::<TimerSettings>(kv.as_ref(), TIMER_SETTINGS_KEY).sanitized();
        let sounds = load_or_default::<SoundSettings>(kv.as_ref(), SOUND_SETTINGS_KEY);
        let general = load_or_default::<GeneralSettings>(kv.as_ref(), GENERAL_SETTINGS_KEY);
        Self {
            kv,
            timers,
            sounds,
            general,
        }
    }

    pub fn timers(&self) -> &TimerSettings {
        &self.timers
    }

    pub fn sounds(&self) -> &SoundSettings {
        &self.sounds
    }

    pub fn general(&self) -> &GeneralSettings {
        &self.general
    }

    /// Merges `patch` onto the matching record and persists the result.
    ///
    /// Validation failures leave the record untouched. A persistence failure
    /// is returned after the in-memory record has already been updated.
    pub fn update_partial(&mut self, patch: &SettingsPatch) -> Result<(), SettingsError> {
        match patch {
            SettingsPatch::Timers(p) => {
                let merged = p.apply(self.timers);
                merged.validate()?;
                self.timers = merged;
                self.persist(SettingsKind::Timers)
            }
            SettingsPatch::Sounds(p) => {
                self.sounds = p.apply(self.sounds);
                self.persist(SettingsKind::Sounds)
            }
            SettingsPatch::General(p) => {
                self.general = p.apply(self.general.clone());
                self.persist(SettingsKind::General)
            }
        }
    }

    /// Restores default timer and general settings. Sound settings are kept.
    pub fn reset_to_defaults(&mut self) -> Result<(), SettingsError> {
        self.timers = TimerSettings::default();
        self.general = GeneralSettings::default();
        let timers = self.persist(SettingsKind::Timers);
        let general = self.persist(SettingsKind::General);
        timers.and(general)
    }

    fn persist(&self, kind: SettingsKind) -> Result<(), SettingsError> {
        let res = match kind {
            SettingsKind::Timers => save_json(self.kv.as_ref(), TIMER_SETTINGS_KEY, &self.timers),
            SettingsKind::Sounds => save_json(self.kv.as_ref(), SOUND_SETTINGS_KEY, &self.sounds),
            SettingsKind::General => {
                save_json(self.kv.as_ref(), GENERAL_SETTINGS_KEY, &self.general)
            }
        };
        match res {
            Ok(()) => {
                debug!(?kind, "settings persisted");
                Ok(())
            }
            Err(e) => {
                warn!(?kind, error = %e, "failed to persist settings");
                Err(e.into())
            }
        }
    }
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(kv: &dyn KeyValueStore, key: &str) -> T {
    match load_json::<T>(kv, key) {
        Ok(Some(v)) => v,
        Ok(None) => T::default(),
        Err(e) => {
            warn!(key, error = %e, "stored settings unreadable; using defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn memory() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn fresh_store_uses_defaults() {
        let store = SettingsStore::load(memory());
        assert_eq!(*store.timers(), TimerSettings::default());
        assert_eq!(*store.sounds(), SoundSettings::default());
        assert_eq!(*store.general(), GeneralSettings::default());
        assert_eq!(store.timers().duration_secs(Mode::Pomodoro), 25 * 60);
    }

    #[test]
    fn sound_update_survives_reload() {
        let kv = memory();
        let mut store = SettingsStore::load(kv.clone());
        let patch = SettingsPatch::from_json(SettingsKind::Sounds, r#"{"volume": 40}"#).unwrap();
        store.update_partial(&patch).unwrap();

        let reloaded = SettingsStore::load(kv);
        assert_eq!(reloaded.sounds().volume, 40);
        assert!(reloaded.sounds().enabled);
    }

    #[test]
    fn fractional_volume_is_rounded_on_write_like_on_load() {
        let kv = memory();
        let mut store = SettingsStore::load(kv.clone());
        let patch = SettingsPatch::from_json(SettingsKind::Sounds, r#"{"volume": 40.5}"#).unwrap();
        store.update_partial(&patch).unwrap();
        assert_eq!(store.sounds().volume, 41);

        kv.set(SOUND_SETTINGS_KEY, r#"{"volume": 40.5}"#).unwrap();
        assert_eq!(SettingsStore::load(kv).sounds().volume, 41);
    }

    #[test]
    fn volume_is_clamped_on_write_and_load() {
        let kv = memory();
        let mut store = SettingsStore::load(kv.clone());
        store
            .update_partial(&SettingsPatch::Sounds(SoundSettingsPatch {
                volume: Some(250.0),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(store.sounds().volume, 100);

        kv.set(SOUND_SETTINGS_KEY, r#"{"enabled":false,"type":"gong","volume":-5}"#)
            .unwrap();
        let reloaded = SettingsStore::load(kv);
        assert_eq!(reloaded.sounds().volume, 0);
        assert_eq!(reloaded.sounds().kind, SoundKind::Gong);
    }

    #[test]
    fn non_positive_duration_is_rejected_without_mutation() {
        let mut store = SettingsStore::load(memory());
        let err = store
            .update_partial(&SettingsPatch::Timers(TimerSettingsPatch::only(Mode::Short, 0.0)))
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidDuration { mode: Mode::Short, .. }));
        assert_eq!(store.timers().short, 5.0);
    }

    #[test]
    fn malformed_records_fall_back_to_defaults() {
        let kv = memory();
        kv.set(TIMER_SETTINGS_KEY, "{oops").unwrap();
        kv.set(GENERAL_SETTINGS_KEY, r#"{"autoStartBreaks": true}"#).unwrap();
        let store = SettingsStore::load(kv);
        assert_eq!(*store.timers(), TimerSettings::default());
        assert!(store.general().auto_start_breaks);
        assert!(store.general().show_notifications);
    }

    #[test]
    fn stored_invalid_durations_are_replaced() {
        let kv = memory();
        kv.set(TIMER_SETTINGS_KEY, r#"{"pomodoro": -3, "short": 2}"#).unwrap();
        let store = SettingsStore::load(kv);
        assert_eq!(store.timers().pomodoro, 25.0);
        assert_eq!(store.timers().short, 2.0);
    }

    #[test]
    fn reset_keeps_sound_settings() {
        let kv = memory();
        let mut store = SettingsStore::load(kv.clone());
        store
            .update_partial(&SettingsPatch::Timers(TimerSettingsPatch::only(Mode::Pomodoro, 50.0)))
            .unwrap();
        store
            .update_partial(&SettingsPatch::Sounds(SoundSettingsPatch {
                kind: Some(SoundKind::Chime),
                ..Default::default()
            }))
            .unwrap();
        store
            .update_partial(&SettingsPatch::General(GeneralSettingsPatch {
                theme: Some(ThemeChoice::Night),
                ..Default::default()
            }))
            .unwrap();

        store.reset_to_defaults().unwrap();
        let reloaded = SettingsStore::load(kv);
        assert_eq!(*reloaded.timers(), TimerSettings::default());
        assert_eq!(*reloaded.general(), GeneralSettings::default());
        assert_eq!(reloaded.sounds().kind, SoundKind::Chime);
    }

    #[test]
    fn general_settings_use_camel_case_keys() {
        let json = serde_json::to_value(GeneralSettings::default()).unwrap();
        assert_eq!(json["videoBackground"], "auto");
        assert_eq!(json["autoStartPomodoros"], false);
        assert!(
            SettingsPatch::from_json(SettingsKind::General, r#"{"auto_start_breaks": true}"#)
                .is_err()
        );
    }

    #[test]
    fn fractional_minutes_round_to_seconds() {
        assert_eq!(minutes_to_secs(0.5), 30);
        assert_eq!(minutes_to_secs(1.0 + 1.0 / 60.0), 61);
        assert_eq!(minutes_to_secs(0.001), 1);
    }

    #[test]
    fn choices_cycle_both_ways() {
        assert_eq!(SoundKind::Gong.cycle(true), SoundKind::Bell);
        assert_eq!(SoundKind::Bell.cycle(false), SoundKind::Gong);
        assert_eq!(ThemeChoice::Auto.cycle(true), ThemeChoice::Day);
    }
}
