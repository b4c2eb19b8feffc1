use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::alerts;
use crate::completion::{EffectError, Effects};
use crate::mode::Mode;
use crate::scene::{self, Scene};
use crate::session::Session;
use crate::settings::{
    GeneralSettingsPatch, SettingsPatch, SoundKind, SoundSettingsPatch, TimerSettingsPatch,
};
use crate::spotify::{RedirectUrl, Spotify, authorize_url};
use crate::timer::ModeRequest;

pub const TICK_RATE: Duration = Duration::from_millis(50);
const CELEBRATION: Duration = Duration::from_secs(3);
const MESSAGE_TTL: Duration = Duration::from_secs(3);
const VOLUME_STEP: f64 = 5.0;

// ============================================================================
// Completion effects for the terminal
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub message: String,
    pub remaining: Duration,
}

#[derive(Debug, Default)]
pub struct TerminalEffects {
    pub toasts: Vec<Toast>,
    pub celebration: Duration,
    pub desktop: bool,
}

impl TerminalEffects {
    pub fn new(desktop: bool) -> Self {
        Self {
            desktop,
            ..Default::default()
        }
    }

    pub fn push(&mut self, message: impl Into<String>, ttl: Duration) {
        self.toasts.push(Toast {
            message: message.into(),
            remaining: ttl,
        });
    }

    fn age(&mut self, elapsed: Duration) {
        self.celebration = self.celebration.saturating_sub(elapsed);
        for t in &mut self.toasts {
            t.remaining = t.remaining.saturating_sub(elapsed);
        }
        self.toasts.retain(|t| !t.remaining.is_zero());
    }
}

impl Effects for TerminalEffects {
    fn play_sound(&mut self, kind: SoundKind, volume: u8) -> Result<(), EffectError> {
        alerts::play_sound(kind, volume)
    }

    fn celebrate(&mut self) {
        self.celebration = CELEBRATION;
    }

    fn notify(&mut self, message: &str, ttl: Duration) {
        self.push(message, ttl);
        if self.desktop {
            alerts::desktop_notification("🍅 Session complete", message);
        }
    }
}

// ============================================================================
// View state
// ============================================================================

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum View {
    Timer,
    Help,
    Settings,
    CustomTimer,
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum SettingsCategory {
    General,
    Timers,
    Sounds,
    Themes,
    Account,
}

impl SettingsCategory {
    pub const ALL: [SettingsCategory; 5] = [
        Self::General,
        Self::Timers,
        Self::Sounds,
        Self::Themes,
        Self::Account,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Timers => "Timers",
            Self::Sounds => "Sounds",
            Self::Themes => "Themes",
            Self::Account => "Account",
        }
    }

    pub fn fields(self) -> &'static [SettingsField] {
        use SettingsField::*;
        match self {
            Self::General => &[
                AutoStartBreaks,
                AutoStartPomodoros,
                ShowNotifications,
                ShowSpotify,
            ],
            Self::Timers => &[PomodoroMinutes, ShortMinutes, LongMinutes],
            Self::Sounds => &[SoundEnabled, SoundType, Volume],
            Self::Themes => &[Theme, Background],
            Self::Account => &[SpotifyConnection],
        }
    }

    fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&c| c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|&c| c == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum SettingsField {
    AutoStartBreaks,
    AutoStartPomodoros,
    ShowNotifications,
    ShowSpotify,
    PomodoroMinutes,
    ShortMinutes,
    LongMinutes,
    SoundEnabled,
    SoundType,
    Volume,
    Theme,
    Background,
    SpotifyConnection,
}

impl SettingsField {
    fn timer_mode(self) -> Option<Mode> {
        match self {
            Self::PomodoroMinutes => Some(Mode::Pomodoro),
            Self::ShortMinutes => Some(Mode::Short),
            Self::LongMinutes => Some(Mode::Long),
            _ => None,
        }
    }
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum CustomField {
    Minutes,
    Seconds,
}

#[derive(Debug, PartialEq)]
pub enum Action {
    None,
    Quit,
    ConnectSpotify(String),
}

pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub redirect_uri: String,
}

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub session: Session,
    pub spotify: Spotify,
    pub spotify_config: SpotifyConfig,
    pub effects: TerminalEffects,
    pub current_view: View,
    pub settings_category: SettingsCategory,
    pub settings_index: usize,
    pub settings_editing: bool,
    pub settings_input: String,
    pub confirming_reset: bool,
    pub custom_minutes: String,
    pub custom_seconds: String,
    pub custom_field: CustomField,
    pub custom_error: Option<String>,
    pub animation_frame: u8,
    pub scene: &'static Scene,
    scene_choice: String,
    rng: StdRng,
}

impl AppState {
    pub fn new(
        session: Session,
        spotify: Spotify,
        spotify_config: SpotifyConfig,
        effects: TerminalEffects,
        mut rng: StdRng,
    ) -> Self {
        let scene_choice = session.settings().general().video_background.clone();
        let scene = scene::resolve_scene(&scene_choice, local_hour(), &mut rng);
        Self {
            session,
            spotify,
            spotify_config,
            effects,
            current_view: View::Timer,
            settings_category: SettingsCategory::General,
            settings_index: 0,
            settings_editing: false,
            settings_input: String::new(),
            confirming_reset: false,
            custom_minutes: "15".into(),
            custom_seconds: "0".into(),
            custom_field: CustomField::Minutes,
            custom_error: None,
            animation_frame: 0,
            scene,
            scene_choice,
            rng,
        }
    }

    pub fn selected_field(&self) -> SettingsField {
        let fields = self.settings_category.fields();
        fields[self.settings_index.min(fields.len() - 1)]
    }

    pub fn auth_url(&self) -> Option<String> {
        let client_id = self.spotify_config.client_id.as_deref()?;
        authorize_url(client_id, &self.spotify_config.redirect_uri)
            .ok()
            .map(|u| u.to_string())
    }

    pub fn update(&mut self, elapsed: Duration) {
        let step = self.session.advance(elapsed, &mut self.effects);
        if let Some(mode) = step.prompt_expired {
            self.message(format!("Kept the current timer; {} not started", mode.label()));
        }
        if let Some((mode, ModeRequest::ConfirmationRequired)) = step.chained {
            info!(%mode, "auto-chain waiting for confirmation");
        }
        self.effects.age(elapsed);
        self.animation_frame = self.animation_frame.wrapping_add(1) % 20;
        self.refresh_scene();
    }

    fn refresh_scene(&mut self) {
        let choice = &self.session.settings().general().video_background;
        if *choice != self.scene_choice {
            self.scene_choice = choice.clone();
            self.scene = scene::resolve_scene(&self.scene_choice, local_hour(), &mut self.rng);
        }
    }

    fn message(&mut self, text: impl Into<String>) {
        self.effects.push(text, MESSAGE_TTL);
    }

    fn request_mode(&mut self, mode: Mode) {
        if self.session.request_mode_change(mode) == ModeRequest::Rejected {
            self.message("Answer the pending switch first (y/n)");
        }
    }

    fn patch(&mut self, patch: SettingsPatch) {
        if let Err(e) = self.session.update_settings(&patch) {
            warn!(error = %e, "settings update failed");
            self.message(e.to_string());
        }
    }

    pub async fn connect_spotify(&mut self, input: String) {
        match self.spotify.connect(&RedirectUrl(input)).await {
            Ok(()) => self.message("Spotify connected"),
            Err(e) => {
                warn!(error = %e, "spotify connect failed");
                self.message(format!("Spotify: {e}"));
            }
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn handle_input(&mut self, key: KeyEvent) -> Action {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Action::Quit;
        }

        if self.session.pending_switch().is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.session.confirm_mode_change(true);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.session.confirm_mode_change(false);
                }
                _ => {}
            }
            return Action::None;
        }

        if self.confirming_reset {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirming_reset = false;
                    match self.session.reset_settings() {
                        Ok(()) => self.message("Settings reset to defaults"),
                        Err(e) => self.message(e.to_string()),
                    }
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirming_reset = false;
                }
                _ => {}
            }
            return Action::None;
        }

        if self.settings_editing {
            match key.code {
                KeyCode::Char(c) => self.settings_input.push(c),
                KeyCode::Backspace => {
                    self.settings_input.pop();
                }
                KeyCode::Enter => return self.apply_setting(),
                KeyCode::Esc => {
                    self.settings_editing = false;
                    self.settings_input.clear();
                }
                _ => {}
            }
            return Action::None;
        }

        match self.current_view {
            View::Settings => self.handle_settings_view(key),
            View::CustomTimer => self.handle_custom_view(key),
            View::Timer | View::Help => self.handle_main_view(key),
        }
    }

    fn handle_main_view(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                if self.current_view == View::Help {
                    self.current_view = View::Timer;
                } else {
                    return Action::Quit;
                }
            }
            KeyCode::Char(' ') => self.session.toggle(),
            KeyCode::Char('r') => self.session.restart(),
            KeyCode::Char('1') => self.request_mode(Mode::Pomodoro),
            KeyCode::Char('2') => self.request_mode(Mode::Short),
            KeyCode::Char('3') => self.request_mode(Mode::Long),
            KeyCode::Char('c') => {
                self.custom_field = CustomField::Minutes;
                self.custom_error = None;
                self.current_view = View::CustomTimer;
            }
            KeyCode::Char('d') => self.current_view = View::Settings,
            KeyCode::Char('h') | KeyCode::Char('?') => {
                self.current_view = if self.current_view == View::Help {
                    View::Timer
                } else {
                    View::Help
                };
            }
            KeyCode::Char('x') => self.effects.toasts.clear(),
            KeyCode::Char('p') => {
                self.spotify.toggle_playback();
            }
            KeyCode::Char('[') => {
                self.spotify.previous_track();
            }
            KeyCode::Char(']') => {
                self.spotify.next_track();
            }
            _ => {}
        }
        Action::None
    }

    fn handle_custom_view(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc => self.current_view = View::Timer,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.custom_field = match self.custom_field {
                    CustomField::Minutes => CustomField::Seconds,
                    CustomField::Seconds => CustomField::Minutes,
                };
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                let field = self.custom_input_mut();
                if *field == "0" {
                    field.clear();
                }
                if field.len() < 3 {
                    field.push(c);
                }
            }
            KeyCode::Backspace => {
                self.custom_input_mut().pop();
            }
            KeyCode::Enter => self.submit_custom(),
            _ => {}
        }
        Action::None
    }

    fn custom_input_mut(&mut self) -> &mut String {
        match self.custom_field {
            CustomField::Minutes => &mut self.custom_minutes,
            CustomField::Seconds => &mut self.custom_seconds,
        }
    }

    fn submit_custom(&mut self) {
        let minutes = self.custom_minutes.parse::<u32>().unwrap_or(0);
        let seconds = self.custom_seconds.parse::<u32>().unwrap_or(0);
        if seconds > 59 {
            self.custom_error = Some("Seconds must be between 0 and 59".into());
            return;
        }
        match self.session.set_custom_time(minutes, seconds) {
            Ok(_) => {
                self.custom_error = None;
                self.current_view = View::Timer;
            }
            Err(_) => self.custom_error = Some("Please enter a valid time".into()),
        }
    }

    fn handle_settings_view(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.current_view = View::Timer,
            KeyCode::Tab => {
                self.settings_category = self.settings_category.next();
                self.settings_index = 0;
            }
            KeyCode::BackTab => {
                self.settings_category = self.settings_category.prev();
                self.settings_index = 0;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let len = self.settings_category.fields().len();
                self.settings_index = (self.settings_index + 1) % len;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                let len = self.settings_category.fields().len();
                self.settings_index = (self.settings_index + len - 1) % len;
            }
            KeyCode::Enter | KeyCode::Char('e') => self.start_editing(),
            KeyCode::Char(' ') => self.toggle_field(),
            KeyCode::Left | KeyCode::Char('h') => self.cycle_field(false),
            KeyCode::Right | KeyCode::Char('l') => self.cycle_field(true),
            KeyCode::Char('R') => self.confirming_reset = true,
            _ => {}
        }
        Action::None
    }

    fn start_editing(&mut self) {
        let field = self.selected_field();
        if let Some(mode) = field.timer_mode() {
            self.settings_input = format_minutes(self.session.settings().timers().minutes(mode));
            self.settings_editing = true;
        } else if field == SettingsField::SpotifyConnection {
            if self.spotify.is_connected() {
                self.spotify.disconnect();
                self.message("Spotify disconnected");
            } else if self.spotify.is_enabled() {
                self.settings_input.clear();
                self.settings_editing = true;
            } else {
                self.message("Set SPOTIFY_CLIENT_ID to enable Spotify");
            }
        } else {
            self.toggle_field();
        }
    }

    fn apply_setting(&mut self) -> Action {
        let field = self.selected_field();
        let input = std::mem::take(&mut self.settings_input);
        self.settings_editing = false;

        if let Some(mode) = field.timer_mode() {
            match input.trim().parse::<f64>() {
                Ok(m) => self.patch(SettingsPatch::Timers(TimerSettingsPatch::only(mode, m))),
                Err(_) => self.message(format!("Not a number: {input}")),
            }
            return Action::None;
        }
        if field == SettingsField::SpotifyConnection && !input.trim().is_empty() {
            return Action::ConnectSpotify(input);
        }
        Action::None
    }

    fn toggle_field(&mut self) {
        let general = self.session.settings().general().clone();
        let sounds = *self.session.settings().sounds();
        let patch = match self.selected_field() {
            SettingsField::AutoStartBreaks => SettingsPatch::General(GeneralSettingsPatch {
                auto_start_breaks: Some(!general.auto_start_breaks),
                ..Default::default()
            }),
            SettingsField::AutoStartPomodoros => SettingsPatch::General(GeneralSettingsPatch {
                auto_start_pomodoros: Some(!general.auto_start_pomodoros),
                ..Default::default()
            }),
            SettingsField::ShowNotifications => SettingsPatch::General(GeneralSettingsPatch {
                show_notifications: Some(!general.show_notifications),
                ..Default::default()
            }),
            SettingsField::ShowSpotify => SettingsPatch::General(GeneralSettingsPatch {
                show_spotify: Some(!general.show_spotify),
                ..Default::default()
            }),
            SettingsField::SoundEnabled => SettingsPatch::Sounds(SoundSettingsPatch {
                enabled: Some(!sounds.enabled),
                ..Default::default()
            }),
            _ => return,
        };
        self.patch(patch);
    }

    fn cycle_field(&mut self, forward: bool) {
        let general = self.session.settings().general().clone();
        let sounds = *self.session.settings().sounds();
        let patch = match self.selected_field() {
            SettingsField::SoundType => SettingsPatch::Sounds(SoundSettingsPatch {
                kind: Some(sounds.kind.cycle(forward)),
                ..Default::default()
            }),
            SettingsField::Volume => {
                let step = if forward { VOLUME_STEP } else { -VOLUME_STEP };
                SettingsPatch::Sounds(SoundSettingsPatch {
                    volume: Some(sounds.volume as f64 + step),
                    ..Default::default()
                })
            }
            SettingsField::Theme => SettingsPatch::General(GeneralSettingsPatch {
                theme: Some(general.theme.cycle(forward)),
                ..Default::default()
            }),
            SettingsField::Background => SettingsPatch::General(GeneralSettingsPatch {
                video_background: Some(
                    scene::cycle_id(&general.video_background, forward).to_string(),
                ),
                ..Default::default()
            }),
            _ => return,
        };
        self.patch(patch);
    }
}

pub fn format_minutes(m: f64) -> String {
    if m.fract() == 0.0 {
        format!("{}", m as u64)
    } else {
        format!("{:.2}", m)
    }
}

pub fn local_hour() -> u32 {
    use chrono::Timelike;
    chrono::Local::now().hour()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;

    use super::*;
    use crate::completion::CompletionHandler;
    use crate::settings::SettingsStore;
    use crate::store::MemoryStore;

    fn app() -> AppState {
        let session = Session::new(
            SettingsStore::load(Arc::new(MemoryStore::new())),
            CompletionHandler::seeded(5),
        );
        AppState::new(
            session,
            Spotify::disabled(),
            SpotifyConfig {
                client_id: None,
                redirect_uri: "http://localhost:8888/callback".into(),
            },
            TerminalEffects::new(false),
            StdRng::seed_from_u64(5),
        )
    }

    fn press(app: &mut AppState, code: KeyCode) -> Action {
        app.handle_input(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn space_toggles_and_digits_switch_modes() {
        let mut a = app();
        press(&mut a, KeyCode::Char('2'));
        assert_eq!(a.session.countdown().mode(), Mode::Short);
        press(&mut a, KeyCode::Char(' '));
        assert!(a.session.countdown().is_running());

        press(&mut a, KeyCode::Char('1'));
        assert_eq!(a.session.pending_switch(), Some(Mode::Pomodoro));
        press(&mut a, KeyCode::Char('3'));
        assert_eq!(a.session.pending_switch(), Some(Mode::Pomodoro));
        press(&mut a, KeyCode::Char('n'));
        assert_eq!(a.session.countdown().mode(), Mode::Short);
        assert!(a.session.countdown().is_running());

        press(&mut a, KeyCode::Char('3'));
        press(&mut a, KeyCode::Char('y'));
        assert_eq!(a.session.countdown().mode(), Mode::Long);
        assert!(a.session.countdown().is_idle());
    }

    #[test]
    fn custom_entry_rejects_all_zero() {
        let mut a = app();
        press(&mut a, KeyCode::Char('c'));
        assert_eq!(a.current_view, View::CustomTimer);
        press(&mut a, KeyCode::Backspace);
        press(&mut a, KeyCode::Backspace);
        press(&mut a, KeyCode::Enter);
        assert!(a.custom_error.is_some());
        assert_eq!(a.session.countdown().mode(), Mode::Pomodoro);

        press(&mut a, KeyCode::Tab);
        press(&mut a, KeyCode::Char('4'));
        press(&mut a, KeyCode::Char('5'));
        press(&mut a, KeyCode::Enter);
        assert_eq!(a.current_view, View::Timer);
        assert_eq!(a.session.countdown().mode(), Mode::Custom);
        assert_eq!(a.session.countdown().total_time(), 45);
    }

    #[test]
    fn editing_timer_minutes_updates_idle_countdown() {
        let mut a = app();
        press(&mut a, KeyCode::Char('d'));
        press(&mut a, KeyCode::Tab);
        assert_eq!(a.settings_category, SettingsCategory::Timers);
        press(&mut a, KeyCode::Enter);
        assert_eq!(a.settings_input, "25");
        press(&mut a, KeyCode::Backspace);
        press(&mut a, KeyCode::Backspace);
        press(&mut a, KeyCode::Char('5'));
        press(&mut a, KeyCode::Char('0'));
        press(&mut a, KeyCode::Enter);
        assert_eq!(a.session.settings().timers().pomodoro, 50.0);
        assert_eq!(a.session.countdown().total_time(), 50 * 60);
    }

    #[test]
    fn reset_requires_confirmation() {
        let mut a = app();
        press(&mut a, KeyCode::Char('d'));
        press(&mut a, KeyCode::Char(' '));
        assert!(a.session.settings().general().auto_start_breaks);

        press(&mut a, KeyCode::Char('R'));
        press(&mut a, KeyCode::Char('n'));
        assert!(a.session.settings().general().auto_start_breaks);

        press(&mut a, KeyCode::Char('R'));
        press(&mut a, KeyCode::Char('y'));
        assert!(!a.session.settings().general().auto_start_breaks);
    }

    #[test]
    fn volume_steps_are_clamped() {
        let mut a = app();
        a.current_view = View::Settings;
        a.settings_category = SettingsCategory::Sounds;
        a.settings_index = 2;
        for _ in 0..10 {
            press(&mut a, KeyCode::Right);
        }
        assert_eq!(a.session.settings().sounds().volume, 100);
    }

    #[test]
    fn completion_shows_toast_and_celebration_then_expires() {
        let mut a = app();
        a.patch(SettingsPatch::Sounds(SoundSettingsPatch {
            enabled: Some(false),
            ..Default::default()
        }));
        a.session.set_custom_time(0, 1).unwrap();
        a.session.start();
        a.update(Duration::from_secs(1));
        assert_eq!(a.effects.toasts.len(), 1);
        assert!(!a.effects.celebration.is_zero());

        a.update(Duration::from_secs(5));
        assert!(a.effects.toasts.is_empty());
        assert!(a.effects.celebration.is_zero());
    }

    #[test]
    fn disabled_spotify_cannot_be_connected_from_settings() {
        let mut a = app();
        a.current_view = View::Settings;
        a.settings_category = SettingsCategory::Account;
        press(&mut a, KeyCode::Enter);
        assert!(!a.settings_editing);
        assert!(a.auth_url().is_none());
    }

    #[test]
    fn changing_background_reselects_scene() {
        let mut a = app();
        a.current_view = View::Settings;
        a.settings_category = SettingsCategory::Themes;
        a.settings_index = 1;
        press(&mut a, KeyCode::Right);
        a.update(Duration::from_millis(50));
        assert_eq!(a.scene.id, "mars");
    }
}
