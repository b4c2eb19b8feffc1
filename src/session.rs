//! The timer context: countdown, switch guard, settings and completion
//! handling wired together behind one explicitly constructed object.

use std::time::Duration;

use tracing::{info, warn};

use crate::completion::{AutoChain, CompletionHandler, Effects};
use crate::mode::Mode;
use crate::settings::{SettingsError, SettingsPatch, SettingsStore, TimerSettingsPatch};
use crate::timer::{Countdown, ModeRequest, ModeSwitchGuard, TimerError};

/// What happened during one [`Session::advance`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub completed: Option<Mode>,
    pub chained: Option<(Mode, ModeRequest)>,
    pub prompt_expired: Option<Mode>,
}

pub struct Session {
    settings: SettingsStore,
    countdown: Countdown,
    guard: ModeSwitchGuard,
    completion: CompletionHandler,
    auto_chain: Option<AutoChain>,
}

impl Session {
    pub fn new(settings: SettingsStore, completion: CompletionHandler) -> Self {
        let countdown = Countdown::new(
            Mode::Pomodoro,
            settings.timers().duration_secs(Mode::Pomodoro),
        );
        Self {
            settings,
            countdown,
            guard: ModeSwitchGuard::new(),
            completion,
            auto_chain: None,
        }
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn pending_switch(&self) -> Option<Mode> {
        self.guard.pending()
    }

    pub fn pending_chain(&self) -> Option<AutoChain> {
        self.auto_chain
    }

    pub fn start(&mut self) {
        self.countdown.start();
    }

    pub fn pause(&mut self) {
        self.countdown.pause();
    }

    pub fn toggle(&mut self) {
        if self.countdown.is_running() {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn restart(&mut self) {
        self.countdown.restart();
    }

    pub fn request_mode_change(&mut self, mode: Mode) -> ModeRequest {
        self.guard
            .request(&mut self.countdown, self.settings.timers(), mode)
    }

    pub fn confirm_mode_change(&mut self, accept: bool) -> Option<Mode> {
        self.guard
            .confirm(&mut self.countdown, self.settings.timers(), accept)
    }

    /// Starts a custom countdown of `minutes:seconds` and remembers it as
    /// the custom duration.
    pub fn set_custom_time(&mut self, minutes: u32, seconds: u32) -> Result<u32, TimerError> {
        let secs = self.countdown.set_custom_time(minutes, seconds)?;
        let custom = minutes as f64 + seconds as f64 / 60.0;
        let patch = SettingsPatch::Timers(TimerSettingsPatch::only(Mode::Custom, custom));
        if let Err(e) = self.settings.update_partial(&patch) {
            warn!(error = %e, "custom duration not saved");
        }
        Ok(secs)
    }

    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<(), SettingsError> {
        let res = self.settings.update_partial(patch);
        if matches!(res, Err(SettingsError::InvalidDuration { .. })) {
            return res;
        }
        if matches!(patch, SettingsPatch::Timers(_)) {
            self.reload_idle_duration();
        }
        res
    }

    /// Caller is responsible for having confirmed the reset with the user.
    pub fn reset_settings(&mut self) -> Result<(), SettingsError> {
        let res = self.settings.reset_to_defaults();
        self.reload_idle_duration();
        info!("settings reset to defaults");
        res
    }

    fn reload_idle_duration(&mut self) {
        if self.countdown.is_idle() {
            let mode = self.countdown.mode();
            let secs = self.settings.timers().duration_secs(mode);
            self.countdown.load(mode, secs);
        }
    }

    /// Drives every time-based part of the session by `elapsed`.
    pub fn advance(&mut self, elapsed: Duration, effects: &mut dyn Effects) -> Advance {
        let mut out = Advance::default();

        if let Some(chain) = self.auto_chain.as_mut() {
            if let Some(target) = chain.advance(elapsed) {
                self.auto_chain = None;
                let req = self.request_mode_change(target);
                info!(mode = %target, ?req, "auto-chain requested mode change");
                out.chained = Some((target, req));
            }
        }

        out.prompt_expired = self.guard.advance(elapsed);

        if let Some(mode) = self.countdown.advance(elapsed) {
            out.completed = Some(mode);
            if let Some(chain) = self.completion.handle(
                mode,
                self.settings.sounds(),
                self.settings.general(),
                effects,
            ) {
                self.auto_chain = Some(chain);
            }
        }

        out
    }
}
