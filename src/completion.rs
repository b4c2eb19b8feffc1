use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::mode::Mode;
use crate::quotes::random_quote;
use crate::settings::{GeneralSettings, SoundKind, SoundSettings};

pub const AUTO_CHAIN_DELAY: Duration = Duration::from_secs(2);
pub const TOAST_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    #[error("no sound player available for {0}")]
    NoPlayer(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Side effects a finished session can trigger.
pub trait Effects {
    fn play_sound(&mut self, kind: SoundKind, volume: u8) -> Result<(), EffectError>;
    fn celebrate(&mut self);
    fn notify(&mut self, message: &str, ttl: Duration);
}

/// A mode change scheduled to happen once `remaining` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoChain {
    pub target: Mode,
    pub remaining: Duration,
}

impl AutoChain {
    /// Returns the target once the delay has run out.
    pub fn advance(&mut self, elapsed: Duration) -> Option<Mode> {
        self.remaining = self.remaining.saturating_sub(elapsed);
        self.remaining.is_zero().then_some(self.target)
    }
}

pub fn next_mode(finished: Mode, general: &GeneralSettings) -> Option<Mode> {
    match finished {
        Mode::Pomodoro if general.auto_start_breaks => Some(Mode::Short),
        m if m.is_break() && general.auto_start_pomodoros => Some(Mode::Pomodoro),
        _ => None,
    }
}

pub struct CompletionHandler {
    rng: StdRng,
}

impl CompletionHandler {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Runs every completion effect. Each one is independent; a failing
    /// sound does not keep the toast from showing.
    pub fn handle(
        &mut self,
        finished: Mode,
        sounds: &SoundSettings,
        general: &GeneralSettings,
        effects: &mut dyn Effects,
    ) -> Option<AutoChain> {
        if sounds.enabled {
            if let Err(e) = effects.play_sound(sounds.kind, sounds.volume) {
                warn!(error = %e, sound = sounds.kind.as_str(), "failed to play completion sound");
            }
        }

        effects.celebrate();

        if general.show_notifications {
            let quote = random_quote(&mut self.rng);
            effects.notify(quote, TOAST_TTL);
        }

        let chain = next_mode(finished, general).map(|target| AutoChain {
            target,
            remaining: AUTO_CHAIN_DELAY,
        });
        if let Some(c) = &chain {
            debug!(from = %finished, to = %c.target, "auto-chain scheduled");
        }
        chain
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    #[derive(Debug, Default)]
    pub struct RecordingEffects {
        pub sounds: Vec<(SoundKind, u8)>,
        pub celebrations: usize,
        pub toasts: Vec<(String, Duration)>,
        pub fail_sound: bool,
    }

    impl Effects for RecordingEffects {
        fn play_sound(&mut self, kind: SoundKind, volume: u8) -> Result<(), EffectError> {
            if self.fail_sound {
                return Err(EffectError::NoPlayer("test"));
            }
            self.sounds.push((kind, volume));
            Ok(())
        }

        fn celebrate(&mut self) {
            self.celebrations += 1;
        }

        fn notify(&mut self, message: &str, ttl: Duration) {
            self.toasts.push((message.to_string(), ttl));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingEffects;
    use super::*;
    use crate::quotes::MOTIVATIONAL_QUOTES;

    #[test]
    fn runs_all_effects_with_settings() {
        let mut handler = CompletionHandler::seeded(1);
        let mut fx = RecordingEffects::default();
        let sounds = SoundSettings {
            enabled: true,
            kind: SoundKind::Gong,
            volume: 30,
        };
        let chain = handler.handle(Mode::Custom, &sounds, &GeneralSettings::default(), &mut fx);

        assert_eq!(chain, None);
        assert_eq!(fx.sounds, vec![(SoundKind::Gong, 30)]);
        assert_eq!(fx.celebrations, 1);
        assert_eq!(fx.toasts.len(), 1);
        assert_eq!(fx.toasts[0].1, TOAST_TTL);
        assert!(MOTIVATIONAL_QUOTES.contains(&fx.toasts[0].0.as_str()));
    }

    #[test]
    fn sound_failure_does_not_block_other_effects() {
        let mut handler = CompletionHandler::seeded(1);
        let mut fx = RecordingEffects {
            fail_sound: true,
            ..Default::default()
        };
        handler.handle(
            Mode::Pomodoro,
            &SoundSettings::default(),
            &GeneralSettings::default(),
            &mut fx,
        );
        assert_eq!(fx.celebrations, 1);
        assert_eq!(fx.toasts.len(), 1);
    }

    #[test]
    fn disabled_sound_and_notifications_are_skipped() {
        let mut handler = CompletionHandler::seeded(1);
        let mut fx = RecordingEffects::default();
        let sounds = SoundSettings {
            enabled: false,
            ..Default::default()
        };
        let general = GeneralSettings {
            show_notifications: false,
            ..Default::default()
        };
        handler.handle(Mode::Pomodoro, &sounds, &general, &mut fx);
        assert!(fx.sounds.is_empty());
        assert!(fx.toasts.is_empty());
        assert_eq!(fx.celebrations, 1);
    }

    #[test]
    fn seeded_handlers_pick_the_same_messages() {
        let mut a = CompletionHandler::seeded(42);
        let mut b = CompletionHandler::seeded(42);
        let mut fa = RecordingEffects::default();
        let mut fb = RecordingEffects::default();
        for _ in 0..5 {
            a.handle(Mode::Short, &SoundSettings::default(), &GeneralSettings::default(), &mut fa);
            b.handle(Mode::Short, &SoundSettings::default(), &GeneralSettings::default(), &mut fb);
        }
        assert_eq!(fa.toasts, fb.toasts);
    }

    #[test]
    fn chain_targets_follow_settings() {
        let breaks = GeneralSettings {
            auto_start_breaks: true,
            ..Default::default()
        };
        let pomodoros = GeneralSettings {
            auto_start_pomodoros: true,
            ..Default::default()
        };
        assert_eq!(next_mode(Mode::Pomodoro, &breaks), Some(Mode::Short));
        assert_eq!(next_mode(Mode::Short, &breaks), None);
        assert_eq!(next_mode(Mode::Long, &pomodoros), Some(Mode::Pomodoro));
        assert_eq!(next_mode(Mode::Pomodoro, &pomodoros), None);
        assert_eq!(next_mode(Mode::Custom, &breaks), None);
    }

    #[test]
    fn chain_fires_after_delay() {
        let mut chain = AutoChain {
            target: Mode::Short,
            remaining: AUTO_CHAIN_DELAY,
        };
        assert_eq!(chain.advance(Duration::from_millis(1500)), None);
        assert_eq!(chain.advance(Duration::from_millis(500)), Some(Mode::Short));
    }
}
