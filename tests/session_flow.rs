use std::sync::Arc;
use std::time::Duration;

use tomatick::completion::{CompletionHandler, EffectError, Effects};
use tomatick::mode::Mode;
use tomatick::session::Session;
use tomatick::settings::{
    GeneralSettingsPatch, SettingsPatch, SettingsStore, SoundKind, SoundSettingsPatch,
    TimerSettingsPatch,
};
use tomatick::store::{JsonDirStore, KeyValueStore};
use tomatick::timer::ModeRequest;

#[derive(Default)]
struct Collected {
    sounds: Vec<SoundKind>,
    celebrations: usize,
    toasts: Vec<String>,
}

impl Effects for Collected {
    fn play_sound(&mut self, kind: SoundKind, _volume: u8) -> Result<(), EffectError> {
        self.sounds.push(kind);
        Ok(())
    }

    fn celebrate(&mut self) {
        self.celebrations += 1;
    }

    fn notify(&mut self, message: &str, _ttl: Duration) {
        self.toasts.push(message.to_string());
    }
}

fn open(dir: &std::path::Path) -> Arc<dyn KeyValueStore> {
    Arc::new(JsonDirStore::open(dir).unwrap())
}

fn run_for(session: &mut Session, fx: &mut Collected, secs: u64) {
    // feed in frame-sized steps like the UI loop does
    for _ in 0..secs * 20 {
        session.advance(Duration::from_millis(50), fx);
    }
}

#[test]
fn settings_survive_a_restart() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let mut settings = SettingsStore::load(open(tmp.path()));
        settings
            .update_partial(&SettingsPatch::Sounds(SoundSettingsPatch {
                volume: Some(40.0),
                kind: Some(SoundKind::Gong),
                ..Default::default()
            }))
            .unwrap();
        settings
            .update_partial(&SettingsPatch::Timers(TimerSettingsPatch::only(Mode::Pomodoro, 50.0)))
            .unwrap();
    }
    assert!(tmp.path().join("soundSettings.json").exists());

    let settings = SettingsStore::load(open(tmp.path()));
    assert_eq!(settings.sounds().volume, 40);
    assert_eq!(settings.sounds().kind, SoundKind::Gong);
    assert_eq!(settings.timers().pomodoro, 50.0);

    let session = Session::new(settings, CompletionHandler::seeded(1));
    assert_eq!(session.countdown().total_time(), 50 * 60);
}

#[test]
fn corrupt_records_fall_back_to_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("timerSettings.json"), "{not json").unwrap();
    std::fs::write(tmp.path().join("soundSettings.json"), r#"{"volume": 250}"#).unwrap();

    let settings = SettingsStore::load(open(tmp.path()));
    assert_eq!(settings.timers().pomodoro, 25.0);
    assert_eq!(settings.sounds().volume, 100);
    assert!(settings.sounds().enabled);
}

#[test]
fn focus_then_auto_break_end_to_end() {
    let tmp = tempfile::tempdir().unwrap();
    let mut settings = SettingsStore::load(open(tmp.path()));
    settings
        .update_partial(&SettingsPatch::Timers(TimerSettingsPatch {
            pomodoro: Some(0.05),
            short: Some(1.0),
            ..Default::default()
        }))
        .unwrap();
    settings
        .update_partial(&SettingsPatch::General(GeneralSettingsPatch {
            auto_start_breaks: Some(true),
            ..Default::default()
        }))
        .unwrap();

    let mut session = Session::new(settings, CompletionHandler::seeded(9));
    let mut fx = Collected::default();
    assert_eq!(session.countdown().total_time(), 3);

    session.start();
    run_for(&mut session, &mut fx, 3);
    assert_eq!(session.countdown().time_left(), 0);
    assert!(session.countdown().is_idle());
    assert_eq!(fx.sounds, vec![SoundKind::Bell]);
    assert_eq!(fx.celebrations, 1);
    assert_eq!(fx.toasts.len(), 1);
    assert!(session.pending_chain().is_some());

    run_for(&mut session, &mut fx, 2);
    assert_eq!(session.countdown().mode(), Mode::Short);
    assert!(session.countdown().is_idle());
    assert_eq!(session.countdown().time_left(), 60);
    assert_eq!(session.countdown().total_time(), 60);
    assert_eq!(fx.celebrations, 1);
}

#[test]
fn guarded_switch_and_custom_timer() {
    let tmp = tempfile::tempdir().unwrap();
    let mut session = Session::new(
        SettingsStore::load(open(tmp.path())),
        CompletionHandler::seeded(3),
    );
    let mut fx = Collected::default();

    session.start();
    run_for(&mut session, &mut fx, 10);
    assert_eq!(session.countdown().time_left(), 25 * 60 - 10);

    assert_eq!(session.request_mode_change(Mode::Long), ModeRequest::ConfirmationRequired);
    assert_eq!(session.request_mode_change(Mode::Short), ModeRequest::Rejected);
    run_for(&mut session, &mut fx, 5);
    // the unanswered prompt lapsed and the countdown kept going
    assert_eq!(session.pending_switch(), None);
    assert_eq!(session.countdown().mode(), Mode::Pomodoro);
    assert_eq!(session.countdown().time_left(), 25 * 60 - 15);

    assert_eq!(session.request_mode_change(Mode::Long), ModeRequest::ConfirmationRequired);
    assert_eq!(session.confirm_mode_change(true), Some(Mode::Long));
    assert!(session.countdown().is_idle());
    assert_eq!(session.countdown().total_time(), 10 * 60);

    assert!(session.set_custom_time(0, 0).is_err());
    assert_eq!(session.countdown().mode(), Mode::Long);
    assert_eq!(session.set_custom_time(2, 30).unwrap(), 150);

    let reloaded = SettingsStore::load(open(tmp.path()));
    assert_eq!(reloaded.timers().custom, 2.5);
}
