//! Desktop notification and sound cue primitives.

use std::path::Path;
use std::process::{Command, Stdio};

use notify_rust::{Notification, Urgency};
use tracing::{debug, warn};

use crate::completion::EffectError;
use crate::settings::{MAX_VOLUME, SoundKind};

const SOUND_DIR: &str = "/usr/share/sounds/freedesktop/stereo";
// paplay's 100% volume
const PA_VOLUME_NORM: u32 = 65536;

fn sound_file(kind: SoundKind) -> &'static str {
    match kind {
        SoundKind::Bell => "bell.oga",
        SoundKind::Chime => "complete.oga",
        SoundKind::Ding => "message.oga",
        SoundKind::Gong => "alarm-clock-elapsed.oga",
    }
}

pub fn pa_volume(volume: u8) -> u32 {
    PA_VOLUME_NORM * volume.min(MAX_VOLUME) as u32 / MAX_VOLUME as u32
}

/// Plays the cue in a detached child process. Returns once the player
/// has been spawned.
pub fn play_sound(kind: SoundKind, volume: u8) -> Result<(), EffectError> {
    let themed = Path::new(SOUND_DIR).join(sound_file(kind));
    if themed.exists() {
        Command::new("paplay")
            .arg(format!("--volume={}", pa_volume(volume)))
            .arg(&themed)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        debug!(sound = kind.as_str(), volume, "sound cue started");
        return Ok(());
    }

    for file in ["/usr/share/sounds/sound-icons/guitar-11.wav", "/usr/share/sounds/generic.wav"] {
        if Path::new(file).exists() {
            Command::new("aplay")
                .arg("-q")
                .arg(file)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            debug!(sound = kind.as_str(), file, "fallback sound cue started");
            return Ok(());
        }
    }
    Err(EffectError::NoPlayer(kind.as_str()))
}

pub fn desktop_notification(title: &str, body: &str) {
    let res = Notification::new()
        .summary(title)
        .body(body)
        .appname("tomatick")
        .icon("alarm-clock")
        .urgency(Urgency::Normal)
        .show();
    if let Err(e) = res {
        warn!(error = %e, "desktop notification failed");
    }
}
