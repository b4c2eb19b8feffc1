//! Countdown engine and the guard that protects a running session from
//! accidental mode switches.

use std::time::Duration;

use tracing::{debug, info};

use crate::mode::Mode;
use crate::settings::TimerSettings;

const SECOND: Duration = Duration::from_secs(1);
/// An unanswered switch prompt is treated as declined after this long.
pub const PROMPT_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("custom timer needs a duration longer than zero")]
    ZeroDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Running,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Not running; nothing happened.
    Skipped,
    Counting,
    Completed(Mode),
}

// ============================================================================
// Countdown Engine
// ============================================================================

#[derive(Debug, Clone)]
pub struct Countdown {
    mode: Mode,
    status: Status,
    time_left: u32,
    total_time: u32,
    // Partial second accumulated since the last tick. Only present while running.
    carry: Option<Duration>,
}

impl Countdown {
    pub fn new(mode: Mode, total_secs: u32) -> Self {
        let total = total_secs.max(1);
        Self {
            mode,
            status: Status::Idle,
            time_left: total,
            total_time: total,
            carry: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == Status::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status == Status::Paused
    }

    pub fn is_idle(&self) -> bool {
        self.status == Status::Idle
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn total_time(&self) -> u32 {
        self.total_time
    }

    pub fn progress_ratio(&self) -> f64 {
        let total = self.total_time as f64;
        (1.0 - self.time_left as f64 / total).clamp(0.0, 1.0)
    }

    /// A finished countdown sits at zero and must be restarted or
    /// reloaded before it can run again.
    pub fn start(&mut self) {
        if self.time_left == 0 {
            return;
        }
        if matches!(self.status, Status::Idle | Status::Paused) {
            self.status = Status::Running;
            self.carry = Some(Duration::ZERO);
            debug!(mode = %self.mode, time_left = self.time_left, "countdown started");
        }
    }

    pub fn pause(&mut self) {
        if self.status == Status::Running {
            self.set_status(Status::Paused);
            debug!(mode = %self.mode, time_left = self.time_left, "countdown paused");
        }
    }

    pub fn restart(&mut self) {
        self.set_status(Status::Idle);
        self.time_left = self.total_time;
    }

    /// One second elapsed. Returns `Completed` exactly once, on the tick
    /// that reaches zero, after which the engine is idle.
    pub fn tick(&mut self) -> Tick {
        if self.status != Status::Running {
            return Tick::Skipped;
        }
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.set_status(Status::Idle);
            info!(mode = %self.mode, "countdown completed");
            return Tick::Completed(self.mode);
        }
        Tick::Counting
    }

    /// Feeds wall-clock time into the engine, ticking once per whole second
    /// while running. Returns the completed mode if zero was reached.
    pub fn advance(&mut self, elapsed: Duration) -> Option<Mode> {
        let carry = self.carry.as_mut()?;
        *carry += elapsed;
        while let Some(carry) = self.carry.as_mut() {
            if *carry < SECOND {
                break;
            }
            *carry -= SECOND;
            if let Tick::Completed(mode) = self.tick() {
                return Some(mode);
            }
        }
        None
    }

    /// Switches to `mode` with a fresh duration and stops the countdown.
    pub fn load(&mut self, mode: Mode, total_secs: u32) {
        let total = total_secs.max(1);
        self.mode = mode;
        self.total_time = total;
        self.time_left = total;
        self.set_status(Status::Idle);
    }

    pub fn set_custom_time(&mut self, minutes: u32, seconds: u32) -> Result<u32, TimerError> {
        let duration = minutes.saturating_mul(60).saturating_add(seconds);
        if duration == 0 {
            return Err(TimerError::ZeroDuration);
        }
        self.load(Mode::Custom, duration);
        Ok(duration)
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
        if status != Status::Running {
            self.carry = None;
        }
    }
}

// ============================================================================
// Mode Switch Guard
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    Applied,
    ConfirmationRequired,
    /// Another confirmation is already waiting for an answer.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingSwitch {
    target: Mode,
    remaining: Duration,
}

#[derive(Debug, Default)]
pub struct ModeSwitchGuard {
    pending: Option<PendingSwitch>,
}

impl ModeSwitchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<Mode> {
        self.pending.map(|p| p.target)
    }

    pub fn request(
        &mut self,
        countdown: &mut Countdown,
        timers: &TimerSettings,
        target: Mode,
    ) -> ModeRequest {
        if !countdown.is_running() {
            // a prompt opened while running is moot once the countdown stopped
            self.pending = None;
            apply(countdown, timers, target);
            return ModeRequest::Applied;
        }
        if let Some(p) = self.pending {
            debug!(pending = %p.target, requested = %target, "mode switch already awaiting confirmation");
            return ModeRequest::Rejected;
        }
        self.pending = Some(PendingSwitch {
            target,
            remaining: PROMPT_TIMEOUT,
        });
        ModeRequest::ConfirmationRequired
    }

    /// Answers the pending prompt. Returns the mode switched to on accept.
    pub fn confirm(
        &mut self,
        countdown: &mut Countdown,
        timers: &TimerSettings,
        accept: bool,
    ) -> Option<Mode> {
        let pending = self.pending.take()?;
        if accept {
            apply(countdown, timers, pending.target);
            Some(pending.target)
        } else {
            debug!(target = %pending.target, "mode switch declined");
            None
        }
    }

    /// Ages the pending prompt; returns the target if it just expired.
    pub fn advance(&mut self, elapsed: Duration) -> Option<Mode> {
        let pending = self.pending.as_mut()?;
        pending.remaining = pending.remaining.saturating_sub(elapsed);
        if pending.remaining.is_zero() {
            let target = pending.target;
            self.pending = None;
            debug!(%target, "mode switch prompt expired");
            return Some(target);
        }
        None
    }
}

fn apply(countdown: &mut Countdown, timers: &TimerSettings, target: Mode) {
    countdown.load(target, timers.duration_secs(target));
    info!(mode = %target, secs = countdown.total_time(), "mode switched");
}
