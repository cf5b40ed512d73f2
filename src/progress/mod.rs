//! Loading indicator state machine.
//!
//! Idle -> Loading -> Settling -> Idle. While loading, a simulated ramp keeps
//! the bar moving until the first real progress event, and a watchdog gives
//! up on the indicator after the policy timeout. Every terminal path (success,
//! failure, watchdog) lands on 100% and hides after a short settle delay.
//!
//! The indicator follows a single owning load. Starting another load takes
//! over the indicator and drops the previous owner's timers; events from
//! non-owners are ignored.

mod timing;

use crate::assets::TaskId;
use crate::catalog::LoadPolicy;
use std::time::{Duration, Instant};
use timing::Ticker;

pub const RAMP_INTERVAL: Duration = Duration::from_millis(100);
/// Simulated progress is only shown while below this value.
pub const RAMP_CEILING: u8 = 95;
pub const SUCCESS_SETTLE: Duration = Duration::from_millis(300);
pub const FAILURE_SETTLE: Duration = Duration::from_millis(1000);
/// Above this percentage the label sits on the filled part of the bar.
pub const TONE_THRESHOLD: u8 = 50;

pub const FAILURE_TEXT: &str = "Load failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTone {
    /// Light text over the empty track.
    Light,
    /// Dark text over the filled bar.
    Dark,
}

impl TextTone {
    pub fn for_percent(percent: u8) -> Self {
        if percent > TONE_THRESHOLD {
            TextTone::Dark
        } else {
            TextTone::Light
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            TextTone::Light => "#fff",
            TextTone::Dark => "#333",
        }
    }
}

/// What the view layer draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorView {
    pub visible: bool,
    pub percent: u8,
    pub text: String,
    pub tone: TextTone,
}

impl Default for IndicatorView {
    fn default() -> Self {
        Self {
            visible: false,
            percent: 0,
            text: String::new(),
            tone: TextTone::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    ticker: Ticker,
    simulated: u8,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Loading {
        task: TaskId,
        ramp: Option<Ramp>,
        watchdog: Option<Instant>,
    },
    Settling {
        hide_at: Instant,
    },
}

pub struct LoadingIndicator {
    phase: Phase,
    view: IndicatorView,
}

impl Default for LoadingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadingIndicator {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            view: IndicatorView::default(),
        }
    }

    pub fn view(&self) -> &IndicatorView {
        &self.view
    }

    pub fn owner(&self) -> Option<TaskId> {
        match self.phase {
            Phase::Loading { task, .. } => Some(task),
            _ => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// Show the indicator at 0% for `task` and arm its timers.
    pub fn begin(&mut self, task: TaskId, policy: &LoadPolicy, now: Instant) {
        if let Some(previous) = self.owner() {
            log::debug!("Load {} takes over the indicator from {}", task, previous);
        }
        let ramp = policy.simulated_ramp.then(|| Ramp {
            ticker: Ticker::new(RAMP_INTERVAL, now),
            simulated: 0,
        });
        let watchdog = policy.timeout_ms.map(|ms| now + Duration::from_millis(ms));
        self.phase = Phase::Loading { task, ramp, watchdog };
        self.view = IndicatorView {
            visible: true,
            ..IndicatorView::default()
        };
        self.set_percent(0);
    }

    /// Real progress for `task`. Cancels the simulated ramp; never moves
    /// the bar backwards.
    pub fn on_progress(&mut self, task: TaskId, percent: u8, _now: Instant) {
        match &mut self.phase {
            Phase::Loading { task: owner, ramp, .. } if *owner == task => *ramp = None,
            _ => return,
        }
        let percent = percent.min(100).max(self.view.percent);
        self.set_percent(percent);
    }

    /// Terminal event for `task`. Returns false when `task` no longer owns
    /// the indicator (superseded, or already given up on by the watchdog).
    pub fn finish(&mut self, task: TaskId, outcome: Outcome, now: Instant) -> bool {
        if self.owner() != Some(task) {
            return false;
        }
        self.settle(outcome, now);
        true
    }

    /// Advance timers. Returns the task whose watchdog fired, if any.
    pub fn poll(&mut self, now: Instant) -> Option<TaskId> {
        match self.phase {
            Phase::Idle => None,
            Phase::Settling { hide_at } => {
                if now >= hide_at {
                    self.phase = Phase::Idle;
                    self.view.visible = false;
                }
                None
            }
            Phase::Loading {
                task,
                mut ramp,
                watchdog,
            } => {
                if watchdog.is_some_and(|deadline| now >= deadline) {
                    self.settle(Outcome::TimedOut, now);
                    return Some(task);
                }
                if let Some(state) = ramp.as_mut() {
                    let ticks = state.ticker.due(now);
                    if ticks > 0 {
                        let simulated = (state.simulated as u32 + ticks).min(u8::MAX as u32) as u8;
                        state.simulated = simulated;
                        let shown = simulated.min(RAMP_CEILING - 1);
                        if shown > self.view.percent {
                            self.set_percent(shown);
                        }
                        if simulated >= RAMP_CEILING - 1 {
                            ramp = None;
                        }
                    }
                }
                self.phase = Phase::Loading { task, ramp, watchdog };
                None
            }
        }
    }

    /// Earliest instant at which [`LoadingIndicator::poll`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            Phase::Idle => None,
            Phase::Settling { hide_at } => Some(hide_at),
            Phase::Loading { ramp, watchdog, .. } => {
                let tick = ramp.map(|state| state.ticker.next_tick());
                match (tick, watchdog) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (a, b) => a.or(b),
                }
            }
        }
    }

    fn settle(&mut self, outcome: Outcome, now: Instant) {
        self.set_percent(100);
        let delay = match outcome {
            Outcome::Success | Outcome::TimedOut => SUCCESS_SETTLE,
            Outcome::Failure => {
                self.view.text = FAILURE_TEXT.to_string();
                FAILURE_SETTLE
            }
        };
        self.phase = Phase::Settling { hide_at: now + delay };
    }

    fn set_percent(&mut self, percent: u8) {
        self.view.percent = percent;
        self.view.text = format!("{percent}%");
        self.view.tone = TextTone::for_percent(percent);
    }
}
