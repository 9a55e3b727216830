//! Input handling for the single front button
//!
//! The pin is polled on every loop tick rather than read from edge interrupts,
//! which keeps debouncing and click counting in one synchronous place. Each call
//! to [`ButtonMachine::poll`] applies every transition due at that instant and
//! returns at most one resolved action.

use log::{debug, info};

pub mod types;
pub use types::*;

/// Debounce and click classification state machine
#[derive(Debug, Clone)]
pub struct ButtonMachine {
    timing: ButtonTiming,
    /// Last raw sample and when it started reading that way
    raw: ButtonState,
    raw_since: u64,
    /// Committed, debounced state
    stable: ButtonState,
    clicks: ClickSequence,
    /// When the note was first seen on screen
    note_since: Option<u64>,
}

impl ButtonMachine {
    pub fn new(timing: ButtonTiming) -> Self {
        Self {
            timing,
            raw: ButtonState::Released,
            raw_since: 0,
            stable: ButtonState::Released,
            clicks: ClickSequence::default(),
            note_since: None,
        }
    }

    pub fn pending_clicks(&self) -> u8 {
        self.clicks.count
    }

    pub fn phase(&self) -> ButtonPhase {
        if self.raw != self.stable {
            ButtonPhase::Debouncing
        } else if self.stable.is_pressed() {
            ButtonPhase::Pressed {
                window_open: self.clicks.count > 0,
            }
        } else if self.clicks.count > 0 {
            ButtonPhase::AwaitingWindowExpiry
        } else {
            ButtonPhase::Idle
        }
    }

    /// Feed one raw sample taken at `now_ms`
    ///
    /// `note_shown` tells whether the note currently covers the poem; while it
    /// does, a press dismisses it at once instead of counting as a click.
    pub fn poll(&mut self, now_ms: u64, sample: ButtonState, note_shown: bool) -> Option<ButtonAction> {
        if sample != self.raw {
            self.raw = sample;
            self.raw_since = now_ms;
        }

        self.track_note(now_ms, note_shown);

        if self.raw != self.stable && now_ms.saturating_sub(self.raw_since) >= self.timing.debounce_ms {
            self.stable = self.raw;
            debug!("Button {}", self.stable);

            if self.stable.is_pressed() {
                if note_shown {
                    return Some(self.resolve_dismiss(now_ms));
                }
                self.clicks.count = self.clicks.count.saturating_add(1);
                self.clicks.window_start = now_ms;
            }
        }

        if note_shown {
            let idle = self.note_since.map_or(0, |since| now_ms.saturating_sub(since));
            let mid_press = self.stable.is_pressed() || self.raw.is_pressed();
            if idle >= self.timing.note_timeout_ms && !mid_press {
                info!("Note idle for {} ms", idle);
                return Some(self.resolve_dismiss(now_ms));
            }
            return None;
        }

        if self.clicks.count > 0
            && now_ms.saturating_sub(self.clicks.window_start) >= self.timing.click_window_ms
        {
            let action = if self.clicks.count == 1 {
                ButtonAction::Primary
            } else {
                ButtonAction::Secondary
            };
            info!("Button {} ({} clicks)", action, self.clicks.count);
            self.clicks = ClickSequence::default();
            return Some(action);
        }

        None
    }

    fn track_note(&mut self, now_ms: u64, note_shown: bool) {
        if !note_shown {
            self.note_since = None;
        } else if self.note_since.is_none() {
            self.note_since = Some(now_ms);
        }
    }

    fn resolve_dismiss(&mut self, now_ms: u64) -> ButtonAction {
        self.clicks = ClickSequence::default();
        // Restart the idle timer in case the note stays up
        self.note_since = Some(now_ms);
        info!("Button {}", ButtonAction::Dismiss);
        ButtonAction::Dismiss
    }
}

impl Default for ButtonMachine {
    fn default() -> Self {
        Self::new(ButtonTiming::default())
    }
}
