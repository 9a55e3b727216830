//! Types for input handling

/// Debounced button state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    Pressed,
    #[default]
    Released,
}

impl ButtonState {
    /// The button closes to ground, so a low pin reads as pressed
    pub fn from_level_low(is_low: bool) -> Self {
        if is_low {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }

    pub fn is_pressed(&self) -> bool {
        matches!(self, ButtonState::Pressed)
    }
}

/// Resolved button gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    /// Single click: reveal the note for the current poem
    Primary,
    /// Two or more clicks inside the window: like the current poem
    Secondary,
    /// Any press, or the idle timeout, while the note is on screen
    Dismiss,
}

/// Where the state machine is, derived from its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    Idle,
    /// Raw reading differs from the committed state and is being held
    Debouncing,
    Pressed { window_open: bool },
    /// Released with clicks pending resolution
    AwaitingWindowExpiry,
}

/// Presses coalesced into one gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickSequence {
    pub count: u8,
    /// Time of the latest press; the window runs from here
    pub window_start: u64,
}

/// Timing constants, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTiming {
    pub debounce_ms: u64,
    pub click_window_ms: u64,
    /// Note is dismissed on its own after this long without a press
    pub note_timeout_ms: u64,
    /// How often the pin is sampled
    pub poll_interval_ms: u64,
}

impl Default for ButtonTiming {
    fn default() -> Self {
        Self {
            debounce_ms: 50,
            click_window_ms: 400,
            note_timeout_ms: 10_000,
            poll_interval_ms: 10,
        }
    }
}

impl std::fmt::Display for ButtonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ButtonState::Pressed => write!(f, "pressed"),
            ButtonState::Released => write!(f, "released"),
        }
    }
}

impl std::fmt::Display for ButtonAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ButtonAction::Primary => write!(f, "single click"),
            ButtonAction::Secondary => write!(f, "multi click"),
            ButtonAction::Dismiss => write!(f, "dismiss"),
        }
    }
}
