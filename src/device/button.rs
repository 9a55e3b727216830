use embedded_hal::digital::InputPin;
use log::warn;

use stoppedclocks::input::ButtonState;

/// Raw reader for the front button, closed to ground when pressed
pub struct Button<P> {
    pin: P,
}

impl<P: InputPin> Button<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// A failed read counts as released
    pub fn sample(&mut self) -> ButtonState {
        match self.pin.is_low() {
            Ok(low) => ButtonState::from_level_low(low),
            Err(e) => {
                warn!("Button read failed: {:?}", e);
                ButtonState::Released
            }
        }
    }
}
