use embedded_hal::digital::OutputPin;

/// Status LED: toggles on every transmitted frame, stays lit once halted.
pub struct ActivityLed<P> {
    pin: P,
    active_low: bool,
    lit: bool,
}

impl<P: OutputPin> ActivityLed<P> {
    /// `active_low` is set for LEDs wired to VCC, like PC13 on the blue pill.
    pub fn new(pin: P, active_low: bool) -> Result<Self, P::Error> {
        let mut led = ActivityLed {
            pin,
            active_low,
            lit: false,
        };
        led.set(false)?;
        Ok(led)
    }

    fn set(&mut self, lit: bool) -> Result<(), P::Error> {
        if lit != self.active_low {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        self.lit = lit;
        Ok(())
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn toggle(&mut self) -> Result<(), P::Error> {
        self.set(!self.lit)
    }

    pub fn fault(&mut self) -> Result<(), P::Error> {
        self.set(true)
    }
}
