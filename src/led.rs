use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use stm32f1xx_hal::gpio::{Output, Pin};

/// A [`stm32f1xx_hal::gpio::Pin`] wrapper implementing the [`embedded_hal::digital::OutputPin`] trait.
pub struct LedPin<const P: char, const N: u8> {
    pub pin: Pin<P, N, Output>,
}

impl<const P: char, const N: u8> ErrorType for LedPin<P, N> {
    type Error = Infallible;
}

impl<const P: char, const N: u8> OutputPin for LedPin<P, N> {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high();
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low();
        Ok(())
    }
}
