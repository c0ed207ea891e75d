//! The vendor calls the harness relies on, as a trait.
//!
//! [`CanPeripheral`] is implemented for [`bxcan::Can`] so the firmware drives
//! the real bxCAN block, while tests substitute a simulated controller.
use bxcan::{Fifo, FilterOwner, Frame, Interrupt, Mailbox};
use rtt_target::rprintln;

use crate::{
    config::{BusConfig, FilterConfig},
    error::PeripheralError,
};

/// Interrupt sources the harness can enable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    /// A frame is pending in receive FIFO 0.
    Fifo0MessagePending,
}

impl Notification {
    fn as_interrupt(self) -> Interrupt {
        match self {
            Notification::Fifo0MessagePending => Interrupt::Fifo0MessagePending,
        }
    }
}

pub trait CanPeripheral {
    /// Applies bit timing and mode. The peripheral stays in initialization mode.
    fn init(&mut self, config: &BusConfig) -> Result<(), PeripheralError>;

    /// Installs one acceptance filter bank, replacing any previous banks.
    fn config_filter(&mut self, filter: &FilterConfig) -> Result<(), PeripheralError>;

    /// Leaves initialization mode. `WouldBlock` until the controller has
    /// synchronized with the bus.
    fn start(&mut self) -> nb::Result<(), PeripheralError>;

    fn activate_notification(&mut self, notification: Notification)
        -> Result<(), PeripheralError>;

    /// Queues a frame in any free transmit mailbox.
    fn add_tx_message(&mut self, frame: &Frame) -> Result<Mailbox, PeripheralError>;

    /// Pops the oldest frame from `fifo`.
    ///
    /// A pending overrun is reported once as [`PeripheralError::Overrun`]
    /// without consuming a frame.
    fn get_rx_message(&mut self, fifo: Fifo) -> Result<Frame, PeripheralError>;
}

impl<I: FilterOwner> CanPeripheral for bxcan::Can<I> {
    fn init(&mut self, config: &BusConfig) -> Result<(), PeripheralError> {
        self.modify_config()
            .set_bit_timing(config.timing.btr())
            .set_loopback(config.mode.loopback())
            .set_silent(config.mode.silent())
            .set_automatic_retransmit(config.automatic_retransmit)
            .leave_disabled();
        Ok(())
    }

    fn config_filter(&mut self, filter: &FilterConfig) -> Result<(), PeripheralError> {
        let mut filters = self.modify_filters();

        let available = filters.num_banks();
        if filter.bank >= available {
            return Err(PeripheralError::FilterBankOutOfRange {
                bank: filter.bank,
                available,
            });
        }

        filters
            .clear()
            .enable_bank(filter.bank, filter.fifo, filter.mask.as_mask32());

        // Dropping `filters` leaves filter initialization mode.
        Ok(())
    }

    fn start(&mut self) -> nb::Result<(), PeripheralError> {
        self.enable_non_blocking()
            .map_err(|e| e.map(|never| match never {}))
    }

    fn activate_notification(
        &mut self,
        notification: Notification,
    ) -> Result<(), PeripheralError> {
        self.enable_interrupt(notification.as_interrupt());
        Ok(())
    }

    fn add_tx_message(&mut self, frame: &Frame) -> Result<Mailbox, PeripheralError> {
        match self.transmit(frame) {
            Ok(status) => {
                if let Some(dequeued) = status.dequeued_frame() {
                    rprintln!("Lower priority frame dropped from mailbox: {:?}", dequeued);
                }
                Ok(status.mailbox())
            }
            Err(nb::Error::WouldBlock) => Err(PeripheralError::NoFreeMailbox),
            Err(nb::Error::Other(never)) => match never {},
        }
    }

    fn get_rx_message(&mut self, fifo: Fifo) -> Result<Frame, PeripheralError> {
        let (_, rx0, rx1) = self.split_by_ref();
        let received = match fifo {
            Fifo::Fifo0 => rx0.receive(),
            Fifo::Fifo1 => rx1.receive(),
        };

        match received {
            Ok(frame) => Ok(frame),
            Err(nb::Error::WouldBlock) => Err(PeripheralError::FifoEmpty),
            Err(nb::Error::Other(_overrun)) => Err(PeripheralError::Overrun),
        }
    }
}
