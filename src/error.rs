//! Typed outcomes for the harness. Hardware calls report a [`PeripheralError`],
//! everything above the peripheral reports an [`Error`].
use thiserror_no_std::Error;

use crate::bus::BusState;

/// A vendor call did not return OK.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralError {
    /// All three transmit mailboxes are pending.
    #[error("No free transmit mailbox")]
    NoFreeMailbox,
    /// The receive FIFO was read while empty.
    #[error("Receive FIFO is empty")]
    FifoEmpty,
    /// The receive FIFO overflowed and at least one frame was lost. The
    /// frames already queued are still readable.
    #[error("Receive FIFO overrun")]
    Overrun,
    /// The peripheral did not synchronize to the bus in time.
    #[error("Timed out waiting for the peripheral")]
    Timeout,
    /// The requested filter bank does not exist on this instance.
    #[error("Filter bank {bank} out of range (available: {available})")]
    FilterBankOutOfRange { bank: u8, available: u8 },
    /// Any other hardware failure.
    #[error("Peripheral fault")]
    Fault,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("CAN peripheral error: {0}")]
    Peripheral(#[from] PeripheralError),

    /// The operation is not allowed in the current bus state.
    #[error("{operation} is not allowed in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: BusState,
    },

    /// The peripheral was started before an acceptance filter was installed.
    #[error("No acceptance filter installed")]
    FilterMissing,

    /// Identifier does not fit in 11 bits.
    #[error("Invalid standard identifier: {0:#x}")]
    InvalidIdentifier(u16),

    /// Bit timing parameters are outside of the peripheral's ranges.
    #[error("Invalid bit timing")]
    InvalidTiming,

    /// An earlier failure stopped the harness.
    #[error("Harness halted")]
    Halted,
}
