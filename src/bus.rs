use bxcan::{Fifo, Frame, Mailbox, StandardId};
use rtt_target::rprintln;

use crate::{
    config::{BusConfig, FilterConfig},
    error::{Error, PeripheralError},
    frame::{RxSlot, TxHeader, PAYLOAD_LEN},
    peripheral::{CanPeripheral, Notification},
};

/// Lifecycle of the bus handle. There is no way back to an earlier state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusState {
    Reset,
    Configured,
    Active,
}

/// The CAN bus handle.
///
/// Owns the peripheral together with the descriptors reused by every
/// transmission and reception. Each step of the bring-up checks the current
/// [`BusState`] before touching the hardware, so calling them out of order is
/// rejected instead of leaving the controller half configured.
pub struct CanBus<P> {
    peripheral: P,
    state: BusState,
    filter_installed: bool,
    notifications: bool,
    start_attempts: u32,
    tx_header: TxHeader,
    last_mailbox: Option<Mailbox>,
    rx_slot: RxSlot,
    overruns: u32,
}

impl<P: CanPeripheral> CanBus<P> {
    pub fn new(peripheral: P) -> Self {
        CanBus {
            peripheral,
            state: BusState::Reset,
            filter_installed: false,
            notifications: false,
            start_attempts: BusConfig::HARNESS.start_attempts,
            tx_header: TxHeader::new(),
            last_mailbox: None,
            rx_slot: RxSlot::new(),
            overruns: 0,
        }
    }

    pub fn state(&self) -> BusState {
        self.state
    }

    pub fn peripheral(&self) -> &P {
        &self.peripheral
    }

    pub fn tx_header(&self) -> &TxHeader {
        &self.tx_header
    }

    /// Mailbox used by the last successful transmission.
    pub fn last_mailbox(&self) -> Option<Mailbox> {
        self.last_mailbox
    }

    pub fn rx_slot(&self) -> &RxSlot {
        &self.rx_slot
    }

    /// Number of FIFO 0 overruns seen while reading.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    fn expect_state(&self, operation: &'static str, expected: BusState) -> Result<(), Error> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    /// Applies bit timing and mode. `Reset → Configured`.
    pub fn init(&mut self, config: &BusConfig) -> Result<(), Error> {
        self.expect_state("init", BusState::Reset)?;
        config.timing.validate()?;

        self.peripheral.init(config)?;
        self.start_attempts = config.start_attempts;
        self.state = BusState::Configured;

        rprintln!(
            "CAN configured: btr={:#010x} mode={:?}",
            config.timing.btr(),
            config.mode
        );
        Ok(())
    }

    /// Installs the acceptance filter. Only allowed before [`start()`][Self::start()].
    pub fn config_filter(&mut self, filter: &FilterConfig) -> Result<(), Error> {
        self.expect_state("config_filter", BusState::Configured)?;

        self.peripheral.config_filter(filter)?;
        self.filter_installed = true;

        rprintln!("CAN filter bank {} -> {:?}", filter.bank, filter.fifo);
        Ok(())
    }

    /// Joins the bus. `Configured → Active`.
    pub fn start(&mut self) -> Result<(), Error> {
        self.expect_state("start", BusState::Configured)?;
        if !self.filter_installed {
            return Err(Error::FilterMissing);
        }

        let mut attempts = 0;
        loop {
            match self.peripheral.start() {
                Ok(()) => break,
                Err(nb::Error::Other(e)) => return Err(e.into()),
                Err(nb::Error::WouldBlock) => {
                    attempts += 1;
                    if attempts >= self.start_attempts {
                        return Err(PeripheralError::Timeout.into());
                    }
                }
            }
        }

        self.state = BusState::Active;
        rprintln!("CAN active");
        Ok(())
    }

    pub fn activate_notification(&mut self, notification: Notification) -> Result<(), Error> {
        self.expect_state("activate_notification", BusState::Active)?;

        self.peripheral.activate_notification(notification)?;
        self.notifications = true;

        rprintln!("CAN notification enabled: {:?}", notification);
        Ok(())
    }

    /// Whether at least one interrupt notification has been enabled.
    pub fn notifications_enabled(&self) -> bool {
        self.notifications
    }

    /// Sends an 8 byte data frame with a standard identifier.
    pub fn send_std(&mut self, id: u16, data: &[u8; PAYLOAD_LEN]) -> Result<Mailbox, Error> {
        let id = StandardId::new(id).ok_or(Error::InvalidIdentifier(id))?;
        self.expect_state("send_std", BusState::Active)?;

        self.tx_header.prepare(id);
        let frame = self.tx_header.to_frame(data);

        let mailbox = self.peripheral.add_tx_message(&frame)?;
        self.last_mailbox = Some(mailbox);
        Ok(mailbox)
    }

    /// Reads exactly one pending frame from FIFO 0 into the receive slot.
    ///
    /// The frame is also returned so it can be handed to another context.
    ///
    /// An overrun only means newer frames were lost: the flag is cleared, the
    /// overrun counted and the read retried once, so the frames still held in
    /// the FIFO are not stranded.
    pub fn receive_fifo0(&mut self) -> Result<Frame, Error> {
        self.expect_state("receive_fifo0", BusState::Active)?;

        let frame = match self.peripheral.get_rx_message(Fifo::Fifo0) {
            Err(PeripheralError::Overrun) => {
                self.overruns = self.overruns.wrapping_add(1);
                rprintln!("FIFO 0 overrun ({} so far)", self.overruns);
                self.peripheral.get_rx_message(Fifo::Fifo0)?
            }
            received => received?,
        };
        self.rx_slot.store(&frame, Fifo::Fifo0);
        Ok(frame)
    }
}
