//! Top-level harness context: brings the bus up, sends the heartbeat frame on
//! schedule and reads frames on receive notifications.
//!
//! The first error is latched. From then on every operation returns
//! [`Error::Halted`] without touching the peripheral, and the caller is
//! expected to stop the device.
use bxcan::{Frame, Mailbox};
use rtt_target::rprintln;

use crate::{
    bus::CanBus,
    config::{BusConfig, FilterConfig},
    error::Error,
    frame::PAYLOAD_LEN,
    peripheral::{CanPeripheral, Notification},
};

/// Millisecond instant, same representation as the SysTick monotonic at 1 kHz.
pub type Instant = fugit::TimerInstantU32<1000>;
pub type Duration = fugit::MillisDurationU32;

/// Identifier of the periodic frame.
pub const HEARTBEAT_ID: u16 = 0x200;
pub const HEARTBEAT_PERIOD: Duration = Duration::millis(500);

/// Supplies the data bytes of each heartbeat frame.
pub trait PayloadSource {
    fn next_payload(&mut self) -> [u8; PAYLOAD_LEN];
}

/// Same bytes every time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fixed(pub [u8; PAYLOAD_LEN]);

impl PayloadSource for Fixed {
    fn next_payload(&mut self) -> [u8; PAYLOAD_LEN] {
        self.0
    }
}

/// Big-endian frame counter, so a bus monitor can spot lost frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Sequence {
    next: u64,
}

impl PayloadSource for Sequence {
    fn next_payload(&mut self) -> [u8; PAYLOAD_LEN] {
        let payload = self.next.to_be_bytes();
        self.next = self.next.wrapping_add(1);
        payload
    }
}

/// Fixed-rate schedule for the periodic frame.
#[derive(Clone, Copy, Debug)]
pub struct Heartbeat {
    pub id: u16,
    pub period: Duration,
    next_due: Option<Instant>,
}

impl Heartbeat {
    pub const fn new(id: u16, period: Duration) -> Self {
        Heartbeat {
            id,
            period,
            next_due: None,
        }
    }

    /// The first poll is always due.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.next_due {
            Some(due) => now >= due,
            None => true,
        }
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    /// Moves the deadline one period forward. Missed periods are skipped
    /// rather than sent back to back.
    fn advance(&mut self, now: Instant) {
        let next = match self.next_due {
            Some(due) => due + self.period,
            None => now + self.period,
        };

        self.next_due = Some(if next <= now { now + self.period } else { next });
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(HEARTBEAT_ID, HEARTBEAT_PERIOD)
    }
}

pub struct Harness<P, S> {
    bus: CanBus<P>,
    heartbeat: Heartbeat,
    payload: S,
    fault: Option<Error>,
    sent: u32,
    received: u32,
}

impl<P: CanPeripheral, S: PayloadSource> Harness<P, S> {
    pub fn new(peripheral: P, payload: S) -> Self {
        Self::with_heartbeat(peripheral, payload, Heartbeat::default())
    }

    pub fn with_heartbeat(peripheral: P, payload: S, heartbeat: Heartbeat) -> Self {
        Harness {
            bus: CanBus::new(peripheral),
            heartbeat,
            payload,
            fault: None,
            sent: 0,
            received: 0,
        }
    }

    pub fn bus(&self) -> &CanBus<P> {
        &self.bus
    }

    pub fn heartbeat(&self) -> &Heartbeat {
        &self.heartbeat
    }

    /// The error that stopped the harness, if any.
    pub fn fault(&self) -> Option<Error> {
        self.fault
    }

    pub fn is_halted(&self) -> bool {
        self.fault.is_some()
    }

    /// Number of heartbeat frames handed to the peripheral.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// Number of frames read from FIFO 0.
    pub fn received(&self) -> u32 {
        self.received
    }

    fn guard(&self) -> Result<(), Error> {
        match self.fault {
            Some(_) => Err(Error::Halted),
            None => Ok(()),
        }
    }

    fn latch<T>(&mut self, result: Result<T, Error>) -> Result<T, Error> {
        if let Err(e) = &result {
            rprintln!("Harness halted: {}", e);
            self.fault = Some(*e);
        }
        result
    }

    /// Runs the whole bus bring-up: init, filter, start, FIFO 0 notification.
    pub fn bring_up(&mut self, config: &BusConfig, filter: &FilterConfig) -> Result<(), Error> {
        self.guard()?;

        let result = Self::bring_up_bus(&mut self.bus, config, filter);
        self.latch(result)
    }

    fn bring_up_bus(
        bus: &mut CanBus<P>,
        config: &BusConfig,
        filter: &FilterConfig,
    ) -> Result<(), Error> {
        bus.init(config)?;
        bus.config_filter(filter)?;
        bus.start()?;
        bus.activate_notification(Notification::Fifo0MessagePending)
    }

    /// Sends the heartbeat frame if it is due at `now`.
    ///
    /// Returns the mailbox used, or `None` when nothing was due.
    pub fn poll(&mut self, now: Instant) -> Result<Option<Mailbox>, Error> {
        self.guard()?;
        if !self.heartbeat.is_due(now) {
            return Ok(None);
        }

        let payload = self.payload.next_payload();
        let result = self.bus.send_std(self.heartbeat.id, &payload);
        let mailbox = self.latch(result)?;

        self.heartbeat.advance(now);
        self.sent = self.sent.wrapping_add(1);
        Ok(Some(mailbox))
    }

    /// Deadline of the next heartbeat. Before the first poll this is `now`.
    pub fn next_due(&self, now: Instant) -> Instant {
        self.heartbeat.next_due().unwrap_or(now)
    }

    /// Handles a "frame pending in FIFO 0" notification. Reads exactly one frame.
    pub fn on_fifo0_pending(&mut self) -> Result<Frame, Error> {
        self.guard()?;

        let result = self.bus.receive_fifo0();
        let frame = self.latch(result)?;

        self.received = self.received.wrapping_add(1);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u32) -> Instant {
        Instant::from_ticks(ms)
    }

    #[test]
    fn first_poll_is_due() {
        let hb = Heartbeat::default();
        assert!(hb.is_due(at(0)));
        assert_eq!(hb.next_due(), None);
    }

    #[test]
    fn schedule_is_drift_free() {
        let mut hb = Heartbeat::default();
        hb.advance(at(0));
        assert_eq!(hb.next_due(), Some(at(500)));

        // Polled a little late, the following deadline does not move.
        hb.advance(at(503));
        assert_eq!(hb.next_due(), Some(at(1000)));
        assert!(!hb.is_due(at(999)));
        assert!(hb.is_due(at(1000)));
    }

    #[test]
    fn missed_periods_are_skipped() {
        let mut hb = Heartbeat::default();
        hb.advance(at(0));
        hb.advance(at(1700));
        assert_eq!(hb.next_due(), Some(at(2200)));
    }

    #[test]
    fn sequence_payload_counts_up() {
        let mut seq = Sequence::default();
        assert_eq!(seq.next_payload(), [0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(seq.next_payload(), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(seq.next_payload(), [0, 0, 0, 0, 0, 0, 0, 2]);
    }

    #[test]
    fn fixed_payload_repeats() {
        let mut fixed = Fixed([9; 8]);
        assert_eq!(fixed.next_payload(), [9; 8]);
        assert_eq!(fixed.next_payload(), [9; 8]);
    }
}
