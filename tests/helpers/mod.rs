/// Simulated bxCAN controller used to drive the harness on the host.
///
/// `SimulatedCan` is a cheap handle: the harness owns one clone, the test keeps
/// another to deliver frames and inspect what the driver did.
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use bxcan::{Fifo, Frame, Mailbox};
use can_test_harness::{
    config::{BusConfig, FilterConfig},
    error::PeripheralError,
    peripheral::{CanPeripheral, Notification},
};

/// Receive FIFOs on bxCAN are three frames deep.
pub const FIFO_DEPTH: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    Init,
    ConfigFilter,
    Start,
    ActivateNotification,
    Transmit,
    Receive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Init(BusConfig),
    ConfigFilter(FilterConfig),
    Start,
    ActivateNotification(Notification),
    Transmit(Frame),
    Receive,
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Init(_) => OpKind::Init,
            Op::ConfigFilter(_) => OpKind::ConfigFilter,
            Op::Start => OpKind::Start,
            Op::ActivateNotification(_) => OpKind::ActivateNotification,
            Op::Transmit(_) => OpKind::Transmit,
            Op::Receive => OpKind::Receive,
        }
    }
}

#[derive(Default)]
struct Controller {
    ops: Vec<Op>,
    wire: Vec<Frame>,
    filter: Option<FilterConfig>,
    notifications: Vec<Notification>,
    mailboxes: [Option<Frame>; 3],
    fifo0: VecDeque<Frame>,
    overrun: bool,
    fail_on: Option<OpKind>,
}

#[derive(Clone, Default)]
pub struct SimulatedCan {
    inner: Rc<RefCell<Controller>>,
}

#[allow(dead_code)]
impl SimulatedCan {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next call of this kind returns `PeripheralError::Fault`.
    pub fn fail_next(&self, kind: OpKind) {
        self.inner.borrow_mut().fail_on = Some(kind);
    }

    /// Every call made by the driver, in order.
    pub fn ops(&self) -> Vec<Op> {
        self.inner.borrow().ops.clone()
    }

    pub fn kinds(&self) -> Vec<OpKind> {
        self.inner.borrow().ops.iter().map(Op::kind).collect()
    }

    pub fn op_count(&self) -> usize {
        self.inner.borrow().ops.len()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.borrow().notifications.clone()
    }

    /// Frames that left the mailboxes and reached the bus.
    pub fn wire(&self) -> Vec<Frame> {
        self.inner.borrow().wire.clone()
    }

    pub fn fifo0_len(&self) -> usize {
        self.inner.borrow().fifo0.len()
    }

    /// A frame arrives from the bus. Returns whether it was routed to FIFO 0.
    pub fn deliver(&self, frame: Frame) -> bool {
        let mut ctrl = self.inner.borrow_mut();
        let accepted = match &ctrl.filter {
            Some(filter) => filter.fifo == Fifo::Fifo0 && filter.mask.matches(&frame),
            None => false,
        };
        if !accepted {
            return false;
        }

        if ctrl.fifo0.len() == FIFO_DEPTH {
            ctrl.overrun = true;
        } else {
            ctrl.fifo0.push_back(frame);
        }
        true
    }

    /// Every pending mailbox wins arbitration and is emptied.
    pub fn complete_transmissions(&self) {
        let mut ctrl = self.inner.borrow_mut();
        let Controller {
            mailboxes, wire, ..
        } = &mut *ctrl;
        for slot in mailboxes.iter_mut() {
            if let Some(frame) = slot.take() {
                wire.push(frame);
            }
        }
    }

    fn record(&self, op: Op) -> Result<(), PeripheralError> {
        let mut ctrl = self.inner.borrow_mut();
        let kind = op.kind();
        ctrl.ops.push(op);
        if ctrl.fail_on == Some(kind) {
            ctrl.fail_on = None;
            return Err(PeripheralError::Fault);
        }
        Ok(())
    }
}

impl CanPeripheral for SimulatedCan {
    fn init(&mut self, config: &BusConfig) -> Result<(), PeripheralError> {
        self.record(Op::Init(*config))
    }

    fn config_filter(&mut self, filter: &FilterConfig) -> Result<(), PeripheralError> {
        self.record(Op::ConfigFilter(*filter))?;
        self.inner.borrow_mut().filter = Some(*filter);
        Ok(())
    }

    fn start(&mut self) -> nb::Result<(), PeripheralError> {
        self.record(Op::Start)?;
        Ok(())
    }

    fn activate_notification(
        &mut self,
        notification: Notification,
    ) -> Result<(), PeripheralError> {
        self.record(Op::ActivateNotification(notification))?;
        self.inner.borrow_mut().notifications.push(notification);
        Ok(())
    }

    fn add_tx_message(&mut self, frame: &Frame) -> Result<Mailbox, PeripheralError> {
        self.record(Op::Transmit(frame.clone()))?;

        let mut ctrl = self.inner.borrow_mut();
        let free = ctrl
            .mailboxes
            .iter()
            .position(Option::is_none)
            .ok_or(PeripheralError::NoFreeMailbox)?;
        ctrl.mailboxes[free] = Some(frame.clone());

        Ok(match free {
            0 => Mailbox::Mailbox0,
            1 => Mailbox::Mailbox1,
            _ => Mailbox::Mailbox2,
        })
    }

    fn get_rx_message(&mut self, fifo: Fifo) -> Result<Frame, PeripheralError> {
        self.record(Op::Receive)?;
        assert_eq!(fifo, Fifo::Fifo0, "only FIFO 0 is in use");

        let mut ctrl = self.inner.borrow_mut();
        if ctrl.overrun {
            ctrl.overrun = false;
            return Err(PeripheralError::Overrun);
        }
        ctrl.fifo0.pop_front().ok_or(PeripheralError::FifoEmpty)
    }
}
