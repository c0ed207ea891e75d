//! Hand-off of received frames from the interrupt to a lower priority consumer.
use bxcan::Frame;
use heapless::spsc::{Consumer, Producer};
use rtic_sync::signal::{SignalReader, SignalWriter};
use rtt_target::rprintln;

/// Depth of the queue between the receive interrupt and its consumer.
pub const RX_QUEUE_CAPACITY: usize = 8;

/// Interrupt side. Never blocks: when the queue is full the frame is counted
/// and dropped.
pub struct RxForwarder<'a, const N: usize> {
    producer: Producer<'a, Frame, N>,
    wake: SignalWriter<'a, ()>,
    dropped: u32,
}

impl<'a, const N: usize> RxForwarder<'a, N> {
    pub fn new(producer: Producer<'a, Frame, N>, wake: SignalWriter<'a, ()>) -> Self {
        RxForwarder {
            producer,
            wake,
            dropped: 0,
        }
    }

    /// Queues `frame`, giving it back if there is no room. The consumer is
    /// woken either way.
    pub fn forward(&mut self, frame: Frame) -> Result<(), Frame> {
        let queued = self.producer.enqueue(frame).map_err(|frame| {
            self.dropped = self.dropped.wrapping_add(1);
            frame
        });
        self.wake.write(());
        queued
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

/// Consumer side. Received frames are logged and discarded.
///
/// The wake-up is a latched signal: a frame forwarded while [`RxDrain::drain`]
/// runs leaves it set, so the next [`RxDrain::wait`] returns at once.
pub struct RxDrain<'a, const N: usize> {
    consumer: Consumer<'a, Frame, N>,
    wake: SignalReader<'a, ()>,
    drained: u32,
}

impl<'a, const N: usize> RxDrain<'a, N> {
    pub fn new(consumer: Consumer<'a, Frame, N>, wake: SignalReader<'a, ()>) -> Self {
        RxDrain {
            consumer,
            wake,
            drained: 0,
        }
    }

    /// Waits until the interrupt has forwarded something.
    pub async fn wait(&mut self) {
        self.wake.wait().await;
    }

    /// Consumes a pending wake-up without waiting.
    pub fn take_wake(&mut self) -> bool {
        self.wake.try_read().is_some()
    }

    /// Empties the queue and returns how many frames were taken out.
    pub fn drain(&mut self) -> usize {
        let mut count = 0;
        while let Some(frame) = self.consumer.dequeue() {
            rprintln!("Received {:?}", frame);
            count += 1;
        }
        self.drained = self.drained.wrapping_add(count as u32);
        count
    }

    /// Total number of frames drained so far.
    pub fn drained(&self) -> u32 {
        self.drained
    }
}
