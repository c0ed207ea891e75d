//! CAN bus test harness for a bxCAN peripheral.
//!
//! Sends an 8 byte data frame with identifier `0x200` every 500 ms and reads
//! every frame delivered to receive FIFO 0. The hardware is reached through
//! [`peripheral::CanPeripheral`], implemented for [`bxcan::Can`], so the whole
//! crate except the firmware binary runs on the host.
#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod config;
pub mod error;
pub mod frame;
pub mod harness;
pub mod peripheral;
pub mod rx;
pub mod status;

pub use bus::{BusState, CanBus};
pub use config::{BitTiming, BusConfig, FilterConfig, Mask, Mode};
pub use error::{Error, PeripheralError};
pub use harness::{Harness, Heartbeat, PayloadSource, HEARTBEAT_ID, HEARTBEAT_PERIOD};
pub use peripheral::{CanPeripheral, Notification};
