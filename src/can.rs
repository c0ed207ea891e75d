use stm32f1xx_hal::{
    afio,
    can::Can,
    gpio::{Alternate, Pin},
    pac::{CAN1, USB},
};

/// bxCAN driver for CAN1 on the blue pill.
pub type HarnessCan = bxcan::Can<Can<CAN1>>;

/// Routes CAN1 to PA11 (RX) / PA12 (TX) and hands the peripheral over to
/// bxcan, still in initialization mode.
///
/// Bit timing, filters and start are left to the harness bring-up.
pub fn setup(
    can1: CAN1,
    usb: USB,
    rx: Pin<'A', 11>,
    tx: Pin<'A', 12, Alternate>,
    mapr: &mut afio::MAPR,
) -> HarnessCan {
    let can_instance = Can::new(can1, usb);
    can_instance.assign_pins((tx, rx), mapr);

    bxcan::Can::builder(can_instance).leave_disabled()
}
