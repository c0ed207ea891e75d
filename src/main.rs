#![no_std]
#![no_main]

use can_test_harness::Error;
use cortex_m::asm::nop;
use panic_rtt_target as _;
use rtic::app;
use rtt_target::rprintln;

mod can;
mod led;

/// Terminal state: no further CAN traffic, interrupts off.
fn fatal(err: Error) -> ! {
    rprintln!("Fatal: {}", err);
    cortex_m::interrupt::disable();
    loop {
        nop();
    }
}

#[app(device = stm32f1xx_hal::pac, peripherals = true, dispatchers = [TIM2])]
mod app {
    use bxcan::Frame;
    use can_test_harness::{
        harness::Sequence,
        rx::{RxDrain, RxForwarder, RX_QUEUE_CAPACITY},
        status::ActivityLed,
        BusConfig, FilterConfig, Harness,
    };
    use heapless::spsc::Queue;
    use rtic_sync::signal::Signal;
    use rtic_monotonics::systick::prelude::*;
    use rtt_target::{rprintln, rtt_init_print};
    use stm32f1xx_hal::{
        flash::FlashExt,
        prelude::*,
        rcc::RccExt,
    };

    use crate::can::{self, HarnessCan};
    use crate::fatal;
    use crate::led::LedPin;

    systick_monotonic!(Mono, 1_000);

    type StatusLed = ActivityLed<LedPin<'C', 13>>;

    #[shared]
    struct Shared {
        harness: Harness<HarnessCan, Sequence>,
        led: StatusLed,
    }

    #[local]
    struct Local {
        rx_forwarder: RxForwarder<'static, RX_QUEUE_CAPACITY>,
        rx_drain: RxDrain<'static, RX_QUEUE_CAPACITY>,
    }

    #[init(local = [
        q: Queue<Frame, RX_QUEUE_CAPACITY> = Queue::new(),
        rx_wake: Signal<()> = Signal::new(),
    ])]
    fn init(cx: init::Context) -> (Shared, Local) {
        rtt_init_print!();
        rprintln!("Initializing...");

        // Init flash, RCC and clocks
        let mut flash = cx.device.FLASH.constrain();
        let rcc = cx.device.RCC.constrain();
        let clocks = rcc.cfgr.use_hse(8.MHz()).freeze(&mut flash.acr);

        Mono::start(cx.core.SYST, clocks.sysclk().raw());

        // GPIO
        let mut gpioa = cx.device.GPIOA.split();
        let mut gpioc = cx.device.GPIOC.split();
        let mut afio = cx.device.AFIO.constrain();

        let pin = LedPin {
            pin: gpioc.pc13.into_push_pull_output(&mut gpioc.crh),
        };
        let mut led = match ActivityLed::new(pin, true) {
            Ok(led) => led,
            Err(never) => match never {},
        };

        // CAN bus
        let bus = can::setup(
            cx.device.CAN1,
            cx.device.USB,
            gpioa.pa11.into_floating_input(&mut gpioa.crh), // rx
            gpioa.pa12.into_alternate_push_pull(&mut gpioa.crh), // tx
            &mut afio.mapr,
        );

        let mut harness = Harness::new(bus, Sequence::default());
        if let Err(e) = harness.bring_up(&BusConfig::HARNESS, &FilterConfig::ACCEPT_ALL) {
            led.fault().ok();
            fatal(e);
        }
        rprintln!(
            "CAN bit rate: {} Hz",
            BusConfig::HARNESS.timing.bitrate(clocks.pclk1()).raw()
        );

        // Received frames are handed from the interrupt to `drain_rx`
        let (producer, consumer) = cx.local.q.split();
        let (wake_writer, wake_reader) = cx.local.rx_wake.split();

        heartbeat::spawn().ok();
        drain_rx::spawn().ok();

        (
            Shared { harness, led },
            Local {
                rx_forwarder: RxForwarder::new(producer, wake_writer),
                rx_drain: RxDrain::new(consumer, wake_reader),
            },
        )
    }

    #[idle]
    fn idle(_: idle::Context) -> ! {
        rprintln!("Entering idle loop");
        loop {
            cortex_m::asm::wfi();
        }
    }

    #[task(priority = 1, shared = [harness, led])]
    async fn heartbeat(mut cx: heartbeat::Context) {
        loop {
            let now = Mono::now();
            let polled = cx
                .shared
                .harness
                .lock(|harness| harness.poll(now).map(|sent| (sent, harness.next_due(now))));

            match polled {
                Ok((sent, due)) => {
                    if sent.is_some() {
                        cx.shared.led.lock(|led| led.toggle().ok());
                    }
                    Mono::delay_until(due).await;
                }
                Err(e) => {
                    cx.shared.led.lock(|led| led.fault().ok());
                    fatal(e);
                }
            }
        }
    }

    #[task(binds = USB_LP_CAN_RX0, priority = 2, shared = [harness, led], local = [rx_forwarder])]
    fn can_rx0(mut cx: can_rx0::Context) {
        match cx.shared.harness.lock(|harness| harness.on_fifo0_pending()) {
            Ok(frame) => {
                let forwarder = cx.local.rx_forwarder;
                if forwarder.forward(frame).is_err() {
                    rprintln!("RX queue full, {} frames dropped", forwarder.dropped());
                }
            }
            Err(e) => {
                cx.shared.led.lock(|led| led.fault().ok());
                fatal(e);
            }
        }
    }

    #[task(priority = 1, local = [rx_drain])]
    async fn drain_rx(cx: drain_rx::Context) {
        let rx_drain = cx.local.rx_drain;
        loop {
            rx_drain.wait().await;
            rx_drain.drain();
            rprintln!("{} frames received", rx_drain.drained());
        }
    }
}
