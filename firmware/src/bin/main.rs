#![no_std]
#![no_main]

use cortex_m_rt::entry;
use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::{Executor, InterruptExecutor};
use embassy_rp::bind_interrupts;
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::Uart;
use embassy_time::{Duration, Ticker};
use static_cell::StaticCell;
use uart_packet_link::{
    uart_config, Link, LinkConfig, LinkEvent, RingBuffer, RxPump, UartSink,
    DEFAULT_RING_CAPACITY,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
});

type UartLink = Link<'static, UartSink<'static>>;

/// Ticks between stats reports (10 s at 1 ms).
const STATS_INTERVAL: u32 = 10_000;

/// Receive ring shared by the pump (writer) and the link (reader).
static RX_RING: StaticCell<RingBuffer<DEFAULT_RING_CAPACITY>> = StaticCell::new();

/// Receive pump runs here, above the link task.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_LOW: StaticCell<Executor> = StaticCell::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

#[entry]
fn main() -> ! {
    info!("uart-packet-link starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- UART Setup ---
    let config = LinkConfig::default();

    let uart = Uart::new(
        p.UART1,
        p.PIN_8, // TX
        p.PIN_9, // RX
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        uart_config(&config),
    );
    let (tx, rx) = uart.split();

    // --- Link Setup ---
    let ring = RX_RING.init(RingBuffer::new());
    let (producer, consumer) = ring.split();
    let pump = RxPump::new(rx, producer);

    let link: UartLink = match Link::new(config, consumer, UartSink::new(tx)) {
        Ok(link) => link,
        Err(e) => {
            error!("link config rejected: {:?}", e);
            panic!("invalid link configuration");
        }
    };

    // High priority: receive pump
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    spawner.spawn(rx_task(pump).unwrap());

    // Thread mode: link processing
    let executor = EXECUTOR_LOW.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(link_task(link).unwrap());
        info!("uart-packet-link initialized, waiting for frames...");
    })
}

/// Receive task - moves UART bytes into the ring buffer.
#[embassy_executor::task]
async fn rx_task(mut pump: RxPump<'static, DEFAULT_RING_CAPACITY>) {
    pump.run().await
}

/// Link task - assembles frames every millisecond and echoes payloads back.
#[embassy_executor::task]
async fn link_task(mut link: UartLink) {
    let mut ticker = Ticker::every(Duration::from_millis(1));
    let mut ticks: u32 = 0;

    loop {
        while let Some(event) = link.poll() {
            if event == LinkEvent::RetransmitRequested {
                if let Err(e) = link.resend_last() {
                    warn!("resend failed: {:?}", e);
                }
            }
        }

        while let Some(packet) = link.dequeue_packet() {
            info!("received {} bytes: {=[u8]:x}", packet.length, packet.payload());
            if let Err(e) = link.send_payload(packet.payload()) {
                error!("echo failed: {:?}", e);
            }
        }

        ticks = ticks.wrapping_add(1);
        if ticks % STATS_INTERVAL == 0 {
            info!("{}: {:?}", link.line(), link.stats());
        }

        ticker.next().await;
    }
}
