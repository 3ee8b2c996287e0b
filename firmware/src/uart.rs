use defmt::warn;
use embassy_rp::uart::{self, Async, Error as UartError, UartRx, UartTx};
use link_core::{ByteSink, DataBits, LinkConfig, Parity, Producer, SendError, StopBits};

/// Map link settings onto the HAL's UART configuration.
pub fn uart_config(config: &LinkConfig) -> uart::Config {
    let mut cfg = uart::Config::default();
    cfg.baudrate = config.baudrate;
    cfg.data_bits = match config.data_bits {
        DataBits::Five => uart::DataBits::DataBits5,
        DataBits::Six => uart::DataBits::DataBits6,
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    cfg.parity = match config.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    cfg.stop_bits = match config.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    cfg
}

/// Outgoing link bytes over the UART transmitter.
///
/// Writes block until the byte is in the TX FIFO, so frames leave in order
/// even when the link task is preempted by the receive pump.
pub struct UartSink<'d> {
    tx: UartTx<'d, Async>,
}

impl<'d> UartSink<'d> {
    pub fn new(tx: UartTx<'d, Async>) -> Self {
        Self { tx }
    }
}

impl ByteSink for UartSink<'_> {
    fn send_byte(&mut self, byte: u8) -> Result<(), SendError> {
        self.tx.blocking_write(&[byte]).map_err(send_error)
    }

    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        self.tx.blocking_write(bytes).map_err(send_error)
    }
}

/// Moves received UART bytes into the ring buffer.
///
/// Runs on the high-priority executor; it is the only writer of the ring.
///
/// # Pins
///
/// Uses UART1 by default:
/// - GPIO 8: TX
/// - GPIO 9: RX
pub struct RxPump<'d, const N: usize> {
    rx: UartRx<'d, Async>,
    producer: Producer<'d, N>,
    dropped: u32,
}

impl<'d, const N: usize> RxPump<'d, N> {
    pub fn new(rx: UartRx<'d, Async>, producer: Producer<'d, N>) -> Self {
        Self {
            rx,
            producer,
            dropped: 0,
        }
    }

    /// Bytes lost because the ring was full.
    #[inline]
    #[must_use]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Receive one byte and buffer it.
    ///
    /// A full ring drops the byte; the assembler on the other side will see
    /// a CRC mismatch and request a retransmission.
    pub async fn pump(&mut self) {
        let mut byte = [0u8; 1];
        match self.rx.read(&mut byte).await {
            Ok(()) => {
                if !self.producer.write(byte[0]) {
                    self.dropped = self.dropped.wrapping_add(1);
                    warn!("rx ring full, byte dropped ({} total)", self.dropped);
                }
            }
            Err(e) => warn!("uart rx error: {:?}", e),
        }
    }

    /// Pump forever.
    pub async fn run(&mut self) -> ! {
        loop {
            self.pump().await;
        }
    }
}

fn send_error(e: UartError) -> SendError {
    match e {
        UartError::Overrun => SendError::Busy,
        _ => SendError::Io,
    }
}
