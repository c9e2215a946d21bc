//! JUDI - host-link firmware
//!
//! Main firmware binary for RP2040-based boards. Answers JSON requests from
//! the host on UART0 (GPIO0 TX, GPIO1 RX).

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{self, BufferedInterruptHandler, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use judi_hal::uart::{DataBits, Parity, StopBits};
use judi_hal::UartConfig;

mod responder;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("JUDI firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let link = UartConfig::default();
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);

    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, rp_uart_config(&link));
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();

    info!(
        "UART initialized for host link at {} baud ({} us/char)",
        link.baudrate,
        link.char_time_us()
    );

    spawner.spawn(tasks::host_link_task(rx, tx)).unwrap();

    info!("All tasks spawned");
}

/// Translate the link settings into the RP2040 driver's config
fn rp_uart_config(link: &UartConfig) -> uart::Config {
    let mut config = uart::Config::default();
    config.baudrate = link.baudrate;
    config.data_bits = match link.data_bits {
        DataBits::Seven => uart::DataBits::DataBits7,
        DataBits::Eight => uart::DataBits::DataBits8,
    };
    config.parity = match link.parity {
        Parity::None => uart::Parity::ParityNone,
        Parity::Even => uart::Parity::ParityEven,
        Parity::Odd => uart::Parity::ParityOdd,
    };
    config.stop_bits = match link.stop_bits {
        StopBits::One => uart::StopBits::STOP1,
        StopBits::Two => uart::StopBits::STOP2,
    };
    config
}
