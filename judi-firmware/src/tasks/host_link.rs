//! Host UART link task
//!
//! Receives JSON objects from the host and answers them in place.

use defmt::*;
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embassy_time::{with_timeout, Duration};
use embedded_io_async::Read;

use judi_hal::Clock;
use judi_protocol::{Correlation, MessagePort, ReceiverConfig};

use crate::responder::{EmbassyClock, HostResponder};

/// Buffer size for UART receive
const RX_BUF_SIZE: usize = 64;

/// How long to wait for input before checking the receive timeouts
const IDLE_POLL: Duration = Duration::from_millis(20);

/// Host link task - frames, dispatches and answers host requests
#[embassy_executor::task]
pub async fn host_link_task(mut rx: BufferedUartRx, tx: BufferedUartTx) {
    info!("Host link task started");

    let clock = EmbassyClock;
    let correlation = Correlation::new();
    let mut responder = HostResponder::new(&correlation, tx);
    let mut port = MessagePort::new(ReceiverConfig::default());
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        match with_timeout(IDLE_POLL, rx.read(&mut buf)).await {
            Ok(Ok(n)) => {
                trace!("RX: {} bytes", n);
                let now_ms = clock.now_ms();
                for &byte in &buf[..n] {
                    if let Err(e) = port.ingest(byte, now_ms, &correlation, &mut responder) {
                        warn!("Host message discarded: {}", e);
                    }
                }
            }
            Ok(Err(e)) => {
                warn!("UART read error: {:?}", e);
            }
            Err(_) => {
                if let Err(e) = port.poll_timeouts(clock.now_ms()) {
                    warn!("Host message discarded: {}", e);
                }
            }
        }
    }
}
