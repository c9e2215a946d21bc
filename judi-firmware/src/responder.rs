//! Host request handling
//!
//! Requests name what the host wants, either as a string or as the first
//! key of a request object:
//! ```text
//! {"message_id":3,"request":"device_info"}
//!   -> {"message_id":3,"device_info":{"product_name":"judi",...}}
//! {"request":{"time":{}}}
//!   -> {"time":123456}
//! {"request":"reboot"}
//!   -> {"response":"error"}
//! ```
//! Objects without a `request` field are ignored.

use defmt::*;
use embassy_rp::uart::{self, BufferedUartTx};
use embassy_time::Instant;

use judi_hal::{Clock, UartTx};
use judi_protocol::messages::response_error;
use judi_protocol::{
    hash_key, Correlation, DeviceInfo, Message, MessageBuilder, Responder, Timestamp, UartSink,
    Value, ROOT_OBJECT,
};

const REQUEST_HASH: u32 = hash_key("request");
const DEVICE_INFO_HASH: u32 = hash_key("device_info");
const TIME_HASH: u32 = hash_key("time");
const BUILD_INFO_HASH: u32 = hash_key("build_info");

const SERIAL_NUMBER: &str = match option_env!("JUDI_SERIAL_NUMBER") {
    Some(serial) => serial,
    None => "unprogrammed",
};

const DEVICE_INFO: DeviceInfo<'static> = DeviceInfo {
    product_name: "judi",
    serial_number: SERIAL_NUMBER,
    firmware_version: env!("CARGO_PKG_VERSION"),
};

const TIME: Timestamp<EmbassyClock> = Timestamp::new(EmbassyClock);

const BUILD_INFO: &[Value<'static>] = &[
    Value::Key("build_info"),
    Value::Open,
    Value::Key("package"),
    Value::Str(env!("CARGO_PKG_NAME")),
    Value::Key("version"),
    Value::Str(env!("CARGO_PKG_VERSION")),
    Value::Key("debug"),
    Value::U16(cfg!(debug_assertions) as u16),
    Value::Close,
    Value::End,
];

/// Milliseconds since boot from the embassy time driver
#[derive(Debug, Clone, Copy)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        Instant::now().as_millis() as u32
    }
}

/// Host UART transmitter, written without yielding
///
/// Replies are produced inside the receive path, which is synchronous.
pub struct HostTx(BufferedUartTx);

impl UartTx for HostTx {
    type Error = uart::Error;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        embedded_io::Write::write_all(&mut self.0, data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        embedded_io::Write::flush(&mut self.0)
    }
}

/// Answers host requests on the host UART
pub struct HostResponder<'a> {
    correlation: &'a Correlation,
    sink: UartSink<HostTx>,
}

impl<'a> HostResponder<'a> {
    pub fn new(correlation: &'a Correlation, tx: BufferedUartTx) -> Self {
        Self {
            correlation,
            sink: UartSink::new(HostTx(tx)),
        }
    }
}

impl Responder for HostResponder<'_> {
    fn respond(&mut self, message: &Message<'_>) {
        let Some(request) = message.get(ROOT_OBJECT, REQUEST_HASH) else {
            trace!("No request in message, ignored");
            return;
        };
        let name = if message.is_object(request) {
            message.first_key(request)
        } else {
            Some(request)
        };
        let request = name.and_then(|index| message.token_text(index)).unwrap_or("");

        let mut builder: MessageBuilder<'_> = MessageBuilder::new();
        builder.append(Value::Open);
        builder.append(self.correlation.field());

        match hash_key(request) {
            DEVICE_INFO_HASH => builder.append(Value::Live(&DEVICE_INFO)),
            TIME_HASH => builder.append(Value::Live(&TIME)),
            BUILD_INFO_HASH => builder.append(Value::List(BUILD_INFO)),
            _ => {
                warn!("Unknown request: {}", request);
                builder.reset();
                builder.append_sequence(&response_error(self.correlation));
            }
        }

        let errors_before = self.sink.write_errors();
        builder.finish_and_serialize(&mut self.sink);
        if self.sink.flush().is_err() || self.sink.write_errors() != errors_before {
            warn!("Failed to send response to {}", request);
        } else {
            debug!("Answered {}", request);
        }
    }
}
