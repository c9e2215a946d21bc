//! Host bytes in, reply text out

use core::cell::Cell;

use heapless::{String, Vec};
use judi_hal::Clock;
use judi_protocol::messages::{response_error, update_preamble};
use judi_protocol::{
    hash_key, serialize, Correlation, DeviceInfo, FrameError, Message, MessageBuilder,
    MessagePort, ReceiverConfig, Responder, Timestamp, Value, ROOT_OBJECT,
};

const INFO: DeviceInfo<'static> = DeviceInfo {
    product_name: "judi",
    serial_number: "SN-1",
    firmware_version: "2.0.0",
};

struct TestClock(Cell<u32>);

impl Clock for TestClock {
    fn now_ms(&self) -> u32 {
        self.0.get()
    }
}

/// Answers `device_info` and `time`, rejects everything else
struct Device<'a> {
    correlation: &'a Correlation,
    clock: &'a TestClock,
    out: String<1024>,
    slots: Vec<u8, 8>,
    seen: Vec<String<64>, 8>,
}

impl<'a> Device<'a> {
    fn new(correlation: &'a Correlation, clock: &'a TestClock) -> Self {
        Self {
            correlation,
            clock,
            out: String::new(),
            slots: Vec::new(),
            seen: Vec::new(),
        }
    }
}

impl Responder for Device<'_> {
    fn respond(&mut self, message: &Message<'_>) {
        let _ = self.slots.push(message.frame().slot());
        let mut text = String::new();
        let _ = text.push_str(message.text());
        let _ = self.seen.push(text);

        let Some(request) = message.get(ROOT_OBJECT, hash_key("request")) else {
            return;
        };
        let name = if message.is_object(request) {
            message.first_key(request)
        } else {
            Some(request)
        };
        let request = name.and_then(|index| message.token_text(index)).unwrap_or("");

        let time = Timestamp::new(self.clock);
        let mut builder: MessageBuilder<'_> = MessageBuilder::new();
        match request {
            "device_info" => {
                builder.append(Value::Open);
                builder.append(self.correlation.field());
                builder.append(Value::Live(&INFO));
            }
            "time" => {
                builder.append(Value::Open);
                builder.append(self.correlation.field());
                builder.append(Value::Live(&time));
            }
            _ => builder.append_sequence(&response_error(self.correlation)),
        }
        builder.finish_and_serialize(&mut self.out);
        let _ = self.out.push('\n');
    }
}

fn send(
    port: &mut MessagePort,
    text: &str,
    now_ms: u32,
    correlation: &Correlation,
    device: &mut Device<'_>,
) -> Vec<FrameError, 8> {
    let mut errors = Vec::new();
    for &byte in text.as_bytes() {
        if let Err(e) = port.ingest(byte, now_ms, correlation, device) {
            let _ = errors.push(e);
        }
    }
    errors
}

#[test]
fn test_message_id_echoed_in_exactly_one_reply() {
    let correlation = Correlation::new();
    let clock = TestClock(Cell::new(0));
    let mut device = Device::new(&correlation, &clock);
    let mut port: MessagePort = MessagePort::new(ReceiverConfig::default());

    send(
        &mut port,
        r#"{"message_id":5,"request":"device_info"}"#,
        0,
        &correlation,
        &mut device,
    );

    assert_eq!(
        device.out.as_str(),
        concat!(
            r#"{"message_id":5,"device_info":{"product_name":"judi","serial_number":"SN-1","#,
            r#""firmware_version":"2.0.0","protocol_version":"1.0.0"}}"#,
            "\n"
        )
    );

    // An unsolicited update right after must not repeat the id
    let mut update: String<64> = String::new();
    let mut builder: MessageBuilder<'_> = MessageBuilder::new();
    builder.append_sequence(&update_preamble(&correlation));
    builder.append(Value::Key("state"));
    builder.append(Value::Str("idle"));
    builder.finish_and_serialize(&mut update);
    assert_eq!(update.as_str(), r#"{"update":{"state":"idle"}}"#);
}

#[test]
fn test_request_without_id_gets_no_echo() {
    let correlation = Correlation::new();
    let clock = TestClock(Cell::new(4_321));
    let mut device = Device::new(&correlation, &clock);
    let mut port: MessagePort = MessagePort::default();

    send(&mut port, r#"{"message_id":1,"request":"nope"}"#, 0, &correlation, &mut device);
    send(&mut port, r#"{"request":"time"}"#, 10, &correlation, &mut device);

    assert_eq!(
        device.out.as_str(),
        "{\"message_id\":1,\"response\":\"error\"}\n{\"time\":4321}\n"
    );
}

#[test]
fn test_request_object_named_by_first_key() {
    let correlation = Correlation::new();
    let clock = TestClock(Cell::new(77));
    let mut device = Device::new(&correlation, &clock);
    let mut port: MessagePort = MessagePort::default();

    send(
        &mut port,
        r#"{"message_id":5,"request":{"time":{}}}"#,
        0,
        &correlation,
        &mut device,
    );
    send(&mut port, r#"{"message_id":6,"request":{"foo":"bar"}}"#, 10, &correlation, &mut device);
    send(&mut port, r#"{"request":{}}"#, 20, &correlation, &mut device);

    assert_eq!(
        device.out.as_str(),
        concat!(
            "{\"message_id\":5,\"time\":77}\n",
            "{\"message_id\":6,\"response\":\"error\"}\n",
            "{\"response\":\"error\"}\n"
        )
    );
}

#[test]
fn test_back_to_back_objects_alternate_buffers() {
    let correlation = Correlation::new();
    let clock = TestClock(Cell::new(0));
    let mut device = Device::new(&correlation, &clock);
    let mut port: MessagePort = MessagePort::default();

    let errors = send(
        &mut port,
        r#"{"a":1}{"bb":{"c":2}}{"d":"}"}"#,
        0,
        &correlation,
        &mut device,
    );

    assert!(errors.is_empty());
    assert_eq!(device.slots.as_slice(), &[0, 1, 0]);
    assert_eq!(device.seen[0].as_str(), r#"{"a":1}"#);
    assert_eq!(device.seen[1].as_str(), r#"{"bb":{"c":2}}"#);
    // A brace inside a string closes the object early
    assert_eq!(device.seen[2].as_str(), r#"{"d":"}"#);
    assert!(device.out.is_empty());
}

#[test]
fn test_stalled_object_discarded_then_next_answered() {
    let correlation = Correlation::new();
    let clock = TestClock(Cell::new(900));
    let mut device = Device::new(&correlation, &clock);
    let mut port: MessagePort = MessagePort::new(ReceiverConfig::with_window(100));

    let errors = send(&mut port, r#"{"message_id":3,"req"#, 0, &correlation, &mut device);
    assert!(errors.is_empty());
    assert!(port.is_receiving());

    let errors = send(
        &mut port,
        r#"{"message_id":4,"request":"time"}"#,
        500,
        &correlation,
        &mut device,
    );

    assert_eq!(errors.as_slice(), &[FrameError::TimedOut]);
    assert_eq!(device.seen.len(), 1);
    assert_eq!(device.out.as_str(), "{\"message_id\":4,\"time\":900}\n");
}

#[test]
fn test_idle_poll_discards_partial_object() {
    let correlation = Correlation::new();
    let clock = TestClock(Cell::new(0));
    let mut device = Device::new(&correlation, &clock);
    let mut port: MessagePort = MessagePort::new(ReceiverConfig {
        max_message_duration_ms: 1_000,
        max_intercharacter_gap_ms: 50,
    });

    send(&mut port, r#"{"request":"#, 0, &correlation, &mut device);
    assert_eq!(port.poll_timeouts(30), Ok(()));
    assert_eq!(port.poll_timeouts(51), Err(FrameError::Stalled));
    assert!(!port.is_receiving());
    assert!(port.receiver().active().is_stalled());

    // The tail of the discarded object is noise outside any object
    send(&mut port, r#""time"}"#, 60, &correlation, &mut device);
    assert!(device.seen.is_empty());
}

#[test]
fn test_reply_serialized_into_shared_sink() {
    let correlation = Correlation::new();
    correlation.set_id(11);
    let mut out: String<64> = String::new();

    serialize(&mut out, &response_error(&correlation));
    serialize(&mut out, &response_error(&correlation));

    assert_eq!(
        out.as_str(),
        r#"{"message_id":11,"response":"error"}{"response":"error"}"#
    );
}
