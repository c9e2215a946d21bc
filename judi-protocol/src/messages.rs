//! Prebuilt pieces of the messages the device sends
//!
//! Every outgoing object starts with the correlation echo so a reply to a
//! tagged request carries its `message_id`:
//!
//! ```text
//! response_ok:       {"message_id":5,"response":"ok"}
//! request_preamble:  {"message_id":5,"request":{ ...fields... }}
//! ```
//!
//! The preambles leave their objects open. Append fields after them and the
//! serializer closes everything at the end.

use judi_hal::Clock;

use crate::correlation::Correlation;
use crate::value::{Fragment, LiveField, Value};

/// Protocol version reported in device info
pub const PROTOCOL_VERSION: &str = "1.0.0";

fn preamble<'a>(correlation: &'a Correlation, kind: &'static str) -> [Value<'a>; 5] {
    [
        Value::Open,
        correlation.field(),
        Value::Key(kind),
        Value::Open,
        Value::End,
    ]
}

fn response<'a>(correlation: &'a Correlation, status: &'static str) -> [Value<'a>; 5] {
    [
        Value::Open,
        correlation.field(),
        Value::Key("response"),
        Value::Str(status),
        Value::End,
    ]
}

/// `{"message_id":..,"request":{` left open for request fields
pub fn request_preamble(correlation: &Correlation) -> [Value<'_>; 5] {
    preamble(correlation, "request")
}

/// `{"message_id":..,"update":{` left open for update fields
pub fn update_preamble(correlation: &Correlation) -> [Value<'_>; 5] {
    preamble(correlation, "update")
}

/// `{"message_id":..,"response":{` left open for response fields
pub fn response_preamble(correlation: &Correlation) -> [Value<'_>; 5] {
    preamble(correlation, "response")
}

/// `{"message_id":..,"response":"ok"}`
pub fn response_ok(correlation: &Correlation) -> [Value<'_>; 5] {
    response(correlation, "ok")
}

/// `{"message_id":..,"response":"error"}`
pub fn response_error(correlation: &Correlation) -> [Value<'_>; 5] {
    response(correlation, "error")
}

/// Identity of the device, written as a `device_info` object
#[derive(Debug, Clone, Copy)]
pub struct DeviceInfo<'a> {
    pub product_name: &'a str,
    pub serial_number: &'a str,
    pub firmware_version: &'a str,
}

impl LiveField for DeviceInfo<'_> {
    fn fetch(&self) -> Option<Fragment<'_>> {
        Fragment::from_slice(&[
            Value::Key("device_info"),
            Value::Open,
            Value::Key("product_name"),
            Value::Str(self.product_name),
            Value::Key("serial_number"),
            Value::Str(self.serial_number),
            Value::Key("firmware_version"),
            Value::Str(self.firmware_version),
            Value::Key("protocol_version"),
            Value::Str(PROTOCOL_VERSION),
            Value::Close,
            Value::End,
        ])
        .ok()
    }
}

/// Current clock reading, written as `"time":<ms>` every time
#[derive(Debug)]
pub struct Timestamp<C: Clock> {
    clock: C,
}

impl<C: Clock> Timestamp<C> {
    pub const fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> LiveField for Timestamp<C> {
    fn fetch(&self) -> Option<Fragment<'_>> {
        Fragment::from_slice(&[
            Value::Key("time"),
            Value::U32(self.clock.now_ms()),
            Value::End,
        ])
        .ok()
    }
}
