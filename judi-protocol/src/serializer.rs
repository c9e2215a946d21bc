//! Tree-walking JSON serializer
//!
//! Walks a [`Value`] sequence and writes JSON text to a [`Sink`] one token at
//! a time. Nothing is buffered beyond a single number.
//!
//! Two counters drive the structure:
//!
//! - `brace_depth` counts every `{` written minus every `}`. It is shared by
//!   all nesting levels, so the `}` that matches the very first `{` ends the
//!   whole walk, however deep in spliced lists it was found.
//! - `recursion_depth` counts the lists currently being walked. Reaching the
//!   end of a spliced list just returns to its parent; reaching the end of
//!   the outermost list closes every object still open.
//!
//! Serialization never fails. Output that the sink cannot take is the sink's
//! business.

use core::fmt::Write;

use heapless::String;
use judi_hal::UartTx;

use crate::value::Value;

/// Deepest chain of spliced lists accepted in debug builds
pub const MAX_SPLICE_DEPTH: u32 = 32;

/// Scratch space for one formatted number
const NUMBER_CAPACITY: usize = 32;

/// Floats at or beyond this magnitude are written in exponent form
const FIXED_POINT_LIMIT: f64 = 1e15;

/// Destination for serialized text
pub trait Sink {
    /// Write one fragment of output
    fn emit(&mut self, text: &str);
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn emit(&mut self, text: &str) {
        (**self).emit(text);
    }
}

/// Collects output in memory
///
/// Text beyond the capacity is dropped.
impl<const N: usize> Sink for String<N> {
    fn emit(&mut self, text: &str) {
        if self.push_str(text).is_err() {
            trace!("sink full, dropped {} bytes", text.len());
        }
    }
}

/// Writes output straight to a UART
#[derive(Debug)]
pub struct UartSink<T: UartTx> {
    uart: T,
    write_errors: u32,
}

impl<T: UartTx> UartSink<T> {
    /// Wrap a transmitter
    pub fn new(uart: T) -> Self {
        Self {
            uart,
            write_errors: 0,
        }
    }

    /// Number of fragments the UART refused
    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }

    /// Flush the underlying transmitter
    pub fn flush(&mut self) -> Result<(), T::Error> {
        self.uart.flush()
    }

    /// Access the wrapped transmitter
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.uart
    }
}

impl<T: UartTx> Sink for UartSink<T> {
    fn emit(&mut self, text: &str) {
        if self.uart.write_blocking(text.as_bytes()).is_err() {
            self.write_errors = self.write_errors.saturating_add(1);
        }
    }
}

/// Serialize `sequence` into `sink`
///
/// The sequence should end with [`Value::End`]. A slice that runs out first
/// is treated as if it ended there.
pub fn serialize<S: Sink + ?Sized>(sink: &mut S, sequence: &[Value<'_>]) {
    Serializer::new(sink).run(sequence);
}

/// Whether the walk goes on after a list returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Done,
}

/// Serializer state for one output object
pub struct Serializer<'s, S: Sink + ?Sized> {
    sink: &'s mut S,
    brace_depth: i32,
    recursion_depth: u32,
    /// The last token written completed a value, so the next key needs a `,`
    separator_due: bool,
}

impl<'s, S: Sink + ?Sized> Serializer<'s, S> {
    /// Create a serializer writing to `sink`
    pub fn new(sink: &'s mut S) -> Self {
        Self {
            sink,
            brace_depth: 0,
            recursion_depth: 0,
            separator_due: false,
        }
    }

    /// Write one complete object
    pub fn run(&mut self, sequence: &[Value<'_>]) {
        self.brace_depth = 0;
        self.recursion_depth = 0;
        self.separator_due = false;
        self.evaluate(sequence);
    }

    fn evaluate(&mut self, list: &[Value<'_>]) -> Flow {
        self.recursion_depth += 1;
        debug_assert!(
            self.recursion_depth <= MAX_SPLICE_DEPTH,
            "value lists nested too deep, check for a list that splices itself"
        );

        for value in list {
            match *value {
                Value::Open => {
                    self.sink.emit("{");
                    self.brace_depth += 1;
                    self.separator_due = false;
                }
                Value::Close => {
                    if self.brace_depth <= 0 {
                        trace!("close without open object, dropped");
                        continue;
                    }
                    self.sink.emit("}");
                    self.brace_depth -= 1;
                    if self.brace_depth == 0 {
                        return Flow::Done;
                    }
                    self.separator_due = true;
                }
                Value::End => return self.end_of_list(),
                Value::List(inner) => {
                    if self.evaluate(inner) == Flow::Done {
                        return Flow::Done;
                    }
                }
                Value::Live(field) => {
                    if let Some(fragment) = field.fetch() {
                        if self.evaluate(&fragment) == Flow::Done {
                            return Flow::Done;
                        }
                    }
                }
                Value::Key(text) => {
                    if self.separator_due {
                        self.sink.emit(",");
                    }
                    self.quoted(text);
                    self.sink.emit(":");
                    self.separator_due = false;
                }
                Value::Str(text) => {
                    self.quoted(text);
                    self.separator_due = true;
                }
                Value::Float(v) => {
                    self.float(v);
                    self.separator_due = true;
                }
                Value::U16(v) => {
                    self.number(v);
                    self.separator_due = true;
                }
                Value::U32(v) => {
                    self.number(v);
                    self.separator_due = true;
                }
                Value::Null => {
                    self.sink.emit("null");
                    self.separator_due = true;
                }
            }
        }

        self.end_of_list()
    }

    /// Leave a list; the outermost one closes every open object
    fn end_of_list(&mut self) -> Flow {
        self.recursion_depth = self.recursion_depth.saturating_sub(1);
        if self.recursion_depth > 0 {
            return Flow::Continue;
        }

        while self.brace_depth > 0 {
            self.sink.emit("}");
            self.brace_depth -= 1;
        }
        Flow::Done
    }

    fn quoted(&mut self, text: &str) {
        self.sink.emit("\"");
        self.sink.emit(text);
        self.sink.emit("\"");
    }

    fn number(&mut self, v: impl core::fmt::Display) {
        let mut buf: String<NUMBER_CAPACITY> = String::new();
        match write!(buf, "{}", v) {
            Ok(()) => self.sink.emit(&buf),
            Err(_) => self.sink.emit("null"),
        }
    }

    fn float(&mut self, v: f64) {
        if !v.is_finite() {
            self.sink.emit("null");
            return;
        }

        let mut buf: String<NUMBER_CAPACITY> = String::new();
        let written = if v.abs() < FIXED_POINT_LIMIT {
            write!(buf, "{:.6}", v)
        } else {
            write!(buf, "{:e}", v)
        };
        match written {
            Ok(()) => self.sink.emit(&buf),
            Err(_) => self.sink.emit("null"),
        }
    }
}
