//! Host serial link
//!
//! The host link is a plain byte stream. Output goes out in small fragments
//! as the serializer produces them; input is polled one byte at a time.

/// Byte output towards the host
pub trait UartTx {
    /// Transmit failure reported by the driver
    type Error;

    /// Queue `data` for transmission, waiting for room if needed
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Wait until everything queued has left the peripheral
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Byte input from the host
///
/// Polled, never pushed: the caller asks for the next byte and gets `None`
/// when the receive FIFO is empty.
pub trait UartRx {
    /// Receive failure reported by the driver (framing, overrun, ...)
    type Error;

    /// Take the next received byte, if one is available
    fn try_read_byte(&mut self) -> Result<Option<u8>, Self::Error>;
}

/// Line settings for the host link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    pub baudrate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for UartConfig {
    /// 115200 8N1
    fn default() -> Self {
        Self::with_baudrate(115_200)
    }
}

impl UartConfig {
    /// 8N1 at the given rate
    pub const fn with_baudrate(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }

    /// Time to transmit one character, in microseconds
    ///
    /// Counts the start bit, data bits, parity bit and stop bits.
    pub const fn char_time_us(&self) -> u32 {
        let bits = 1 + self.data_bits.count() + self.parity.count() + self.stop_bits.count();
        (bits * 1_000_000).div_ceil(self.baudrate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
}

impl DataBits {
    const fn count(self) -> u32 {
        match self {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

impl Parity {
    const fn count(self) -> u32 {
        match self {
            Parity::None => 0,
            Parity::Even | Parity::Odd => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    const fn count(self) -> u32 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}
