//! Monotonic time source

/// Millisecond clock
///
/// Implementations return a free-running counter that wraps at `u32::MAX`.
/// Consumers must compare timestamps with [`elapsed_ms`], never with `<`.
pub trait Clock {
    /// Current time in milliseconds
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `since`
    fn since_ms(&self, since: u32) -> u32 {
        elapsed_ms(since, self.now_ms())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Wrapping difference between two clock readings
pub const fn elapsed_ms(since: u32, now: u32) -> u32 {
    now.wrapping_sub(since)
}
