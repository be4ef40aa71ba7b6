//! Cooperative delay helpers shared by every waiting component.
//!
//! All waiting in the sequencer goes through an `embedded-hal-async`
//! [`DelayNs`] implementation. [`ScheduleDelay`] wraps the board delay and keeps
//! a running total of the time the sequencer asked to wait, which doubles as the
//! timestamp attached to telemetry records.

use core::time::Duration;

use embedded_hal_async::delay::DelayNs;

/// Waits for `duration`, splitting it into chunks the delay provider accepts.
///
/// Zero-length pauses return without touching the delay provider.
pub async fn pause<D: DelayNs>(delay: &mut D, duration: Duration) {
    let mut remaining = duration.as_micros();
    while remaining > 0 {
        let chunk = u32::try_from(remaining).unwrap_or(u32::MAX);
        delay.delay_us(chunk).await;
        remaining -= u128::from(chunk);
    }
}

/// Delay provider that tallies how long the sequencer has been asked to wait.
#[derive(Debug)]
pub struct ScheduleDelay<D> {
    inner: D,
    elapsed: Duration,
}

impl<D> ScheduleDelay<D> {
    /// Wraps `inner`, starting the tally at zero.
    #[must_use]
    pub const fn new(inner: D) -> Self {
        Self {
            inner,
            elapsed: Duration::ZERO,
        }
    }

    /// Total scheduled waiting since construction.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the wrapped delay provider.
    #[must_use]
    pub fn into_inner(self) -> D {
        self.inner
    }

    fn account(&mut self, amount: Duration) {
        self.elapsed = self.elapsed.saturating_add(amount);
    }
}

impl<D: DelayNs> DelayNs for ScheduleDelay<D> {
    async fn delay_ns(&mut self, ns: u32) {
        self.account(Duration::from_nanos(u64::from(ns)));
        self.inner.delay_ns(ns).await;
    }

    async fn delay_us(&mut self, us: u32) {
        self.account(Duration::from_micros(u64::from(us)));
        self.inner.delay_us(us).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.account(Duration::from_millis(u64::from(ms)));
        self.inner.delay_ms(ms).await;
    }
}
