//! Debounced monitoring of the appliance power-presence signal.
//!
//! The presence input goes high while the appliance draws power from the
//! controller's sense line and low once it has finished. Raw samples bounce,
//! so the monitor only reports a new state after `threshold` consecutive
//! samples disagree with the state it currently reports.

use core::time::Duration;

use embedded_hal::digital::InputPin;
use embedded_hal_async::delay::DelayNs;

use crate::fault::{FaultSource, HardwareFault};
use crate::timing::pause;

/// Reported appliance presence.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PresenceState {
    Present,
    Absent,
}

impl PresenceState {
    /// Maps a raw pin level onto a presence state (high means present).
    #[must_use]
    pub const fn from_level(high: bool) -> Self {
        if high {
            PresenceState::Present
        } else {
            PresenceState::Absent
        }
    }

    #[must_use]
    pub const fn is_present(self) -> bool {
        matches!(self, PresenceState::Present)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            PresenceState::Present => "present",
            PresenceState::Absent => "absent",
        }
    }
}

/// Sampling cadence and confirmation threshold.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DebounceConfig {
    pub threshold: u8,
    pub interval: Duration,
}

impl DebounceConfig {
    /// Five samples half a second apart: 2.5 s of continuous absence.
    pub const REFERENCE: Self = Self {
        threshold: 5,
        interval: Duration::from_millis(500),
    };

    /// Threshold clamped so at least one sample is needed to flip.
    #[must_use]
    pub const fn effective_threshold(&self) -> u8 {
        if self.threshold == 0 {
            1
        } else {
            self.threshold
        }
    }
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Consecutive-sample debounce rule.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Debouncer {
    state: PresenceState,
    pending: u8,
    threshold: u8,
}

impl Debouncer {
    #[must_use]
    pub const fn new(initial: PresenceState, config: DebounceConfig) -> Self {
        Self {
            state: initial,
            pending: 0,
            threshold: config.effective_threshold(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> PresenceState {
        self.state
    }

    /// Disagreeing samples seen since the last agreeing one.
    #[must_use]
    pub const fn pending(&self) -> u8 {
        self.pending
    }

    pub fn reset(&mut self, state: PresenceState) {
        self.state = state;
        self.pending = 0;
    }

    /// Feeds one raw sample, returning the new state when it flips.
    pub fn update(&mut self, sample: PresenceState) -> Option<PresenceState> {
        if sample == self.state {
            self.pending = 0;
            return None;
        }

        self.pending = self.pending.saturating_add(1);
        if self.pending < self.threshold {
            return None;
        }

        self.reset(sample);
        Some(sample)
    }
}

/// Presence input plus its debouncer.
#[derive(Debug)]
pub struct PresenceMonitor<P> {
    pin: P,
    debouncer: Debouncer,
    interval: Duration,
}

impl<P: InputPin> PresenceMonitor<P> {
    #[must_use]
    pub fn new(pin: P, config: DebounceConfig, initial: PresenceState) -> Self {
        Self {
            pin,
            debouncer: Debouncer::new(initial, config),
            interval: config.interval,
        }
    }

    /// Reads the raw pin level without touching the debouncer.
    ///
    /// # Errors
    ///
    /// A failed read is a fixed wiring or configuration problem and is reported
    /// as a [`HardwareFault`].
    pub fn sample(&mut self) -> Result<bool, HardwareFault> {
        self.pin
            .is_high()
            .map_err(|_| HardwareFault::new(FaultSource::PresenceInput))
    }

    /// Raw sample mapped onto a presence state.
    ///
    /// # Errors
    ///
    /// See [`PresenceMonitor::sample`].
    pub fn read_state(&mut self) -> Result<PresenceState, HardwareFault> {
        self.sample().map(PresenceState::from_level)
    }

    /// Takes one sample, feeds the debouncer and waits out one interval.
    ///
    /// Returns the debounced state after the sample.
    ///
    /// # Errors
    ///
    /// See [`PresenceMonitor::sample`].
    pub async fn poll<D: DelayNs>(&mut self, delay: &mut D) -> Result<PresenceState, HardwareFault> {
        let sample = self.read_state()?;
        self.debouncer.update(sample);
        pause(delay, self.interval).await;
        Ok(self.debouncer.state())
    }

    #[must_use]
    pub fn state(&self) -> PresenceState {
        self.debouncer.state()
    }

    #[must_use]
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn reset(&mut self, state: PresenceState) {
        self.debouncer.reset(state);
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(levels: &[u8]) -> impl Iterator<Item = PresenceState> + '_ {
        levels
            .iter()
            .map(|level| PresenceState::from_level(*level != 0))
    }

    #[test]
    fn alternating_samples_never_flip() {
        let mut debouncer = Debouncer::new(PresenceState::Present, DebounceConfig::REFERENCE);

        for sample in samples(&[0, 1, 0, 1, 0]) {
            assert_eq!(debouncer.update(sample), None);
            assert_eq!(debouncer.state(), PresenceState::Present);
        }
        assert_eq!(debouncer.pending(), 1);
    }

    #[test]
    fn fifth_consecutive_absent_sample_flips() {
        let mut debouncer = Debouncer::new(PresenceState::Present, DebounceConfig::REFERENCE);

        for _ in 0..4 {
            assert_eq!(debouncer.update(PresenceState::Absent), None);
        }
        assert_eq!(
            debouncer.update(PresenceState::Absent),
            Some(PresenceState::Absent)
        );
        assert_eq!(debouncer.state(), PresenceState::Absent);
        assert_eq!(debouncer.pending(), 0);
    }

    #[test]
    fn agreeing_sample_restarts_the_run() {
        let mut debouncer = Debouncer::new(PresenceState::Present, DebounceConfig::REFERENCE);

        for sample in samples(&[0, 0, 0, 0, 1, 0, 0, 0, 0]) {
            assert_eq!(debouncer.update(sample), None);
        }
        assert_eq!(
            debouncer.update(PresenceState::Absent),
            Some(PresenceState::Absent)
        );
    }

    #[test]
    fn zero_threshold_behaves_like_one() {
        let config = DebounceConfig {
            threshold: 0,
            interval: Duration::from_millis(10),
        };
        let mut debouncer = Debouncer::new(PresenceState::Absent, config);

        assert_eq!(
            debouncer.update(PresenceState::Present),
            Some(PresenceState::Present)
        );
    }
}
