//! Deep-sleep entry and wake validation.
//!
//! Suspension is a halt followed by a cold restart: [`SleepController::enter_deep_sleep`]
//! never returns, and the program resumes from its entry point with a
//! [`BootReason`] telling it why. Wake sources glitch, so the first thing a
//! woken program does is [`SleepCoordinator::confirm_wake`] and go straight back
//! to sleep when the presence signal has already dropped again.

use core::{convert::Infallible, fmt, time::Duration};

use embedded_hal::digital::InputPin;
use embedded_hal_async::delay::DelayNs;

use crate::fault::{FaultSource, HardwareFault};
use crate::presence::PresenceMonitor;
use crate::timing::pause;

/// Edge or level that ends a deep sleep.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WakeTrigger {
    /// Wake when any pin in the mask reads high.
    AnyHigh,
}

/// One-shot wake condition handed to the sleep subsystem before suspending.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WakeArming {
    pub pin_mask: u64,
    pub trigger: WakeTrigger,
}

impl WakeArming {
    #[must_use]
    pub const fn any_high(pin_mask: u64) -> Self {
        Self {
            pin_mask,
            trigger: WakeTrigger::AnyHigh,
        }
    }
}

/// Platform low-power subsystem.
pub trait SleepController {
    type Error;

    /// Arms the wake condition consumed by the next [`SleepController::enter_deep_sleep`].
    ///
    /// # Errors
    ///
    /// Implementation-defined; typically a pin that cannot act as a wake source.
    fn arm_wake(&mut self, arming: WakeArming) -> Result<(), Self::Error>;

    /// Disconnects `pin` so it neither leaks current nor re-triggers wake logic.
    ///
    /// # Errors
    ///
    /// Implementation-defined; typically a pin without isolation support.
    fn isolate(&mut self, pin: u8) -> Result<(), Self::Error>;

    /// Suspends the device. Execution resumes at program entry.
    fn enter_deep_sleep(&mut self) -> !;
}

/// Why the program is starting.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootReason {
    ColdStart,
    WakeFromSleep,
}

impl fmt::Display for BootReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootReason::ColdStart => f.write_str("cold-start"),
            BootReason::WakeFromSleep => f.write_str("wake-from-sleep"),
        }
    }
}

/// Result of re-checking presence after a wake.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WakeVerdict {
    Genuine,
    Glitch,
}

/// Wake source wiring and the settle window used to reject glitches.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SleepConfig {
    pub wake_mask: u64,
    pub isolate_pins: &'static [u8],
    pub wake_settle: Duration,
}

impl SleepConfig {
    /// Presence sense on pin 5; pin 12 carries a strapping pull-up that would
    /// otherwise leak through the sense divider while asleep.
    pub const REFERENCE: Self = Self {
        wake_mask: 1 << 5,
        isolate_pins: &[12],
        wake_settle: Duration::from_millis(500),
    };
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}

#[derive(Debug)]
pub struct SleepCoordinator<Z> {
    controller: Z,
    config: SleepConfig,
}

impl<Z: SleepController> SleepCoordinator<Z> {
    #[must_use]
    pub const fn new(controller: Z, config: SleepConfig) -> Self {
        Self { controller, config }
    }

    #[must_use]
    pub const fn config(&self) -> &SleepConfig {
        &self.config
    }

    /// Arms wake-on-presence, isolates leaky pins and suspends.
    ///
    /// # Errors
    ///
    /// Only returns when arming or isolation fails; a successful call resumes
    /// at program entry instead.
    pub fn sleep_until_presence_detected(&mut self) -> Result<Infallible, HardwareFault> {
        let fault = |_| HardwareFault::new(FaultSource::SleepController);

        self.controller
            .arm_wake(WakeArming::any_high(self.config.wake_mask))
            .map_err(fault)?;
        for &pin in self.config.isolate_pins {
            self.controller.isolate(pin).map_err(fault)?;
        }
        self.controller.enter_deep_sleep()
    }

    /// Waits out the settle window and re-samples presence once.
    ///
    /// # Errors
    ///
    /// Propagates a failed presence read.
    pub async fn confirm_wake<P, D>(
        &mut self,
        monitor: &mut PresenceMonitor<P>,
        delay: &mut D,
    ) -> Result<WakeVerdict, HardwareFault>
    where
        P: InputPin,
        D: DelayNs,
    {
        pause(delay, self.config.wake_settle).await;
        if monitor.sample()? {
            Ok(WakeVerdict::Genuine)
        } else {
            Ok(WakeVerdict::Glitch)
        }
    }
}
