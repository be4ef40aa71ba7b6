//! Top-level work cycle: power on, navigate, wait for idle, shut down, sleep.
//!
//! ```text
//! Boot -> PowerOn -> Navigate -> AwaitIdle -> ShutdownConfirm -> Sleeping
//!           ^                                                      |
//!           +---------------- presence still high -----------------+
//! ```
//!
//! Leaving `Sleeping` through deep sleep restarts the program, so the loop
//! above only closes in-process when presence is already back after the
//! shutdown settle. There is no terminal state and no failure transition: any
//! encoder or hardware error escapes [`Sequencer::run`] for the caller to
//! escalate.

use core::{convert::Infallible, fmt, time::Duration};

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;

use crate::fault::{FaultSource, HardwareFault};
use crate::ir::{EncodeError, FrameEncoder};
use crate::presence::{DebounceConfig, PresenceMonitor, PresenceState};
use crate::remote::{CycleScript, PROJECTOR_CYCLE, PROJECTOR_REMOTE, RemoteCatalog, ScriptStep};
use crate::sleep::{BootReason, SleepConfig, SleepController, SleepCoordinator, WakeVerdict};
use crate::telemetry::{TelemetryEventKind, TelemetrySink};
use crate::timing::{ScheduleDelay, pause};
use crate::transmitter::{CommandTransmitter, IrTransmitter, TransmitError};

/// Delay between program entry and the first command.
pub const BOOT_DELAY: Duration = Duration::from_millis(2_000);
/// Wait after the shutdown pair before deciding whether to sleep.
pub const SHUTDOWN_SETTLE: Duration = Duration::from_millis(2_500);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SequencerPhase {
    Boot,
    PowerOn,
    Navigate,
    AwaitIdle,
    ShutdownConfirm,
    Sleeping,
}

impl fmt::Display for SequencerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SequencerPhase::Boot => "boot",
            SequencerPhase::PowerOn => "power-on",
            SequencerPhase::Navigate => "navigate",
            SequencerPhase::AwaitIdle => "await-idle",
            SequencerPhase::ShutdownConfirm => "shutdown-confirm",
            SequencerPhase::Sleeping => "sleeping",
        };
        f.write_str(label)
    }
}

/// Result of one idle-wait observation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CycleOutcome {
    ApplianceActive,
    ApplianceIdleConfirmed,
}

/// What to do once the shutdown settle has elapsed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SleepDecision {
    SkipSleep,
    Suspend,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SequencerConfig {
    pub catalog: RemoteCatalog,
    pub script: CycleScript,
    pub boot_delay: Duration,
    pub shutdown_settle: Duration,
    pub debounce: DebounceConfig,
    pub sleep: SleepConfig,
}

impl SequencerConfig {
    /// Projector codes, script and timings.
    pub const REFERENCE: Self = Self {
        catalog: PROJECTOR_REMOTE,
        script: PROJECTOR_CYCLE,
        boot_delay: BOOT_DELAY,
        shutdown_settle: SHUTDOWN_SETTLE,
        debounce: DebounceConfig::REFERENCE,
        sleep: SleepConfig::REFERENCE,
    };
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// Failure that aborts the sequencer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SequencerError {
    Encode(EncodeError),
    Hardware(HardwareFault),
}

impl fmt::Display for SequencerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequencerError::Encode(error) => write!(f, "encode error: {error}"),
            SequencerError::Hardware(fault) => fault.fmt(f),
        }
    }
}

impl From<HardwareFault> for SequencerError {
    fn from(fault: HardwareFault) -> Self {
        SequencerError::Hardware(fault)
    }
}

impl From<TransmitError> for SequencerError {
    fn from(error: TransmitError) -> Self {
        match error {
            TransmitError::Encode(error) => SequencerError::Encode(error),
            TransmitError::Hardware(fault) => SequencerError::Hardware(fault),
        }
    }
}

/// Board resources the sequencer takes ownership of.
pub struct SequencerHardware<E, T, P, L, Z, D> {
    pub encoder: E,
    pub ir: T,
    pub presence: P,
    pub indicator: L,
    pub sleep: Z,
    pub delay: D,
}

pub struct Sequencer<E, T, P, L, Z, D> {
    config: SequencerConfig,
    transmitter: CommandTransmitter<E, T>,
    monitor: PresenceMonitor<P>,
    indicator: L,
    sleep: SleepCoordinator<Z>,
    delay: ScheduleDelay<D>,
    phase: SequencerPhase,
}

impl<E, T, P, L, Z, D> Sequencer<E, T, P, L, Z, D>
where
    E: FrameEncoder,
    T: IrTransmitter,
    P: InputPin,
    L: OutputPin,
    Z: SleepController,
    D: DelayNs,
{
    #[must_use]
    pub fn new(config: SequencerConfig, hardware: SequencerHardware<E, T, P, L, Z, D>) -> Self {
        let SequencerHardware {
            encoder,
            ir,
            presence,
            indicator,
            sleep,
            delay,
        } = hardware;

        Self {
            config,
            transmitter: CommandTransmitter::new(encoder, ir),
            monitor: PresenceMonitor::new(presence, config.debounce, PresenceState::Present),
            indicator,
            sleep: SleepCoordinator::new(sleep, config.sleep),
            delay: ScheduleDelay::new(delay),
            phase: SequencerPhase::Boot,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> SequencerPhase {
        self.phase
    }

    /// Scheduled time since construction.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.delay.elapsed()
    }

    /// Drives the work cycle forever.
    ///
    /// A [`BootReason::WakeFromSleep`] start first re-validates the wake and
    /// suspends again on a glitch. Every accepted start then runs the boot
    /// delay before the first cycle.
    ///
    /// # Errors
    ///
    /// Only returns on an encoder or hardware failure.
    pub async fn run<S: TelemetrySink>(
        &mut self,
        boot: BootReason,
        telemetry: &mut S,
    ) -> Result<Infallible, SequencerError> {
        if boot == BootReason::WakeFromSleep {
            let verdict = self
                .sleep
                .confirm_wake(&mut self.monitor, &mut self.delay)
                .await?;
            match verdict {
                WakeVerdict::Genuine => self.emit(telemetry, TelemetryEventKind::WakeConfirmed),
                WakeVerdict::Glitch => {
                    self.emit(telemetry, TelemetryEventKind::WakeRejected);
                    return self.suspend(telemetry);
                }
            }
        }

        self.set_indicator(false)?;
        self.enter(SequencerPhase::Boot, telemetry);
        pause(&mut self.delay, self.config.boot_delay).await;

        loop {
            if self.run_cycle(telemetry).await? == SleepDecision::Suspend {
                return self.suspend(telemetry);
            }
        }
    }

    /// Runs one cycle from `PowerOn` through the post-shutdown presence check.
    ///
    /// # Errors
    ///
    /// Propagates encoder and hardware failures.
    pub async fn run_cycle<S: TelemetrySink>(
        &mut self,
        telemetry: &mut S,
    ) -> Result<SleepDecision, SequencerError> {
        self.enter(SequencerPhase::PowerOn, telemetry);
        self.press(self.config.script.power_on, telemetry).await?;

        self.enter(SequencerPhase::Navigate, telemetry);
        for &step in self.config.script.navigation {
            self.press(step, telemetry).await?;
        }

        self.enter(SequencerPhase::AwaitIdle, telemetry);
        self.monitor.reset(PresenceState::Present);
        while self.observe_idle(telemetry).await? == CycleOutcome::ApplianceActive {}

        self.shutdown(telemetry).await?;

        self.enter(SequencerPhase::Sleeping, telemetry);
        if self.monitor.read_state()?.is_present() {
            self.emit(telemetry, TelemetryEventKind::SleepSkipped);
            Ok(SleepDecision::SkipSleep)
        } else {
            Ok(SleepDecision::Suspend)
        }
    }

    /// Takes one debounced presence poll.
    ///
    /// # Errors
    ///
    /// Propagates a failed presence read.
    pub async fn observe_idle<S: TelemetrySink>(
        &mut self,
        telemetry: &mut S,
    ) -> Result<CycleOutcome, SequencerError> {
        let before = self.monitor.state();
        let after = self.monitor.poll(&mut self.delay).await?;
        if after != before {
            self.emit(telemetry, TelemetryEventKind::PresenceChanged(after));
        }

        if after == PresenceState::Absent {
            self.emit(telemetry, TelemetryEventKind::IdleConfirmed);
            Ok(CycleOutcome::ApplianceIdleConfirmed)
        } else {
            Ok(CycleOutcome::ApplianceActive)
        }
    }

    async fn shutdown<S: TelemetrySink>(&mut self, telemetry: &mut S) -> Result<(), SequencerError> {
        self.enter(SequencerPhase::ShutdownConfirm, telemetry);
        self.set_indicator(true)?;
        for &step in self.config.script.shutdown {
            self.press(step, telemetry).await?;
        }
        pause(&mut self.delay, self.config.shutdown_settle).await;
        self.set_indicator(false)?;
        Ok(())
    }

    async fn press<S: TelemetrySink>(
        &mut self,
        step: ScriptStep,
        telemetry: &mut S,
    ) -> Result<(), SequencerError> {
        let request = self.config.catalog.request(step);
        self.emit(
            telemetry,
            TelemetryEventKind::CommandIssued {
                key: step.key,
                command: request.command,
            },
        );
        self.transmitter.send(request, &mut self.delay).await?;
        Ok(())
    }

    fn suspend<S: TelemetrySink>(&mut self, telemetry: &mut S) -> Result<Infallible, SequencerError> {
        self.phase = SequencerPhase::Sleeping;
        self.emit(telemetry, TelemetryEventKind::SleepEntered);
        Ok(self.sleep.sleep_until_presence_detected()?)
    }

    fn enter<S: TelemetrySink>(&mut self, phase: SequencerPhase, telemetry: &mut S) {
        self.phase = phase;
        self.emit(telemetry, TelemetryEventKind::PhaseEntered(phase));
    }

    fn emit<S: TelemetrySink>(&self, telemetry: &mut S, event: TelemetryEventKind) {
        telemetry.record(event, self.delay.elapsed());
    }

    fn set_indicator(&mut self, lit: bool) -> Result<(), HardwareFault> {
        let result = if lit {
            self.indicator.set_high()
        } else {
            self.indicator.set_low()
        };
        result.map_err(|_| HardwareFault::new(FaultSource::StatusIndicator))
    }
}
