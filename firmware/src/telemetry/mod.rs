//! Telemetry sink that mirrors sequencer records to the debug log.
//!
//! Records are kept in the shared `remote-core` ring so they can be inspected
//! with a debugger after a fault, and every record is logged as it arrives:
//! defmt over RTT on the board, stdout on host builds.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::time::Duration;

use remote_core::sequencer::SequencerError;
use remote_core::sleep::BootReason;
use remote_core::telemetry::{
    EventId, TelemetryEventKind, TelemetryRecord, TelemetryRecorder, TelemetrySink,
};

/// Ring capacity; a full cycle emits roughly twenty records.
pub const HISTORY_CAPACITY: usize = 48;

pub struct LoggingTelemetry {
    history: TelemetryRecorder<HISTORY_CAPACITY>,
}

impl LoggingTelemetry {
    pub const fn new() -> Self {
        Self {
            history: TelemetryRecorder::new(),
        }
    }

    pub fn history(&self) -> &TelemetryRecorder<HISTORY_CAPACITY> {
        &self.history
    }
}

impl Default for LoggingTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for LoggingTelemetry {
    fn record(&mut self, event: TelemetryEventKind, at: Duration) -> EventId {
        let id = self.history.record(event, at);
        if let Some(record) = self.history.latest() {
            emit_record(record);
        }
        id
    }
}

#[cfg(target_os = "none")]
fn emit_record(record: &TelemetryRecord) {
    defmt::info!("telemetry {}", defmt::Display2Format(record));
}

#[cfg(not(target_os = "none"))]
fn emit_record(record: &TelemetryRecord) {
    println!("telemetry {record}");
}

#[cfg(target_os = "none")]
pub fn log_boot(reason: BootReason) {
    defmt::info!("boot: {}", defmt::Display2Format(&reason));
}

#[cfg(not(target_os = "none"))]
pub fn log_boot(reason: BootReason) {
    println!("boot: {reason}");
}

#[cfg(target_os = "none")]
pub fn log_fatal(error: &SequencerError) {
    defmt::error!("sequencer halted: {}; restarting", defmt::Display2Format(error));
}

#[cfg(not(target_os = "none"))]
pub fn log_fatal(error: &SequencerError) {
    eprintln!("sequencer halted: {error}; restarting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_core::sequencer::SequencerPhase;

    #[test]
    fn records_are_kept_after_logging() {
        let mut telemetry = LoggingTelemetry::new();

        let first = telemetry.record(
            TelemetryEventKind::PhaseEntered(SequencerPhase::Boot),
            Duration::ZERO,
        );
        let second = telemetry.record(
            TelemetryEventKind::PhaseEntered(SequencerPhase::PowerOn),
            Duration::from_millis(2_000),
        );

        assert_eq!((first, second), (0, 1));
        let latest = telemetry.history().latest().copied().expect("record kept");
        assert_eq!(
            latest.event,
            TelemetryEventKind::PhaseEntered(SequencerPhase::PowerOn)
        );
        assert_eq!(latest.at, Duration::from_millis(2_000));
    }
}
