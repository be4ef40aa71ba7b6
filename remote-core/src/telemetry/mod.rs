//! Telemetry event catalog and the bounded recorder shared by every target.
//!
//! The sequencer never logs on its own. It hands each notable step to a
//! [`TelemetrySink`], and the target decides what to do with it: firmware
//! mirrors records to defmt, the emulator writes them into its transcript and
//! tests inspect the [`TelemetryRecorder`] ring afterwards.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::presence::PresenceState;
use crate::remote::{RemoteCommand, RemoteKey};
use crate::sequencer::SequencerPhase;

/// Identifier used when tracking emitted telemetry events.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    PhaseEntered(SequencerPhase),
    CommandIssued {
        key: RemoteKey,
        command: RemoteCommand,
    },
    PresenceChanged(PresenceState),
    IdleConfirmed,
    SleepSkipped,
    SleepEntered,
    WakeConfirmed,
    WakeRejected,
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::PhaseEntered(phase) => write!(f, "phase {phase}"),
            TelemetryEventKind::CommandIssued { key, command } => write!(
                f,
                "command {key} addr=0x{:04x} cmd=0x{:04x}",
                command.address, command.command
            ),
            TelemetryEventKind::PresenceChanged(state) => {
                write!(f, "presence {}", state.label())
            }
            TelemetryEventKind::IdleConfirmed => f.write_str("idle-confirmed"),
            TelemetryEventKind::SleepSkipped => f.write_str("sleep-skipped"),
            TelemetryEventKind::SleepEntered => f.write_str("sleep-entered"),
            TelemetryEventKind::WakeConfirmed => f.write_str("wake-confirmed"),
            TelemetryEventKind::WakeRejected => f.write_str("wake-rejected"),
        }
    }
}

/// Telemetry record stored in the ring buffer.
///
/// `at` is the scheduled time since program entry: the sum of every delay the
/// sequencer requested, excluding frame airtime.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub at: Duration,
    pub event: TelemetryEventKind,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} t=+{}ms {}",
            self.id,
            self.at.as_millis(),
            self.event
        )
    }
}

/// Destination for sequencer telemetry.
pub trait TelemetrySink {
    fn record(&mut self, event: TelemetryEventKind, at: Duration) -> EventId;
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: TelemetryRing<CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> TelemetrySink for TelemetryRecorder<CAPACITY> {
    fn record(&mut self, event: TelemetryEventKind, at: Duration) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord { id, at, event });

        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_and_ring_keeps_newest() {
        let mut recorder = TelemetryRecorder::<2>::new();
        assert!(recorder.is_empty());

        recorder.record(TelemetryEventKind::IdleConfirmed, Duration::from_millis(10));
        recorder.record(TelemetryEventKind::SleepSkipped, Duration::from_millis(20));
        let id = recorder.record(TelemetryEventKind::SleepEntered, Duration::from_millis(30));

        assert_eq!(id, 2);
        assert_eq!(recorder.len(), 2);

        let events: heapless::Vec<TelemetryEventKind, 2> =
            recorder.oldest_first().map(|record| record.event).collect();
        assert_eq!(
            events.as_slice(),
            &[TelemetryEventKind::SleepSkipped, TelemetryEventKind::SleepEntered]
        );
    }

    #[test]
    fn command_record_formats_codes() {
        let mut recorder = TelemetryRecorder::<4>::new();
        recorder.record(
            TelemetryEventKind::CommandIssued {
                key: RemoteKey::Power,
                command: RemoteCommand::new(0xf483, 0xe817),
            },
            Duration::from_millis(2_000),
        );

        let record = recorder.latest().copied().expect("record stored");
        let mut rendered: heapless::String<64> = heapless::String::new();
        fmt::write(&mut rendered, format_args!("{record}")).expect("fits");
        assert_eq!(rendered.as_str(), "#0 t=+2000ms command power addr=0xf483 cmd=0xe817");
    }
}
