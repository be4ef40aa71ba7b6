mod common;

use std::time::Duration;

use embassy_futures::block_on;
use remote_core::fault::{FaultSource, HardwareFault};
use remote_core::ir::{EncodeError, EncoderConfig, IrProtocol};
use remote_core::remote::RemoteKey;
use remote_core::sequencer::{
    Sequencer, SequencerConfig, SequencerError, SequencerHardware, SequencerPhase,
};
use remote_core::sleep::BootReason;
use remote_core::telemetry::{TelemetryEventKind, TelemetryRecorder};

use common::{board, hardware, presence_timeline};

fn hardware_fault(source: FaultSource) -> SequencerError {
    SequencerError::Hardware(HardwareFault::new(source))
}

#[test]
fn codes_without_checksum_abort_before_transmitting() {
    let board = board();
    presence_timeline(&board, true, &[(30_000, false)]);
    let hardware = SequencerHardware {
        encoder: EncoderConfig::new(IrProtocol::Nec, false).build(),
        ..hardware(&board)
    };
    let mut sequencer = Sequencer::new(SequencerConfig::REFERENCE, hardware);
    let mut telemetry = TelemetryRecorder::<128>::new();

    let Err(error) = block_on(sequencer.run(BootReason::ColdStart, &mut telemetry));

    assert_eq!(error, SequencerError::Encode(EncodeError::ChecksumMismatch));
    assert_eq!(sequencer.phase(), SequencerPhase::PowerOn);

    let state = board.borrow();
    assert!(state.frames.is_empty());
    assert_eq!(state.sleeps, 0);
    assert!(state.armings.is_empty());

    let last = telemetry.latest().map(|record| record.event);
    assert!(matches!(
        last,
        Some(TelemetryEventKind::CommandIssued {
            key: RemoteKey::Power,
            ..
        })
    ));
}

#[test]
fn presence_read_failure_while_waiting_for_idle_aborts() {
    let board = board();
    presence_timeline(&board, true, &[]);
    board.borrow_mut().presence_breaks_at = Some(Duration::from_millis(25_000));
    let mut sequencer = Sequencer::new(SequencerConfig::REFERENCE, hardware(&board));
    let mut telemetry = TelemetryRecorder::<128>::new();

    let Err(error) = block_on(sequencer.run(BootReason::ColdStart, &mut telemetry));

    assert_eq!(error, hardware_fault(FaultSource::PresenceInput));
    assert_eq!(sequencer.phase(), SequencerPhase::AwaitIdle);

    let state = board.borrow();
    assert!(!state.presence_reads.is_empty());
    // Power and the five navigation presses went out; the shutdown pair did not.
    assert_eq!(state.commands().len(), 6);
    assert_eq!(state.frames.len(), 12);
    assert!(state.indicator.iter().all(|(_, lit)| !lit));
    assert_eq!(state.sleeps, 0);
}

#[test]
fn rejected_wake_source_aborts_instead_of_sleeping() {
    let board = board();
    presence_timeline(&board, true, &[(30_000, false)]);
    board.borrow_mut().sleep_broken = true;
    let mut sequencer = Sequencer::new(SequencerConfig::REFERENCE, hardware(&board));
    let mut telemetry = TelemetryRecorder::<128>::new();

    let Err(error) = block_on(sequencer.run(BootReason::ColdStart, &mut telemetry));

    assert_eq!(error, hardware_fault(FaultSource::SleepController));

    let state = board.borrow();
    assert_eq!(state.frames.len(), 16);
    assert_eq!(state.sleeps, 0);
    assert!(state.armings.is_empty());
    assert!(state.isolated.is_empty());
    assert_eq!(
        telemetry.latest().map(|record| record.event),
        Some(TelemetryEventKind::SleepEntered)
    );
}

#[test]
fn broken_status_led_aborts_at_boot() {
    let board = board();
    presence_timeline(&board, true, &[(30_000, false)]);
    board.borrow_mut().indicator_broken = true;
    let mut sequencer = Sequencer::new(SequencerConfig::REFERENCE, hardware(&board));
    let mut telemetry = TelemetryRecorder::<128>::new();

    let Err(error) = block_on(sequencer.run(BootReason::ColdStart, &mut telemetry));

    assert_eq!(error, hardware_fault(FaultSource::StatusIndicator));

    let state = board.borrow();
    assert_eq!(state.now, Duration::ZERO);
    assert!(state.frames.is_empty());
    assert_eq!(state.sleeps, 0);
}
