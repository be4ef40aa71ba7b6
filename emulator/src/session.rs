use std::cell::RefCell;
use std::convert::Infallible;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use embassy_futures::block_on;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use remote_core::ir::{Carrier, EncoderConfig, IrProtocol, PulseLevel, Waveform, nec};
use remote_core::sequencer::{Sequencer, SequencerConfig, SequencerHardware};
use remote_core::sleep::{BootReason, SleepController, WakeArming, WakeTrigger};
use remote_core::telemetry::{EventId, TelemetryEventKind, TelemetryRecorder, TelemetrySink};
use remote_core::transmitter::IrTransmitter;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Cycle,
    Skip,
    Glitch,
}

impl TranscriptProfile {
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Cycle => "transcripts/emulator-cycle.log",
            TranscriptProfile::Skip => "transcripts/emulator-skip.log",
            TranscriptProfile::Glitch => "transcripts/emulator-glitch.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Cycle => "Projector remote emulator: two full cycles with a wake between",
            TranscriptProfile::Skip => "Projector remote emulator: presence returns before sleep",
            TranscriptProfile::Glitch => "Projector remote emulator: spurious wake rejected",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("cycle") {
            Ok(Self::Cycle)
        } else if tag.eq_ignore_ascii_case("skip") {
            Ok(Self::Skip)
        } else if tag.eq_ignore_ascii_case("glitch") {
            Ok(Self::Glitch)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }

    /// Presence level over time: starts high, then flips at each edge.
    pub fn presence_trace(self) -> PresenceTrace {
        let edges: &'static [(u64, bool)] = match self {
            TranscriptProfile::Cycle => &[(40_000, false), (120_000, true), (170_000, false)],
            TranscriptProfile::Skip => &[(30_000, false), (34_000, true), (70_000, false)],
            TranscriptProfile::Glitch => &[
                (30_000, false),
                (60_000, true),
                (60_200, false),
                (90_000, true),
                (140_000, false),
            ],
        };
        PresenceTrace {
            initial: true,
            edges,
        }
    }

    /// Virtual time after which the session stops.
    pub fn horizon(self) -> Duration {
        match self {
            TranscriptProfile::Cycle => Duration::from_secs(200),
            TranscriptProfile::Skip => Duration::from_secs(120),
            TranscriptProfile::Glitch => Duration::from_secs(180),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PresenceTrace {
    initial: bool,
    edges: &'static [(u64, bool)],
}

impl PresenceTrace {
    fn level_at(&self, at: Duration) -> bool {
        self.edges
            .iter()
            .rev()
            .find(|(millis, _)| Duration::from_millis(*millis) <= at)
            .map_or(self.initial, |(_, level)| *level)
    }

    /// Earliest instant at or after `from` where presence reads high.
    fn next_high(&self, from: Duration) -> Option<Duration> {
        if self.level_at(from) {
            return Some(from);
        }
        self.edges
            .iter()
            .map(|(millis, level)| (Duration::from_millis(*millis), *level))
            .find(|(at, level)| *level && *at > from)
            .map(|(at, _)| at)
    }
}

/// Totals reported once a session finishes.
#[derive(Clone, Debug, Default)]
pub struct SessionSummary {
    pub boots: usize,
    pub frames: usize,
    pub sleeps: usize,
    pub lines: Vec<String>,
}

pub struct Session {
    profile: TranscriptProfile,
    board: SharedBoard,
    transcript: TranscriptLogger,
}

impl Session {
    pub fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let transcript = TranscriptLogger::new(profile)?;
        let board = Rc::new(RefCell::new(SimBoard::new(
            profile.presence_trace(),
            profile.horizon(),
        )));

        Ok(Self {
            profile,
            board,
            transcript,
        })
    }

    pub fn profile(&self) -> TranscriptProfile {
        self.profile
    }

    /// Runs boots back to back until no wake is due before the horizon.
    pub fn run(&mut self) -> io::Result<SessionSummary> {
        let mut boot = BootReason::ColdStart;
        let mut summary = SessionSummary::default();

        loop {
            summary.boots += 1;
            self.board
                .borrow_mut()
                .log(TranscriptRole::Board, &format!("boot ({boot})"));

            match self.run_boot(boot) {
                BootOutcome::Slept => {
                    summary.sleeps += 1;
                    let mut board = self.board.borrow_mut();
                    let now = board.now;
                    let wake = board
                        .trace
                        .next_high(now)
                        .filter(|at| *at < board.horizon);
                    match wake {
                        Some(at) => {
                            board.now = at;
                            board.log(TranscriptRole::Board, "wake: presence line high");
                            boot = BootReason::WakeFromSleep;
                        }
                        None => {
                            board.log(TranscriptRole::Board, "no wake before horizon; session ends");
                            break;
                        }
                    }
                }
                BootOutcome::Horizon => {
                    self.board
                        .borrow_mut()
                        .log(TranscriptRole::Board, "horizon reached; session ends");
                    break;
                }
                BootOutcome::Fault(message) => {
                    self.board.borrow_mut().log(
                        TranscriptRole::Board,
                        &format!("fatal: {message}; the board would restart here"),
                    );
                    break;
                }
            }
        }

        let board = self.board.borrow();
        summary.frames = board.frames;
        summary.lines.clone_from(&board.lines);
        for line in &board.lines {
            self.transcript.append_line(line)?;
        }
        self.transcript.flush()?;
        Ok(summary)
    }

    fn run_boot(&mut self, boot: BootReason) -> BootOutcome {
        let hardware = SequencerHardware {
            encoder: EncoderConfig::new(IrProtocol::Nec, true).build(),
            ir: SimIr::new(&self.board),
            presence: SimPresence::new(&self.board),
            indicator: SimLed::new(&self.board),
            sleep: SimSleep::new(&self.board),
            delay: SimDelay::new(&self.board),
        };
        let mut sequencer = Sequencer::new(SequencerConfig::REFERENCE, hardware);
        let mut sink = TranscriptTelemetry::new(&self.board);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            block_on(sequencer.run(boot, &mut sink))
        }));

        match outcome {
            Ok(Err(error)) => BootOutcome::Fault(error.to_string()),
            Err(payload) if payload.is::<DeepSleep>() => BootOutcome::Slept,
            Err(payload) if payload.is::<HorizonReached>() => BootOutcome::Horizon,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

enum BootOutcome {
    Slept,
    Horizon,
    Fault(String),
}

/// Unwind payload standing in for the cold restart after deep sleep.
struct DeepSleep;

/// Unwind payload raised when virtual time passes the session horizon.
struct HorizonReached;

type SharedBoard = Rc<RefCell<SimBoard>>;

struct SimBoard {
    now: Duration,
    trace: PresenceTrace,
    horizon: Duration,
    frames: usize,
    lines: Vec<String>,
}

impl SimBoard {
    fn new(trace: PresenceTrace, horizon: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            trace,
            horizon,
            frames: 0,
            lines: Vec::new(),
        }
    }

    fn log(&mut self, role: TranscriptRole, message: &str) {
        self.lines.push(format!(
            "[{}] {} {}",
            format_clock(self.now),
            role.prefix(),
            message
        ));
    }
}

struct SimDelay {
    board: SharedBoard,
}

impl SimDelay {
    fn new(board: &SharedBoard) -> Self {
        Self {
            board: Rc::clone(board),
        }
    }
}

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        let past_horizon = {
            let mut board = self.board.borrow_mut();
            board.now += Duration::from_nanos(u64::from(ns));
            board.now >= board.horizon
        };
        if past_horizon {
            panic::resume_unwind(Box::new(HorizonReached));
        }
    }
}

struct SimPresence {
    board: SharedBoard,
}

impl SimPresence {
    fn new(board: &SharedBoard) -> Self {
        Self {
            board: Rc::clone(board),
        }
    }
}

impl ErrorType for SimPresence {
    type Error = Infallible;
}

impl InputPin for SimPresence {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let board = self.board.borrow();
        Ok(board.trace.level_at(board.now))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|level| !level)
    }
}

struct SimLed {
    board: SharedBoard,
}

impl SimLed {
    fn new(board: &SharedBoard) -> Self {
        Self {
            board: Rc::clone(board),
        }
    }
}

impl ErrorType for SimLed {
    type Error = Infallible;
}

impl OutputPin for SimLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.board.borrow_mut().log(TranscriptRole::Board, "led off");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.board.borrow_mut().log(TranscriptRole::Board, "led on");
        Ok(())
    }
}

struct SimIr {
    board: SharedBoard,
}

impl SimIr {
    fn new(board: &SharedBoard) -> Self {
        Self {
            board: Rc::clone(board),
        }
    }
}

impl IrTransmitter for SimIr {
    type Error = Infallible;

    fn transmit(&mut self, waveform: &Waveform, carrier: Carrier) -> Result<(), Self::Error> {
        let mut board = self.board.borrow_mut();
        board.log(TranscriptRole::Board, &describe_frame(waveform, carrier));
        board.frames += 1;
        board.now += waveform.duration();
        Ok(())
    }
}

struct SimSleep {
    board: SharedBoard,
    armed: Option<WakeArming>,
    isolated: Vec<u8>,
}

impl SimSleep {
    fn new(board: &SharedBoard) -> Self {
        Self {
            board: Rc::clone(board),
            armed: None,
            isolated: Vec::new(),
        }
    }
}

impl SleepController for SimSleep {
    type Error = Infallible;

    fn arm_wake(&mut self, arming: WakeArming) -> Result<(), Self::Error> {
        self.armed = Some(arming);
        Ok(())
    }

    fn isolate(&mut self, pin: u8) -> Result<(), Self::Error> {
        self.isolated.push(pin);
        Ok(())
    }

    fn enter_deep_sleep(&mut self) -> ! {
        let arming = match self.armed.take() {
            Some(arming) => format!(
                "mask=0x{:x} {}",
                arming.pin_mask,
                match arming.trigger {
                    WakeTrigger::AnyHigh => "any-high",
                }
            ),
            None => "unarmed".to_string(),
        };
        self.board.borrow_mut().log(
            TranscriptRole::Board,
            &format!("deep sleep ({arming}, isolated {:?})", self.isolated),
        );
        panic::resume_unwind(Box::new(DeepSleep))
    }
}

/// Mirrors sequencer telemetry into the transcript.
struct TranscriptTelemetry {
    board: SharedBoard,
    history: TelemetryRecorder,
}

impl TranscriptTelemetry {
    fn new(board: &SharedBoard) -> Self {
        Self {
            board: Rc::clone(board),
            history: TelemetryRecorder::new(),
        }
    }
}

impl TelemetrySink for TranscriptTelemetry {
    fn record(&mut self, event: TelemetryEventKind, at: Duration) -> EventId {
        let id = self.history.record(event, at);
        if let Some(record) = self.history.latest() {
            self.board
                .borrow_mut()
                .log(TranscriptRole::Core, &record.to_string());
        }
        id
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(self.writer, "# Timestamps are virtual board time")?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{line}")
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Board,
    Core,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Board => "BOARD>",
            TranscriptRole::Core => "CORE <",
        }
    }
}

fn describe_frame(waveform: &Waveform, carrier: Carrier) -> String {
    let airtime = format_duration_short(waveform.duration());
    let khz = carrier.frequency_hz / 1_000;
    match decode_nec(waveform) {
        Some((address, command)) => format!(
            "ir nec addr=0x{address:04x} cmd=0x{command:04x} marks={} airtime={airtime} carrier={khz}kHz",
            waveform.mark_count()
        ),
        None => format!(
            "ir repeat marks={} airtime={airtime} carrier={khz}kHz",
            waveform.mark_count()
        ),
    }
}

/// Recovers (address, command) from a full NEC frame.
fn decode_nec(waveform: &Waveform) -> Option<(u16, u16)> {
    let pulses = waveform.pulses();
    if pulses.len() != 67 || pulses[1].duration_us != nec::LEADING_SPACE_US {
        return None;
    }

    let mut bits = 0u32;
    for (index, pair) in pulses[2..66].chunks(2).enumerate() {
        if pair[1].level == PulseLevel::Space && pair[1].duration_us == nec::ONE_SPACE_US {
            bits |= 1 << index;
        }
    }
    let [a0, a1, c0, c1] = bits.to_le_bytes();
    Some((u16::from_le_bytes([a0, a1]), u16::from_le_bytes([c0, c1])))
}

fn format_clock(at: Duration) -> String {
    format!("+{:>4}.{:03}s", at.as_secs(), at.subsec_millis())
}

fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{:.1}ms", duration.as_secs_f64() * 1_000.0)
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
