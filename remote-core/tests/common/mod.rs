#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use embassy_futures::block_on;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs;
use remote_core::ir::{Carrier, EncoderConfig, IrProtocol, ProtocolEncoder, Waveform, nec};
use remote_core::sequencer::SequencerHardware;
use remote_core::sleep::{SleepController, WakeArming};
use remote_core::transmitter::IrTransmitter;

/// One frame put on the air by [`RecordingIr`].
#[derive(Clone, Debug)]
pub struct Frame {
    pub start: Duration,
    pub end: Duration,
    pub carrier: Carrier,
    pub waveform: Waveform,
}

impl Frame {
    /// NEC (address, command) when this is a full frame.
    pub fn nec_code(&self) -> Option<(u16, u16)> {
        let pulses = self.waveform.pulses();
        if pulses.len() != 67 {
            return None;
        }

        let mut bits = 0u32;
        for (index, pair) in pulses[2..66].chunks(2).enumerate() {
            if pair[1].duration_us == nec::ONE_SPACE_US {
                bits |= 1 << index;
            }
        }
        let [a0, a1, c0, c1] = bits.to_le_bytes();
        Some((u16::from_le_bytes([a0, a1]), u16::from_le_bytes([c0, c1])))
    }

    pub fn is_repeat(&self) -> bool {
        self.nec_code().is_none()
    }
}

/// Shared virtual board. Time only moves when a mock delay runs or a frame is
/// transmitted.
#[derive(Default)]
pub struct BoardState {
    pub now: Duration,
    pub presence_initial: bool,
    pub presence_edges: Vec<(Duration, bool)>,
    pub presence_queue: VecDeque<bool>,
    pub presence_reads: Vec<(Duration, bool)>,
    pub presence_broken: bool,
    pub presence_breaks_at: Option<Duration>,
    pub frames: Vec<Frame>,
    pub ir_broken: bool,
    pub indicator: Vec<(Duration, bool)>,
    pub indicator_broken: bool,
    pub armings: Vec<WakeArming>,
    pub isolated: Vec<u8>,
    pub sleep_broken: bool,
    pub sleeps: usize,
}

impl BoardState {
    fn presence_level(&mut self) -> bool {
        if let Some(level) = self.presence_queue.pop_front() {
            return level;
        }
        let now = self.now;
        self.presence_edges
            .iter()
            .rev()
            .find(|(at, _)| *at <= now)
            .map_or(self.presence_initial, |(_, level)| *level)
    }

    /// Initial frames only, in emission order.
    pub fn commands(&self) -> Vec<(Duration, u16)> {
        self.frames
            .iter()
            .filter_map(|frame| frame.nec_code().map(|(_, command)| (frame.start, command)))
            .collect()
    }
}

pub type Board = Rc<RefCell<BoardState>>;

pub fn board() -> Board {
    Rc::new(RefCell::new(BoardState::default()))
}

/// Presence follows `initial` then flips at each `(millis, level)` edge.
pub fn presence_timeline(board: &Board, initial: bool, edges: &[(u64, bool)]) {
    let mut state = board.borrow_mut();
    state.presence_initial = initial;
    state.presence_edges = edges
        .iter()
        .map(|(millis, level)| (Duration::from_millis(*millis), *level))
        .collect();
}

/// Queued samples are consumed before the timeline is consulted.
pub fn queue_presence(board: &Board, levels: &[u8]) {
    board
        .borrow_mut()
        .presence_queue
        .extend(levels.iter().map(|level| *level != 0));
}

pub fn nec_encoder() -> ProtocolEncoder {
    EncoderConfig::new(IrProtocol::Nec, true).build()
}

pub type MockHardware =
    SequencerHardware<ProtocolEncoder, RecordingIr, ScriptedPresence, RecordingLed, MockSleep, MockDelay>;

pub fn hardware(board: &Board) -> MockHardware {
    SequencerHardware {
        encoder: nec_encoder(),
        ir: RecordingIr::new(board),
        presence: ScriptedPresence::new(board),
        indicator: RecordingLed::new(board),
        sleep: MockSleep::new(board),
        delay: MockDelay::new(board),
    }
}

pub struct MockDelay {
    board: Board,
}

impl MockDelay {
    pub fn new(board: &Board) -> Self {
        Self {
            board: Rc::clone(board),
        }
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.board.borrow_mut().now += Duration::from_nanos(u64::from(ns));
    }
}

#[derive(Debug)]
pub struct PinFault;

impl embedded_hal::digital::Error for PinFault {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

pub struct ScriptedPresence {
    board: Board,
}

impl ScriptedPresence {
    pub fn new(board: &Board) -> Self {
        Self {
            board: Rc::clone(board),
        }
    }
}

impl ErrorType for ScriptedPresence {
    type Error = PinFault;
}

impl InputPin for ScriptedPresence {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let mut state = self.board.borrow_mut();
        let broken_now = state
            .presence_breaks_at
            .is_some_and(|at| state.now >= at);
        if state.presence_broken || broken_now {
            return Err(PinFault);
        }
        let level = state.presence_level();
        let now = state.now;
        state.presence_reads.push((now, level));
        Ok(level)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|level| !level)
    }
}

pub struct RecordingLed {
    board: Board,
}

impl RecordingLed {
    pub fn new(board: &Board) -> Self {
        Self {
            board: Rc::clone(board),
        }
    }
}

impl RecordingLed {
    fn drive(&mut self, lit: bool) -> Result<(), PinFault> {
        let mut state = self.board.borrow_mut();
        if state.indicator_broken {
            return Err(PinFault);
        }
        let now = state.now;
        state.indicator.push((now, lit));
        Ok(())
    }
}

impl ErrorType for RecordingLed {
    type Error = PinFault;
}

impl OutputPin for RecordingLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

#[derive(Debug)]
pub struct IrFault;

pub struct RecordingIr {
    board: Board,
}

impl RecordingIr {
    pub fn new(board: &Board) -> Self {
        Self {
            board: Rc::clone(board),
        }
    }
}

impl IrTransmitter for RecordingIr {
    type Error = IrFault;

    fn transmit(&mut self, waveform: &Waveform, carrier: Carrier) -> Result<(), Self::Error> {
        let mut state = self.board.borrow_mut();
        if state.ir_broken {
            return Err(IrFault);
        }
        let start = state.now;
        state.now += waveform.duration();
        let end = state.now;
        state.frames.push(Frame {
            start,
            end,
            carrier,
            waveform: waveform.clone(),
        });
        Ok(())
    }
}

/// Unwind payload standing in for the cold restart after deep sleep.
#[derive(Debug)]
pub struct DeepSleepEntered;

pub struct MockSleep {
    board: Board,
}

impl MockSleep {
    pub fn new(board: &Board) -> Self {
        Self {
            board: Rc::clone(board),
        }
    }
}

#[derive(Debug)]
pub struct WakeSourceRejected;

impl SleepController for MockSleep {
    type Error = WakeSourceRejected;

    fn arm_wake(&mut self, arming: WakeArming) -> Result<(), Self::Error> {
        let mut state = self.board.borrow_mut();
        if state.sleep_broken {
            return Err(WakeSourceRejected);
        }
        state.armings.push(arming);
        Ok(())
    }

    fn isolate(&mut self, pin: u8) -> Result<(), Self::Error> {
        self.board.borrow_mut().isolated.push(pin);
        Ok(())
    }

    fn enter_deep_sleep(&mut self) -> ! {
        self.board.borrow_mut().sleeps += 1;
        panic::resume_unwind(Box::new(DeepSleepEntered))
    }
}

/// Drives `future` and asserts it ends by entering deep sleep.
pub fn expect_deep_sleep<F>(future: F)
where
    F: Future,
    F::Output: Debug,
{
    match panic::catch_unwind(AssertUnwindSafe(|| block_on(future))) {
        Ok(output) => panic!("expected deep sleep, sequencer returned {output:?}"),
        Err(payload) => assert!(
            payload.is::<DeepSleepEntered>(),
            "sequencer panicked instead of sleeping"
        ),
    }
}
