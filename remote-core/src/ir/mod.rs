//! Infrared waveform model and protocol frame builders.
//!
//! A [`Waveform`] is the protocol-agnostic hand-off between the frame builders
//! and the transmission peripheral: an ordered list of carrier-on ("mark") and
//! carrier-off ("space") intervals. Builders implement [`FrameEncoder`]; the
//! variant is chosen once at configuration time through [`EncoderConfig`].

use core::{fmt, time::Duration};

use heapless::Vec;

pub mod nec;
pub mod rc5;

pub use nec::NecEncoder;
pub use rc5::Rc5Encoder;

/// Longest waveform any supported protocol produces, with a little headroom.
pub const MAX_WAVEFORM_PULSES: usize = 72;

/// Carrier state during a pulse.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PulseLevel {
    Mark,
    Space,
}

/// One interval of a waveform.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pulse {
    pub level: PulseLevel,
    pub duration_us: u32,
}

impl Pulse {
    #[must_use]
    pub const fn mark(duration_us: u32) -> Self {
        Self {
            level: PulseLevel::Mark,
            duration_us,
        }
    }

    #[must_use]
    pub const fn space(duration_us: u32) -> Self {
        Self {
            level: PulseLevel::Space,
            duration_us,
        }
    }
}

/// Bounded mark/space pulse train.
///
/// Adjacent pulses of the same level are merged on push, so a Manchester
/// encoder can emit half-bits without caring about its neighbours.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Waveform {
    pulses: Vec<Pulse, MAX_WAVEFORM_PULSES>,
}

impl Waveform {
    #[must_use]
    pub const fn new() -> Self {
        Self { pulses: Vec::new() }
    }

    /// Appends a pulse, merging it into the previous one when the level matches.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::WaveformOverflow`] when the pulse table is full.
    pub fn push(&mut self, pulse: Pulse) -> Result<(), EncodeError> {
        if pulse.duration_us == 0 {
            return Ok(());
        }
        if let Some(last) = self.pulses.last_mut()
            && last.level == pulse.level
        {
            last.duration_us = last.duration_us.saturating_add(pulse.duration_us);
            return Ok(());
        }
        self.pulses
            .push(pulse)
            .map_err(|_| EncodeError::WaveformOverflow)
    }

    /// # Errors
    ///
    /// See [`Waveform::push`].
    pub fn push_mark(&mut self, duration_us: u32) -> Result<(), EncodeError> {
        self.push(Pulse::mark(duration_us))
    }

    /// # Errors
    ///
    /// See [`Waveform::push`].
    pub fn push_space(&mut self, duration_us: u32) -> Result<(), EncodeError> {
        self.push(Pulse::space(duration_us))
    }

    #[must_use]
    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// Number of carrier bursts in the waveform.
    #[must_use]
    pub fn mark_count(&self) -> usize {
        self.pulses
            .iter()
            .filter(|pulse| pulse.level == PulseLevel::Mark)
            .count()
    }

    /// Total airtime of the waveform.
    #[must_use]
    pub fn duration(&self) -> Duration {
        let micros = self
            .pulses
            .iter()
            .map(|pulse| u64::from(pulse.duration_us))
            .sum();
        Duration::from_micros(micros)
    }
}

/// Modulation carrier a protocol expects.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Carrier {
    pub frequency_hz: u32,
    pub duty_percent: u8,
}

/// Reasons a frame cannot be built. Always fatal for the current cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EncodeError {
    AddressOutOfRange,
    CommandOutOfRange,
    ChecksumMismatch,
    NoFrameToRepeat,
    WaveformOverflow,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Builds protocol frames for one remote-control protocol.
pub trait FrameEncoder {
    /// Builds the full frame carrying `address` and `command`.
    ///
    /// # Errors
    ///
    /// Fails when either value cannot be represented by the protocol.
    fn build_initial_frame(&mut self, address: u32, command: u32) -> Result<Waveform, EncodeError>;

    /// Builds the frame that signals a held key after an initial frame.
    ///
    /// # Errors
    ///
    /// Fails when the protocol needs a previous frame and none was built.
    fn build_repeat_frame(&mut self) -> Result<Waveform, EncodeError>;

    /// Start-to-start spacing between an initial frame and its repeat.
    fn repeat_period(&self) -> Duration;

    fn carrier(&self) -> Carrier;
}

/// Supported remote-control protocols.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum IrProtocol {
    Nec,
    Rc5,
}

impl fmt::Display for IrProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrProtocol::Nec => f.write_str("nec"),
            IrProtocol::Rc5 => f.write_str("rc5"),
        }
    }
}

/// Protocol selection made once at configuration time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EncoderConfig {
    pub protocol: IrProtocol,
    /// Extended addressing (16-bit NEC address, RC5 command bit 6).
    pub extended: bool,
}

impl EncoderConfig {
    #[must_use]
    pub const fn new(protocol: IrProtocol, extended: bool) -> Self {
        Self { protocol, extended }
    }

    /// Instantiates the builder for the selected protocol.
    #[must_use]
    pub const fn build(self) -> ProtocolEncoder {
        match self.protocol {
            IrProtocol::Nec => ProtocolEncoder::Nec(NecEncoder::new(self.extended)),
            IrProtocol::Rc5 => ProtocolEncoder::Rc5(Rc5Encoder::new(self.extended)),
        }
    }
}

/// Encoder dispatching to whichever protocol was configured.
#[derive(Clone, Debug)]
pub enum ProtocolEncoder {
    Nec(NecEncoder),
    Rc5(Rc5Encoder),
}

impl ProtocolEncoder {
    #[must_use]
    pub const fn protocol(&self) -> IrProtocol {
        match self {
            ProtocolEncoder::Nec(_) => IrProtocol::Nec,
            ProtocolEncoder::Rc5(_) => IrProtocol::Rc5,
        }
    }
}

impl FrameEncoder for ProtocolEncoder {
    fn build_initial_frame(&mut self, address: u32, command: u32) -> Result<Waveform, EncodeError> {
        match self {
            ProtocolEncoder::Nec(encoder) => encoder.build_initial_frame(address, command),
            ProtocolEncoder::Rc5(encoder) => encoder.build_initial_frame(address, command),
        }
    }

    fn build_repeat_frame(&mut self) -> Result<Waveform, EncodeError> {
        match self {
            ProtocolEncoder::Nec(encoder) => encoder.build_repeat_frame(),
            ProtocolEncoder::Rc5(encoder) => encoder.build_repeat_frame(),
        }
    }

    fn repeat_period(&self) -> Duration {
        match self {
            ProtocolEncoder::Nec(encoder) => encoder.repeat_period(),
            ProtocolEncoder::Rc5(encoder) => encoder.repeat_period(),
        }
    }

    fn carrier(&self) -> Carrier {
        match self {
            ProtocolEncoder::Nec(encoder) => encoder.carrier(),
            ProtocolEncoder::Rc5(encoder) => encoder.carrier(),
        }
    }
}
