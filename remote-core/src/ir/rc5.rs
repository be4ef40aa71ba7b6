//! RC5 frame builder.
//!
//! RC5 sends 14 Manchester-coded bits, most significant first: start, field,
//! toggle, five address bits and six command bits. A `1` is a space followed by
//! a mark, a `0` the reverse. Receivers tell a held key from a fresh press by
//! the toggle bit, so the repeat frame replays the last frame untouched while
//! every new initial frame flips it.

use core::time::Duration;

use super::{Carrier, EncodeError, FrameEncoder, Waveform};

pub const HALF_BIT_US: u32 = 889;
pub const FRAME_BITS: u32 = 14;
pub const MAX_ADDRESS: u32 = 0x1F;
pub const MAX_COMMAND: u32 = 0x3F;
/// Command range when bit 6 travels in the inverted field bit (RC5X).
pub const MAX_EXTENDED_COMMAND: u32 = 0x7F;
pub const REPEAT_PERIOD: Duration = Duration::from_millis(114);
pub const CARRIER: Carrier = Carrier {
    frequency_hz: 36_000,
    duty_percent: 33,
};

const TOGGLE_SHIFT: u32 = 11;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Rc5Encoder {
    extended: bool,
    toggle: bool,
    last_frame: Option<u16>,
}

impl Rc5Encoder {
    #[must_use]
    pub const fn new(extended: bool) -> Self {
        Self {
            extended,
            toggle: false,
            last_frame: None,
        }
    }

    #[must_use]
    pub const fn is_extended(&self) -> bool {
        self.extended
    }

    /// Toggle bit the next initial frame will carry.
    #[must_use]
    pub const fn next_toggle(&self) -> bool {
        self.toggle
    }

    fn compose(&self, address: u32, command: u32) -> Result<u16, EncodeError> {
        if address > MAX_ADDRESS {
            return Err(EncodeError::AddressOutOfRange);
        }
        let limit = if self.extended {
            MAX_EXTENDED_COMMAND
        } else {
            MAX_COMMAND
        };
        if command > limit {
            return Err(EncodeError::CommandOutOfRange);
        }

        let field = if self.extended {
            command & 0x40 == 0
        } else {
            true
        };

        let bits = (1 << 13)
            | (u32::from(field) << 12)
            | (u32::from(self.toggle) << TOGGLE_SHIFT)
            | (address << 6)
            | (command & MAX_COMMAND);
        u16::try_from(bits).map_err(|_| EncodeError::CommandOutOfRange)
    }
}

fn manchester(bits: u16) -> Result<Waveform, EncodeError> {
    let mut waveform = Waveform::new();
    for position in (0..FRAME_BITS).rev() {
        if bits & (1 << position) == 0 {
            waveform.push_mark(HALF_BIT_US)?;
            waveform.push_space(HALF_BIT_US)?;
        } else {
            waveform.push_space(HALF_BIT_US)?;
            waveform.push_mark(HALF_BIT_US)?;
        }
    }
    Ok(waveform)
}

impl FrameEncoder for Rc5Encoder {
    fn build_initial_frame(&mut self, address: u32, command: u32) -> Result<Waveform, EncodeError> {
        let bits = self.compose(address, command)?;
        let waveform = manchester(bits)?;
        self.last_frame = Some(bits);
        self.toggle = !self.toggle;
        Ok(waveform)
    }

    fn build_repeat_frame(&mut self) -> Result<Waveform, EncodeError> {
        let bits = self.last_frame.ok_or(EncodeError::NoFrameToRepeat)?;
        manchester(bits)
    }

    fn repeat_period(&self) -> Duration {
        REPEAT_PERIOD
    }

    fn carrier(&self) -> Carrier {
        CARRIER
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PulseLevel;

    /// Samples each bit in its second half, where a mark means `1`.
    fn decode(waveform: &Waveform) -> u16 {
        let mut halves = [PulseLevel::Space; 28];
        let mut cursor = 0;
        for pulse in waveform.pulses() {
            let count = (pulse.duration_us / HALF_BIT_US) as usize;
            for slot in &mut halves[cursor..cursor + count] {
                *slot = pulse.level;
            }
            cursor += count;
        }

        halves.chunks(2).fold(0, |acc, pair| {
            (acc << 1) | u16::from(pair[1] == PulseLevel::Mark)
        })
    }

    #[test]
    fn frame_layout_matches_fields() {
        let mut encoder = Rc5Encoder::new(false);
        let frame = encoder.build_initial_frame(0x05, 0x35).unwrap();

        assert_eq!(decode(&frame), (1 << 13) | (1 << 12) | (0x05 << 6) | 0x35);
        assert_eq!(frame.duration(), Duration::from_micros(28 * 889));
    }

    #[test]
    fn toggle_flips_per_initial_frame_and_repeat_replays() {
        let mut encoder = Rc5Encoder::new(false);

        let first = encoder.build_initial_frame(0x00, 0x0C).unwrap();
        let repeat = encoder.build_repeat_frame().unwrap();
        let second = encoder.build_initial_frame(0x00, 0x0C).unwrap();

        assert_eq!(first, repeat);
        assert_eq!(decode(&first) & (1 << TOGGLE_SHIFT), 0);
        assert_ne!(decode(&second) & (1 << TOGGLE_SHIFT), 0);
    }

    #[test]
    fn extended_mode_moves_command_bit_six_into_field() {
        let mut encoder = Rc5Encoder::new(true);
        let frame = encoder.build_initial_frame(0x01, 0x45).unwrap();

        // Field bit cleared, toggle clear.
        assert_eq!(decode(&frame), (1 << 13) | (0x01 << 6) | 0x05);
    }

    #[test]
    fn repeat_without_initial_frame_fails() {
        let mut encoder = Rc5Encoder::new(false);
        assert_eq!(
            encoder.build_repeat_frame(),
            Err(EncodeError::NoFrameToRepeat)
        );
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut encoder = Rc5Encoder::new(false);
        assert_eq!(
            encoder.build_initial_frame(0x20, 0x01),
            Err(EncodeError::AddressOutOfRange)
        );
        assert_eq!(
            encoder.build_initial_frame(0x01, 0x40),
            Err(EncodeError::CommandOutOfRange)
        );

        let mut extended = Rc5Encoder::new(true);
        assert!(extended.build_initial_frame(0x01, 0x40).is_ok());
        assert_eq!(
            extended.build_initial_frame(0x01, 0x80),
            Err(EncodeError::CommandOutOfRange)
        );
    }
}
