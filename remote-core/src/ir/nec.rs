//! NEC frame builder.
//!
//! A frame is a 9 ms leader burst, a 4.5 ms gap, 32 pulse-distance bits sent
//! least-significant first (16 address bits then 16 command bits) and a
//! closing burst. Holding a key is signalled with the short repeat code rather
//! than a second full frame.

use core::time::Duration;

use super::{Carrier, EncodeError, FrameEncoder, Waveform};

pub const LEADING_MARK_US: u32 = 9_000;
pub const LEADING_SPACE_US: u32 = 4_500;
pub const BIT_MARK_US: u32 = 560;
pub const ONE_SPACE_US: u32 = 1_690;
pub const ZERO_SPACE_US: u32 = 560;
pub const REPEAT_SPACE_US: u32 = 2_250;
/// Start-to-start spacing of NEC frames.
pub const REPEAT_PERIOD: Duration = Duration::from_millis(110);
pub const CARRIER: Carrier = Carrier {
    frequency_hz: 38_000,
    duty_percent: 33,
};

/// NEC builder. Extended mode sends raw 16-bit words; standard mode requires
/// each word to carry its own inverted-byte checksum.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NecEncoder {
    extended: bool,
}

impl NecEncoder {
    #[must_use]
    pub const fn new(extended: bool) -> Self {
        Self { extended }
    }

    #[must_use]
    pub const fn is_extended(&self) -> bool {
        self.extended
    }

    fn checked_word(&self, value: u32, out_of_range: EncodeError) -> Result<u16, EncodeError> {
        let word = u16::try_from(value).map_err(|_| out_of_range)?;
        if !self.extended && !carries_checksum(word) {
            return Err(EncodeError::ChecksumMismatch);
        }
        Ok(word)
    }
}

/// Standard NEC words send a byte followed by its complement.
const fn carries_checksum(word: u16) -> bool {
    let [low, high] = word.to_le_bytes();
    high == !low
}

fn push_word(waveform: &mut Waveform, word: u16) -> Result<(), EncodeError> {
    for bit in 0..16 {
        let space = if word & (1 << bit) == 0 {
            ZERO_SPACE_US
        } else {
            ONE_SPACE_US
        };
        waveform.push_mark(BIT_MARK_US)?;
        waveform.push_space(space)?;
    }
    Ok(())
}

impl FrameEncoder for NecEncoder {
    fn build_initial_frame(&mut self, address: u32, command: u32) -> Result<Waveform, EncodeError> {
        let address = self.checked_word(address, EncodeError::AddressOutOfRange)?;
        let command = self.checked_word(command, EncodeError::CommandOutOfRange)?;

        let mut waveform = Waveform::new();
        waveform.push_mark(LEADING_MARK_US)?;
        waveform.push_space(LEADING_SPACE_US)?;
        push_word(&mut waveform, address)?;
        push_word(&mut waveform, command)?;
        waveform.push_mark(BIT_MARK_US)?;
        Ok(waveform)
    }

    fn build_repeat_frame(&mut self) -> Result<Waveform, EncodeError> {
        let mut waveform = Waveform::new();
        waveform.push_mark(LEADING_MARK_US)?;
        waveform.push_space(REPEAT_SPACE_US)?;
        waveform.push_mark(BIT_MARK_US)?;
        Ok(waveform)
    }

    fn repeat_period(&self) -> Duration {
        REPEAT_PERIOD
    }

    fn carrier(&self) -> Carrier {
        CARRIER
    }
}
