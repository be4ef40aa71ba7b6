//! Board wiring for the STM32G0B1 projector remote.
//!
//! | Signal          | MCU pin | Notes                                           |
//! |-----------------|---------|-------------------------------------------------|
//! | Presence sense  | PA0     | WKUP1, pulled down (also in standby), high while the projector is on |
//! | Status LED      | PA5     | push-pull, lit during the shutdown pair         |
//! | IR LED driver   | PA6     | TIM3_CH1 carrier output                         |
//!
//! Everything in this module except the target-only drivers compiles on the
//! host so the board configuration can be unit tested.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::time::Duration;

use remote_core::ir::{EncoderConfig, IrProtocol};
use remote_core::sequencer::SequencerConfig;
use remote_core::sleep::SleepConfig;

#[cfg(target_os = "none")]
pub mod ir;
#[cfg(target_os = "none")]
pub mod standby;

/// Wakeup line the presence sense is routed to (PA0 is WKUP1).
pub const PRESENCE_WAKEUP_LINE: u8 = 1;
pub const PRESENCE_PIN: u8 = 0;
/// Port A pin numbers pulled down while in standby. The presence line needs
/// its pull too: `APC` drops the GPIO pulls and keeps only these.
pub const STANDBY_PULL_DOWN_PINS: [u8; 3] = [PRESENCE_PIN, STATUS_LED_PIN, IR_OUTPUT_PIN];
/// Number of WKUP lines on the STM32G0B1.
pub const WAKEUP_LINES: u8 = 6;
pub const STATUS_LED_PIN: u8 = 5;
pub const IR_OUTPUT_PIN: u8 = 6;

/// The projector address needs extended NEC addressing.
pub const ENCODER: EncoderConfig = EncoderConfig::new(IrProtocol::Nec, true);

/// Wake on WKUP1 going high; every listed pin is pulled down while asleep.
pub const STANDBY: SleepConfig = SleepConfig {
    wake_mask: 1 << PRESENCE_WAKEUP_LINE,
    isolate_pins: &STANDBY_PULL_DOWN_PINS,
    wake_settle: Duration::from_millis(500),
};

/// Pin or wake line outside what the PWR block can drive.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UnsupportedLine(pub u8);

/// Maps a wake pin mask (bit n selects WKUPn) onto zero-based line bits as
/// laid out in `PWR_CR3.EWUP` and `PWR_SR1.WUF`.
///
/// # Errors
///
/// Bit 0 and bits above [`WAKEUP_LINES`] name no wake line.
pub fn wake_line_bits(pin_mask: u64) -> Result<u8, UnsupportedLine> {
    let mut lines = 0u8;
    for bit in 0..u64::BITS {
        if pin_mask & (1 << bit) == 0 {
            continue;
        }
        let line = u8::try_from(bit).unwrap_or(u8::MAX);
        if line == 0 || line > WAKEUP_LINES {
            return Err(UnsupportedLine(line));
        }
        lines |= 1 << (line - 1);
    }
    Ok(lines)
}

/// Standby is only safe while no armed wake edge is already latched and the
/// presence line is still low; otherwise the edge that should wake the board
/// has been spent before it went to sleep.
#[must_use]
pub const fn standby_permitted(pending_wake: u8, armed_lines: u8, presence_high: bool) -> bool {
    !presence_high && pending_wake & armed_lines == 0
}

/// Reference projector script with this board's wake wiring.
#[must_use]
pub const fn sequencer_config() -> SequencerConfig {
    SequencerConfig {
        sleep: STANDBY,
        ..SequencerConfig::REFERENCE
    }
}
