//! STM32G0 standby entry and wakeup-flag handling.
//!
//! Standby powers the core domain down entirely; the only way out is a reset,
//! after which `SBF` in `PWR_SR1` tells the firmware it came back from standby
//! rather than from power-on. Wake is armed on the WKUPx lines with `PWR_CR3`
//! and `PWR_CR4`, and pins that must not float while the I/O ring is unpowered
//! are held with the standby pull-down registers (`PWR_PDCRx`, applied when
//! `APC` is set).

use cortex_m::peripheral::SCB;
use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::Idr;
use remote_core::sleep::{BootReason, SleepController, WakeArming, WakeTrigger};

use super::{PRESENCE_PIN, UnsupportedLine, WAKEUP_LINES, standby_permitted, wake_line_bits};

/// `PWR_CR1.LPMS` encoding for standby.
const LPMS_STANDBY: u8 = 0b011;
/// Port index of GPIOA in the PWR pull-control register array.
const PORT_A: usize = 0;

/// Reads and clears the standby flag.
pub fn take_boot_reason() -> BootReason {
    let pwr = pac::PWR;
    let woke = pwr.sr1().read().sbf();
    pwr.scr().write(|w| {
        w.set_csbf(true);
        for line in 0..usize::from(WAKEUP_LINES) {
            w.set_cwuf(line, true);
        }
    });

    if woke {
        BootReason::WakeFromSleep
    } else {
        BootReason::ColdStart
    }
}

#[derive(Default)]
pub struct StandbySleep {
    armed_lines: u8,
}

impl StandbySleep {
    pub const fn new() -> Self {
        Self { armed_lines: 0 }
    }
}

impl SleepController for StandbySleep {
    type Error = UnsupportedLine;

    fn arm_wake(&mut self, arming: WakeArming) -> Result<(), Self::Error> {
        let lines = wake_line_bits(arming.pin_mask)?;
        let falling = match arming.trigger {
            WakeTrigger::AnyHigh => false,
        };
        let pwr = pac::PWR;

        // Stale flags go before the lines are enabled so an edge arriving
        // from here on stays latched.
        pwr.scr().write(|w| {
            for line in 0..usize::from(WAKEUP_LINES) {
                w.set_cwuf(line, true);
            }
        });
        for line in 0..usize::from(WAKEUP_LINES) {
            if lines & (1 << line) == 0 {
                continue;
            }
            pwr.cr4().modify(|w| w.set_wp(line, falling));
            pwr.cr3().modify(|w| w.set_ewup(line, true));
        }

        self.armed_lines |= lines;
        Ok(())
    }

    fn isolate(&mut self, pin: u8) -> Result<(), Self::Error> {
        if pin > 15 {
            return Err(UnsupportedLine(pin));
        }
        let pwr = pac::PWR;
        pwr.pdcr(PORT_A).modify(|w| w.set_p(usize::from(pin), true));
        pwr.cr3().modify(|w| w.set_apc(true));
        Ok(())
    }

    fn enter_deep_sleep(&mut self) -> ! {
        let pwr = pac::PWR;
        let status = pwr.sr1().read();
        let pending = (0..WAKEUP_LINES)
            .filter(|line| status.wuf(usize::from(*line)))
            .fold(0u8, |bits, line| bits | (1 << line));
        let presence_high =
            pac::GPIOA.idr().read().idr(usize::from(PRESENCE_PIN)) == Idr::HIGH;

        // The wake edge already happened; standby would never end.
        if !standby_permitted(pending, self.armed_lines, presence_high) {
            restart();
        }

        pwr.cr1().modify(|w| w.set_lpms(LPMS_STANDBY));

        // SAFETY: the sequencer task is the only user of the system control
        // block and nothing runs after this point.
        let mut core = unsafe { cortex_m::Peripherals::steal() };
        core.SCB.set_sleepdeep();

        loop {
            cortex_m::asm::dsb();
            cortex_m::asm::wfi();
        }
    }
}

/// Resets the MCU. Used to escalate unrecoverable faults.
pub fn restart() -> ! {
    SCB::sys_reset()
}
