use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_time::Delay;
use remote_core::sequencer::{Sequencer, SequencerHardware};

use crate::hw::{self, ir::PwmIrTransmitter, standby};
use crate::telemetry;

mod sequencer_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0, PA5, PA6, TIM3, ..
    } = hal::init(config);

    let boot = standby::take_boot_reason();
    telemetry::log_boot(boot);

    let hardware = SequencerHardware {
        encoder: hw::ENCODER.build(),
        ir: PwmIrTransmitter::new(TIM3, PA6),
        presence: Input::new(PA0, Pull::Down),
        indicator: Output::new(PA5, Level::Low, Speed::Low),
        sleep: standby::StandbySleep::new(),
        delay: Delay,
    };
    let sequencer = Sequencer::new(hw::sequencer_config(), hardware);

    spawner
        .spawn(sequencer_task::run(sequencer, boot))
        .expect("failed to spawn sequencer task");

    core::future::pending::<()>().await;
}
