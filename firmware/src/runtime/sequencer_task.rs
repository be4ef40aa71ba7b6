use embassy_stm32::gpio::{Input, Output};
use embassy_time::Delay;
use remote_core::ir::ProtocolEncoder;
use remote_core::sequencer::Sequencer;
use remote_core::sleep::BootReason;

use crate::hw::ir::PwmIrTransmitter;
use crate::hw::standby::{self, StandbySleep};
use crate::telemetry::{self, LoggingTelemetry};

pub type BoardSequencer = Sequencer<
    ProtocolEncoder,
    PwmIrTransmitter<'static>,
    Input<'static>,
    Output<'static>,
    StandbySleep,
    Delay,
>;

/// Runs the sequencer; any error it surfaces restarts the board.
#[embassy_executor::task]
pub async fn run(mut sequencer: BoardSequencer, boot: BootReason) -> ! {
    let mut sink = LoggingTelemetry::new();
    let Err(error) = sequencer.run(boot, &mut sink).await;
    telemetry::log_fatal(&error);
    standby::restart()
}
