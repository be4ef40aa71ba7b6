//! IR LED driver built on a TIM3 PWM carrier.
//!
//! The timer free-runs at the protocol carrier frequency with a one-third duty
//! cycle; marks enable the channel output and spaces disable it. Pulse edges are
//! paced with busy waits so the carrier gating stays within a tick of the
//! encoder's timings, which means [`IrTransmitter::transmit`] blocks for the
//! frame's airtime.

use core::convert::Infallible;

use embassy_stm32::gpio::OutputType;
use embassy_stm32::peripherals::{PA6, TIM3};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::Peri;
use embassy_time::{Duration, block_for};
use remote_core::ir::{Carrier, PulseLevel, Waveform};
use remote_core::transmitter::IrTransmitter;

pub struct PwmIrTransmitter<'d> {
    pwm: SimplePwm<'d, TIM3>,
    carrier: Option<Carrier>,
}

impl<'d> PwmIrTransmitter<'d> {
    pub fn new(timer: Peri<'d, TIM3>, pin: Peri<'d, PA6>) -> Self {
        let pin = PwmPin::new(pin, OutputType::PushPull);
        let pwm = SimplePwm::new(
            timer,
            Some(pin),
            None,
            None,
            None,
            Hertz(38_000),
            CountingMode::EdgeAlignedUp,
        );
        let mut transmitter = Self { pwm, carrier: None };
        transmitter.pwm.ch1().disable();
        transmitter
    }

    fn tune(&mut self, carrier: Carrier) {
        if self.carrier == Some(carrier) {
            return;
        }
        self.pwm.set_frequency(Hertz(carrier.frequency_hz));
        self.pwm.ch1().set_duty_cycle_percent(carrier.duty_percent);
        self.carrier = Some(carrier);
    }
}

impl IrTransmitter for PwmIrTransmitter<'_> {
    type Error = Infallible;

    fn transmit(&mut self, waveform: &Waveform, carrier: Carrier) -> Result<(), Self::Error> {
        self.tune(carrier);

        let mut channel = self.pwm.ch1();
        for pulse in waveform.pulses() {
            match pulse.level {
                PulseLevel::Mark => channel.enable(),
                PulseLevel::Space => channel.disable(),
            }
            block_for(Duration::from_micros(u64::from(pulse.duration_us)));
        }
        channel.disable();
        Ok(())
    }
}
