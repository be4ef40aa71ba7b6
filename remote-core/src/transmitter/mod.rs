//! Command issuance: one initial frame, one repeat frame, then a settle delay.

use core::fmt;

use embedded_hal_async::delay::DelayNs;

use crate::fault::{FaultSource, HardwareFault};
use crate::ir::{Carrier, EncodeError, FrameEncoder, Waveform};
use crate::remote::TransmissionRequest;
use crate::timing::pause;

/// Pulse-train peripheral that puts a waveform on the IR LED.
pub trait IrTransmitter {
    type Error;

    /// Emits `waveform` on `carrier`, returning once the last pulse has ended.
    ///
    /// # Errors
    ///
    /// Implementation-defined peripheral failure.
    fn transmit(&mut self, waveform: &Waveform, carrier: Carrier) -> Result<(), Self::Error>;
}

/// Why a command could not be issued.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransmitError {
    Encode(EncodeError),
    Hardware(HardwareFault),
}

impl fmt::Display for TransmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmitError::Encode(error) => write!(f, "encode error: {error}"),
            TransmitError::Hardware(fault) => fault.fmt(f),
        }
    }
}

impl From<EncodeError> for TransmitError {
    fn from(error: EncodeError) -> Self {
        TransmitError::Encode(error)
    }
}

impl From<HardwareFault> for TransmitError {
    fn from(fault: HardwareFault) -> Self {
        TransmitError::Hardware(fault)
    }
}

/// Owns the encoder and the IR peripheral for the lifetime of the program, so
/// only one request can be on the air at a time.
#[derive(Debug)]
pub struct CommandTransmitter<E, T> {
    encoder: E,
    peripheral: T,
}

impl<E, T> CommandTransmitter<E, T>
where
    E: FrameEncoder,
    T: IrTransmitter,
{
    #[must_use]
    pub const fn new(encoder: E, peripheral: T) -> Self {
        Self {
            encoder,
            peripheral,
        }
    }

    #[must_use]
    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Issues `request`.
    ///
    /// The repeat frame starts one repeat period after the initial frame
    /// started. The post delay, when nonzero, runs after the repeat frame.
    /// Nothing is retried.
    ///
    /// # Errors
    ///
    /// [`TransmitError::Encode`] when the command does not fit the protocol and
    /// [`TransmitError::Hardware`] when the peripheral rejects a frame.
    pub async fn send<D: DelayNs>(
        &mut self,
        request: TransmissionRequest,
        delay: &mut D,
    ) -> Result<(), TransmitError> {
        let command = request.command;
        let initial = self
            .encoder
            .build_initial_frame(command.address, command.command)?;
        self.emit(&initial)?;

        let gap = self
            .encoder
            .repeat_period()
            .saturating_sub(initial.duration());
        pause(delay, gap).await;

        let repeat = self.encoder.build_repeat_frame()?;
        self.emit(&repeat)?;

        pause(delay, request.post_delay).await;
        Ok(())
    }

    fn emit(&mut self, waveform: &Waveform) -> Result<(), HardwareFault> {
        let carrier = self.encoder.carrier();
        self.peripheral
            .transmit(waveform, carrier)
            .map_err(|_| HardwareFault::new(FaultSource::IrPeripheral))
    }
}
