//! Hardware fault reporting shared by every board-facing component.

use core::fmt;

/// Board resource that failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultSource {
    PresenceInput,
    StatusIndicator,
    IrPeripheral,
    SleepController,
}

impl FaultSource {
    /// Short label used in logs and transcripts.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            FaultSource::PresenceInput => "presence-input",
            FaultSource::StatusIndicator => "status-indicator",
            FaultSource::IrPeripheral => "ir-peripheral",
            FaultSource::SleepController => "sleep-controller",
        }
    }
}

/// Peripheral or GPIO failure. Never retried; escalated to a system restart.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HardwareFault {
    pub source: FaultSource,
}

impl HardwareFault {
    #[must_use]
    pub const fn new(source: FaultSource) -> Self {
        Self { source }
    }
}

impl fmt::Display for HardwareFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hardware fault: {}", self.source.label())
    }
}
