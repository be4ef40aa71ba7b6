//! Appliance command catalog and the scripted steps issued each cycle.
//!
//! The catalog is a read-only table built at compile time and injected into the
//! sequencer, so supporting a different appliance means supplying a different
//! [`RemoteCatalog`] and [`CycleScript`] rather than touching the state machine.

use core::{fmt, time::Duration};

pub mod projector;

pub use projector::{PROJECTOR_CYCLE, PROJECTOR_REMOTE};

/// Logical (address, command) pair understood by the appliance.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RemoteCommand {
    pub address: u32,
    pub command: u32,
}

impl RemoteCommand {
    #[must_use]
    pub const fn new(address: u32, command: u32) -> Self {
        Self { address, command }
    }
}

/// Keys of the handheld remote the sequencer presses.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RemoteKey {
    Power,
    Right,
    Down,
    Confirm,
}

impl RemoteKey {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            RemoteKey::Power => "power",
            RemoteKey::Right => "right",
            RemoteKey::Down => "down",
            RemoteKey::Confirm => "ok",
        }
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Command codes for one appliance; every key shares the appliance address.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RemoteCatalog {
    pub address: u32,
    pub power: u32,
    pub right: u32,
    pub down: u32,
    pub confirm: u32,
}

impl RemoteCatalog {
    #[must_use]
    pub const fn command(&self, key: RemoteKey) -> RemoteCommand {
        let code = match key {
            RemoteKey::Power => self.power,
            RemoteKey::Right => self.right,
            RemoteKey::Down => self.down,
            RemoteKey::Confirm => self.confirm,
        };
        RemoteCommand::new(self.address, code)
    }

    /// Resolves a script step into a request for the transmitter.
    #[must_use]
    pub const fn request(&self, step: ScriptStep) -> TransmissionRequest {
        TransmissionRequest::new(self.command(step.key), step.post_delay)
    }
}

/// One command issuance plus the settle time that follows it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TransmissionRequest {
    pub command: RemoteCommand,
    pub post_delay: Duration,
}

impl TransmissionRequest {
    #[must_use]
    pub const fn new(command: RemoteCommand, post_delay: Duration) -> Self {
        Self {
            command,
            post_delay,
        }
    }
}

/// Key press in a cycle script.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScriptStep {
    pub key: RemoteKey,
    pub post_delay: Duration,
}

impl ScriptStep {
    #[must_use]
    pub const fn new(key: RemoteKey, post_delay_ms: u64) -> Self {
        Self {
            key,
            post_delay: Duration::from_millis(post_delay_ms),
        }
    }
}

/// Key presses issued in each phase of a work cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CycleScript {
    pub power_on: ScriptStep,
    pub navigation: &'static [ScriptStep],
    pub shutdown: &'static [ScriptStep],
}

impl CycleScript {
    /// Every step of a full cycle in emission order.
    pub fn steps(&self) -> impl Iterator<Item = ScriptStep> + '_ {
        core::iter::once(self.power_on)
            .chain(self.navigation.iter().copied())
            .chain(self.shutdown.iter().copied())
    }
}
