//! Codes and cycle script for the projector this controller drives.
//!
//! The address is a full 16-bit NEC address, so the encoder has to run with
//! extended addressing. Timings are the settle delays the projector menus need
//! between key presses.

use super::{CycleScript, RemoteCatalog, RemoteKey, ScriptStep};

pub const PROJECTOR_REMOTE: RemoteCatalog = RemoteCatalog {
    address: 0xf483,
    power: 0xe817,
    right: 0xf00f,
    down: 0xf30c,
    confirm: 0xea15,
};

/// Power press followed by the lamp warm-up wait.
pub const POWER_ON_STEP: ScriptStep = ScriptStep::new(RemoteKey::Power, 15_000);

/// Menu walk that starts playback from the attached source.
pub const NAVIGATION_STEPS: [ScriptStep; 5] = [
    ScriptStep::new(RemoteKey::Right, 500),
    ScriptStep::new(RemoteKey::Right, 500),
    ScriptStep::new(RemoteKey::Confirm, 2_000),
    ScriptStep::new(RemoteKey::Down, 500),
    ScriptStep::new(RemoteKey::Confirm, 500),
];

/// Power press plus the confirmation press the standby prompt asks for.
pub const SHUTDOWN_STEPS: [ScriptStep; 2] = [
    ScriptStep::new(RemoteKey::Power, 1_000),
    ScriptStep::new(RemoteKey::Power, 500),
];

pub const PROJECTOR_CYCLE: CycleScript = CycleScript {
    power_on: POWER_ON_STEP,
    navigation: &NAVIGATION_STEPS,
    shutdown: &SHUTDOWN_STEPS,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{EncoderConfig, FrameEncoder, IrProtocol};
    use crate::remote::RemoteCommand;

    #[test]
    fn catalog_resolves_projector_codes() {
        assert_eq!(
            PROJECTOR_REMOTE.command(RemoteKey::Power),
            RemoteCommand::new(0xf483, 0xe817)
        );
        assert_eq!(PROJECTOR_REMOTE.command(RemoteKey::Right).command, 0xf00f);
        assert_eq!(PROJECTOR_REMOTE.command(RemoteKey::Down).command, 0xf30c);
        assert_eq!(PROJECTOR_REMOTE.command(RemoteKey::Confirm).command, 0xea15);
    }

    #[test]
    fn cycle_script_emission_order() {
        let keys: heapless::Vec<RemoteKey, 8> =
            PROJECTOR_CYCLE.steps().map(|step| step.key).collect();

        assert_eq!(
            keys.as_slice(),
            &[
                RemoteKey::Power,
                RemoteKey::Right,
                RemoteKey::Right,
                RemoteKey::Confirm,
                RemoteKey::Down,
                RemoteKey::Confirm,
                RemoteKey::Power,
                RemoteKey::Power,
            ]
        );
    }

    #[test]
    fn every_projector_code_encodes_with_extended_nec() {
        let mut encoder = EncoderConfig::new(IrProtocol::Nec, true).build();
        for step in PROJECTOR_CYCLE.steps() {
            let command = PROJECTOR_REMOTE.command(step.key);
            encoder
                .build_initial_frame(command.address, command.command)
                .expect("projector code encodes");
        }
    }
}
