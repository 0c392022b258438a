//! Translation between the Nest vocabulary and the accessory vocabulary.
//!
//! Every function here is total: inputs missing from a table fall through to
//! the table's declared default.

use crate::{
    accessory::{CurrentMode, TargetMode},
    nest::ModeCommand,
};

const TARGET_MODES: &[(&str, TargetMode)] = &[
    ("heat", TargetMode::Heat),
    ("cool", TargetMode::Cool),
    ("off", TargetMode::Off),
];
const TARGET_MODE_DEFAULT: TargetMode = TargetMode::Auto;

const CURRENT_MODES: &[(&str, CurrentMode)] = &[
    ("heating", CurrentMode::Heat),
    ("cooling", CurrentMode::Cool),
];
const CURRENT_MODE_DEFAULT: CurrentMode = CurrentMode::Off;

const MODE_COMMANDS: &[(TargetMode, ModeCommand)] = &[
    (TargetMode::Heat, ModeCommand::Heat),
    (TargetMode::Cool, ModeCommand::Cool),
    (TargetMode::Off, ModeCommand::Off),
];
const MODE_COMMAND_DEFAULT: ModeCommand = ModeCommand::HeatCool;

fn lookup<K: PartialEq + ?Sized, V: Copy>(table: &[(&K, V)], key: &K) -> Option<V> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Requested cloud mode (`hvac_mode`) to accessory target mode.
pub fn target_mode(hvac_mode: &str) -> TargetMode {
    lookup(TARGET_MODES, hvac_mode).unwrap_or(TARGET_MODE_DEFAULT)
}

/// Observed cloud operating state (`hvac_state`) to accessory current mode.
pub fn current_mode(hvac_state: &str) -> CurrentMode {
    lookup(CURRENT_MODES, hvac_state).unwrap_or(CURRENT_MODE_DEFAULT)
}

/// Accessory target mode chosen by a user to the cloud mode command.
pub fn mode_command(mode: TargetMode) -> ModeCommand {
    MODE_COMMANDS
        .iter()
        .find(|(m, _)| *m == mode)
        .map(|(_, c)| *c)
        .unwrap_or(MODE_COMMAND_DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_mode_table() {
        assert_eq!(TargetMode::Heat, target_mode("heat"));
        assert_eq!(TargetMode::Cool, target_mode("cool"));
        assert_eq!(TargetMode::Off, target_mode("off"));
        assert_eq!(TargetMode::Auto, target_mode("heat-cool"));
    }

    #[test]
    fn unknown_hvac_mode_is_auto() {
        assert_eq!(TargetMode::Auto, target_mode("eco"));
        assert_eq!(TargetMode::Auto, target_mode(""));
        assert_eq!(TargetMode::Auto, target_mode("HEAT"));
    }

    #[test]
    fn current_mode_table() {
        assert_eq!(CurrentMode::Heat, current_mode("heating"));
        assert_eq!(CurrentMode::Cool, current_mode("cooling"));
        assert_eq!(CurrentMode::Off, current_mode("off"));
        assert_eq!(CurrentMode::Off, current_mode(""));
        assert_eq!(CurrentMode::Off, current_mode("idle"));
    }

    #[test]
    fn current_mode_follows_state_not_request() {
        // "heat" is a requested mode, not an operating state
        assert_eq!(CurrentMode::Off, current_mode("heat"));
    }

    #[test]
    fn mode_command_table() {
        assert_eq!(ModeCommand::Heat, mode_command(TargetMode::Heat));
        assert_eq!(ModeCommand::Cool, mode_command(TargetMode::Cool));
        assert_eq!(ModeCommand::Off, mode_command(TargetMode::Off));
        assert_eq!(ModeCommand::HeatCool, mode_command(TargetMode::Auto));
    }

    #[test]
    fn outbound_then_inbound() {
        for (hvac_mode, expected) in &[
            ("heat", ModeCommand::Heat),
            ("cool", ModeCommand::Cool),
            ("off", ModeCommand::Off),
            ("eco", ModeCommand::HeatCool),
        ] {
            assert_eq!(*expected, mode_command(target_mode(hvac_mode)));
        }
    }
}
