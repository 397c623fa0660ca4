// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cluster commands issued by the write path.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Option bits of the Level Control cluster's `Options` bitmap.
    ///
    /// A command carries two of these: the mask selects which bits the call
    /// overrides, the override gives their values for this call.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct LevelOptions: u8 {
        /// Execute the command even when the device is off.
        const EXECUTE_IF_OFF = 0b01;
        /// Couple color temperature changes to level changes.
        const COUPLE_COLOR_TEMP_TO_LEVEL = 0b10;
    }
}

/// A command invocation on a cluster.
///
/// # Examples
///
/// ```
/// use matter_state_sync::protocol::ClusterCommand;
///
/// let cmd = ClusterCommand::Identify { identify_time: 10 };
/// assert_eq!(cmd.name(), "identify");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum ClusterCommand {
    /// Identify: start identifying for the given number of seconds.
    #[serde(rename_all = "camelCase")]
    Identify {
        /// Duration in seconds.
        identify_time: u16,
    },
    /// On/Off: switch on.
    On,
    /// On/Off: switch off.
    Off,
    /// On/Off: toggle.
    Toggle,
    /// Level Control: move to a level.
    #[serde(rename_all = "camelCase")]
    MoveToLevel {
        /// Target level.
        level: u8,
        /// Transition time in tenths of a second.
        transition_time: u16,
        /// Option bits overridden by this call.
        options_mask: LevelOptions,
        /// Values of the overridden option bits.
        options_override: LevelOptions,
    },
}

impl ClusterCommand {
    /// Returns the protocol name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identify { .. } => "identify",
            Self::On => "on",
            Self::Off => "off",
            Self::Toggle => "toggle",
            Self::MoveToLevel { .. } => "moveToLevel",
        }
    }
}

impl fmt::Display for ClusterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_command_tag() {
        let json = serde_json::to_value(ClusterCommand::MoveToLevel {
            level: 10,
            transition_time: 0,
            options_mask: LevelOptions::all(),
            options_override: LevelOptions::EXECUTE_IF_OFF,
        })
        .unwrap();

        assert_eq!(json["command"], "moveToLevel");
        assert_eq!(json["transitionTime"], 0);
        assert_eq!(json["optionsMask"], "EXECUTE_IF_OFF | COUPLE_COLOR_TEMP_TO_LEVEL");
        assert_eq!(json["optionsOverride"], "EXECUTE_IF_OFF");
    }

    #[test]
    fn level_options_bits_match_cluster_bitmap() {
        let both = LevelOptions::EXECUTE_IF_OFF | LevelOptions::COUPLE_COLOR_TEMP_TO_LEVEL;
        assert_eq!(both.bits(), 0b11);
        assert_eq!(LevelOptions::from_bits_truncate(0xF1), LevelOptions::EXECUTE_IF_OFF);
        assert!(!LevelOptions::empty().contains(LevelOptions::EXECUTE_IF_OFF));
    }

    #[test]
    fn level_options_deserialize_from_flag_names() {
        let options: LevelOptions = serde_json::from_str("\"COUPLE_COLOR_TEMP_TO_LEVEL\"").unwrap();
        assert_eq!(options, LevelOptions::COUPLE_COLOR_TEMP_TO_LEVEL);
    }
}
