// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Level bounds for the LevelControl cluster.

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// What to do with a level write outside the device-reported bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelPolicy {
    /// Clamp the value into `[min, max]` and send the command.
    #[default]
    Clamp,
    /// Drop the write without sending a command.
    Reject,
}

/// Inclusive level range reported by a LevelControl cluster.
///
/// # Examples
///
/// ```
/// use matter_state_sync::types::{LevelBounds, LevelPolicy};
///
/// let bounds = LevelBounds::new(1, 254);
/// assert_eq!(bounds.resolve(300.0, LevelPolicy::Clamp).unwrap(), 254);
/// assert!(bounds.resolve(300.0, LevelPolicy::Reject).is_err());
/// assert_eq!(bounds.resolve(99.6, LevelPolicy::Reject).unwrap(), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelBounds {
    min: u8,
    max: u8,
}

impl LevelBounds {
    /// Default minimum level when the device does not report one.
    pub const DEFAULT_MIN: u8 = 1;

    /// Default maximum level when the device does not report one.
    pub const DEFAULT_MAX: u8 = 254;

    /// Creates bounds; swapped arguments are reordered.
    #[must_use]
    pub fn new(min: u8, max: u8) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Returns the minimum level.
    #[must_use]
    pub const fn min(&self) -> u8 {
        self.min
    }

    /// Returns the maximum level.
    #[must_use]
    pub const fn max(&self) -> u8 {
        self.max
    }

    /// Returns `true` if `value` lies within the bounds.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= f64::from(self.min) && value <= f64::from(self.max)
    }

    /// Converts a written value into a command level according to `policy`.
    ///
    /// The value is rounded to the nearest integer before the bounds check.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::LevelOutOfRange`] under [`LevelPolicy::Reject`]
    /// when the rounded value is outside the bounds, or for a non-finite value.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn resolve(&self, value: f64, policy: LevelPolicy) -> Result<u8, ValueError> {
        let out_of_range = || ValueError::LevelOutOfRange {
            min: self.min,
            max: self.max,
            actual: value,
        };

        if !value.is_finite() {
            return Err(out_of_range());
        }

        let rounded = value.round();
        if self.contains(rounded) {
            return Ok(rounded as u8);
        }

        match policy {
            LevelPolicy::Clamp => {
                Ok(rounded.clamp(f64::from(self.min), f64::from(self.max)) as u8)
            }
            LevelPolicy::Reject => Err(out_of_range()),
        }
    }
}

impl Default for LevelBounds {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN, Self::DEFAULT_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swapped_bounds_are_reordered() {
        let bounds = LevelBounds::new(200, 10);
        assert_eq!(bounds.min(), 10);
        assert_eq!(bounds.max(), 200);
    }

    #[test]
    fn clamp_below_min() {
        let bounds = LevelBounds::new(1, 254);
        assert_eq!(bounds.resolve(0.0, LevelPolicy::Clamp).unwrap(), 1);
        assert_eq!(bounds.resolve(-40.0, LevelPolicy::Clamp).unwrap(), 1);
    }

    #[test]
    fn reject_above_max() {
        let bounds = LevelBounds::new(1, 200);
        let err = bounds.resolve(201.0, LevelPolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            ValueError::LevelOutOfRange { min: 1, max: 200, .. }
        ));
    }

    #[test]
    fn in_range_passes_under_both_policies() {
        let bounds = LevelBounds::default();
        assert_eq!(bounds.resolve(128.0, LevelPolicy::Clamp).unwrap(), 128);
        assert_eq!(bounds.resolve(128.0, LevelPolicy::Reject).unwrap(), 128);
    }

    #[test]
    fn nan_is_rejected_even_when_clamping() {
        let bounds = LevelBounds::default();
        assert!(bounds.resolve(f64::NAN, LevelPolicy::Clamp).is_err());
    }

    #[test]
    fn policy_deserializes_lowercase() {
        let policy: LevelPolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(policy, LevelPolicy::Reject);
    }
}
