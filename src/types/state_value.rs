// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Values held by state-store leaves.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// A typed value stored in a state-store leaf.
///
/// Serializes untagged, so a leaf value looks the same on the wire as it
/// does in the store (`true`, `42.5`, `"text"`, `null`).
///
/// # Examples
///
/// ```
/// use matter_state_sync::types::StateValue;
///
/// let on = StateValue::from(true);
/// assert_eq!(on.as_bool(), Some(true));
///
/// let level = StateValue::from(128u8);
/// assert_eq!(level.as_f64(), Some(128.0));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// No value.
    #[default]
    Null,
    /// A boolean value.
    Bool(bool),
    /// A numeric value.
    Number(f64),
    /// A string value.
    Text(String),
}

impl StateValue {
    /// Returns `true` if this is [`StateValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the boolean value, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the numeric value, if this is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean value or a [`ValueError::TypeMismatch`].
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a boolean.
    pub fn expect_bool(&self) -> Result<bool, ValueError> {
        self.as_bool().ok_or_else(|| ValueError::TypeMismatch {
            expected: "boolean",
            actual: self.to_string(),
        })
    }

    /// Returns the numeric value or a [`ValueError::TypeMismatch`].
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a number.
    pub fn expect_f64(&self) -> Result<f64, ValueError> {
        self.as_f64().ok_or_else(|| ValueError::TypeMismatch {
            expected: "number",
            actual: self.to_string(),
        })
    }
}

impl fmt::Display for StateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<bool> for StateValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for StateValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u8> for StateValue {
    fn from(value: u8) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u16> for StateValue {
    fn from(value: u16) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for StateValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for StateValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_untagged() {
        assert_eq!(serde_json::to_string(&StateValue::Bool(true)).unwrap(), "true");
        assert_eq!(serde_json::to_string(&StateValue::Number(1.5)).unwrap(), "1.5");
        assert_eq!(serde_json::to_string(&StateValue::Null).unwrap(), "null");
    }

    #[test]
    fn deserializes_untagged() {
        let value: StateValue = serde_json::from_str("\"on\"").unwrap();
        assert_eq!(value, StateValue::Text("on".to_string()));

        let value: StateValue = serde_json::from_str("12").unwrap();
        assert_eq!(value, StateValue::Number(12.0));
    }

    #[test]
    fn expect_bool_rejects_number() {
        let err = StateValue::Number(1.0).expect_bool().unwrap_err();
        assert_eq!(err.to_string(), "expected boolean value, got 1");
    }

    #[test]
    fn display_quotes_text() {
        assert_eq!(StateValue::from("x").to_string(), "\"x\"");
    }
}
