// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Attribute values as reported by the device protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::StateValue;

/// A decoded cluster attribute value.
///
/// Only the shapes the adapters consume are modelled: booleans, unsigned
/// integers (enums, bitmaps, levels), signed integers (measurements) and
/// strings. Nullable attributes report [`AttributeValue::Null`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Null (attribute is nullable and currently unset).
    #[default]
    Null,
    /// Boolean attribute.
    Bool(bool),
    /// Unsigned integer, enum or bitmap attribute.
    Unsigned(u64),
    /// Signed integer attribute.
    Signed(i64),
    /// Character string attribute.
    Text(String),
}

impl AttributeValue {
    /// Returns the value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as an unsigned integer.
    ///
    /// Non-negative signed values convert as well.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Unsigned(v) => Some(*v),
            Self::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as a signed integer.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Signed(v) => Some(*v),
            Self::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as an unsigned integer of type `T`, if it fits.
    ///
    /// Bitmap attributes are read this way before being turned into their
    /// flag types.
    #[must_use]
    pub fn as_unsigned<T: TryFrom<u64>>(&self) -> Option<T> {
        self.as_u64().and_then(|v| T::try_from(v).ok())
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u8> for AttributeValue {
    fn from(value: u8) -> Self {
        Self::Unsigned(u64::from(value))
    }
}

impl From<u16> for AttributeValue {
    fn from(value: u16) -> Self {
        Self::Unsigned(u64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Unsigned(u64::from(value))
    }
}

impl From<i16> for AttributeValue {
    fn from(value: i16) -> Self {
        Self::Signed(i64::from(value))
    }
}

impl From<AttributeValue> for StateValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Null => Self::Null,
            AttributeValue::Bool(b) => Self::Bool(b),
            AttributeValue::Unsigned(v) => Self::Number(v as f64),
            AttributeValue::Signed(v) => Self::Number(v as f64),
            AttributeValue::Text(s) => Self::Text(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_unsigned_checks_width() {
        let map = AttributeValue::from(0x1FFu32);
        assert_eq!(map.as_unsigned::<u32>(), Some(0x1FF));
        assert_eq!(map.as_unsigned::<u8>(), None);
        assert_eq!(AttributeValue::Signed(-1).as_unsigned::<u32>(), None);
        assert_eq!(AttributeValue::Null.as_unsigned::<u8>(), None);
    }

    #[test]
    fn converts_to_state_value() {
        assert_eq!(StateValue::from(AttributeValue::from(7u8)), StateValue::Number(7.0));
        assert_eq!(StateValue::from(AttributeValue::Null), StateValue::Null);
        assert_eq!(StateValue::from(AttributeValue::Bool(true)), StateValue::Bool(true));
    }

    #[test]
    fn negative_signed_is_not_unsigned() {
        assert_eq!(AttributeValue::Signed(-5).as_u64(), None);
        assert_eq!(AttributeValue::Signed(5).as_u64(), Some(5));
    }
}
