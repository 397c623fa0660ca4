// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the synchronization layer.
//!
//! Errors are grouped by the side of the bridge they come from: the state
//! store, the device protocol, or value validation. None of them is fatal
//! for the bridge as a whole; the worst outcome of any single failure is
//! that one adapter stops syncing until it is reconstructed.
//!
//! "This endpoint has no such cluster" is deliberately *not* an error:
//! probes return `Ok(None)` for it.

use thiserror::Error;

/// The main error type for this library.
#[derive(Debug, Error)]
pub enum Error {
    /// The state store rejected or failed an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The device protocol failed a read, command, or listener operation.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A value could not be converted or was outside its allowed range.
    #[error("value error: {0}")]
    Value(#[from] ValueError),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[source] serde_json::Error),

    /// No session exists for the device.
    #[error("device not found")]
    DeviceNotFound,

    /// The device session has already shut down.
    #[error("device session closed")]
    SessionClosed,
}

/// Errors raised by a [`StateStore`](crate::store::StateStore).
///
/// These are treated as transient: they abort the construction of the
/// adapter that hit them and nothing else.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused to create or update an object.
    #[error("object {key} rejected: {reason}")]
    ObjectRejected {
        /// Key of the rejected object.
        key: String,
        /// Reason given by the store.
        reason: String,
    },

    /// An object definition could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by a [`ClusterClient`](crate::protocol::ClusterClient).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The device did not answer.
    #[error("device unreachable: {0}")]
    Unreachable(String),

    /// The device answered a command with a failure status.
    #[error("command {command} failed: {reason}")]
    CommandFailed {
        /// Name of the command that failed.
        command: String,
        /// Failure detail reported by the device.
        reason: String,
    },

    /// The cluster does not expose the requested attribute.
    #[error("cluster 0x{cluster:04x} has no attribute 0x{attribute:04x}")]
    UnsupportedAttribute {
        /// Cluster identifier.
        cluster: u32,
        /// Attribute identifier.
        attribute: u32,
    },

    /// The listener to remove is not registered (already removed).
    #[error("attribute listener {0} not registered")]
    ListenerNotFound(u64),
}

/// Errors related to value conversion and constraints.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    /// A level value is outside the device-reported bounds.
    #[error("level {actual} is out of range [{min}, {max}]")]
    LevelOutOfRange {
        /// Minimum level reported by the device.
        min: u8,
        /// Maximum level reported by the device.
        max: u8,
        /// The value that was written.
        actual: f64,
    },

    /// A value did not have the type a leaf expects.
    #[error("expected {expected} value, got {actual}")]
    TypeMismatch {
        /// The expected value type.
        expected: &'static str,
        /// Description of the value received.
        actual: String,
    },

    /// A device id was empty.
    #[error("device id must not be empty")]
    EmptyDeviceId,
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_out_of_range_display() {
        let err = ValueError::LevelOutOfRange {
            min: 1,
            max: 254,
            actual: 300.0,
        };
        assert_eq!(err.to_string(), "level 300 is out of range [1, 254]");
    }

    #[test]
    fn error_from_store_error() {
        let err: Error = StoreError::Unavailable("offline".to_string()).into();
        assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
    }

    #[test]
    fn unsupported_attribute_display() {
        let err = ProtocolError::UnsupportedAttribute {
            cluster: 0x0008,
            attribute: 0x0002,
        };
        assert_eq!(
            err.to_string(),
            "cluster 0x0008 has no attribute 0x0002"
        );
    }

    #[test]
    fn command_failed_display() {
        let err = ProtocolError::CommandFailed {
            command: "on".to_string(),
            reason: "busy".to_string(),
        };
        assert_eq!(err.to_string(), "command on failed: busy");
    }
}
