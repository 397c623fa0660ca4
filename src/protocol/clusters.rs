// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cluster and attribute identifiers used by the adapters.

use bitflags::bitflags;

/// Cluster identifier.
pub type ClusterId = u32;

/// Attribute identifier within a cluster.
pub type AttributeId = u32;

/// Global attribute present on every cluster: the feature bitmap.
pub const FEATURE_MAP: AttributeId = 0xFFFC;

/// Identify cluster.
pub mod identify {
    use super::{AttributeId, ClusterId};

    pub const ID: ClusterId = 0x0003;
    pub const IDENTIFY_TIME: AttributeId = 0x0000;
    pub const IDENTIFY_TYPE: AttributeId = 0x0001;

    /// Labels of the `IdentifyType` enum.
    pub const IDENTIFY_TYPES: &[(u8, &str)] = &[
        (0, "None"),
        (1, "LightOutput"),
        (2, "VisibleIndicator"),
        (3, "AudibleBeep"),
        (4, "Display"),
        (5, "Actuator"),
    ];
}

/// On/Off cluster.
pub mod on_off {
    use super::{AttributeId, ClusterId, bitflags};

    pub const ID: ClusterId = 0x0006;
    pub const ON_OFF: AttributeId = 0x0000;

    bitflags! {
        /// On/Off `FeatureMap` bits.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct OnOffFeature: u32 {
            /// The cluster drives a light.
            const LIGHTING = 1 << 0;
            const DEAD_FRONT_BEHAVIOR = 1 << 1;
            const OFF_ONLY = 1 << 2;
        }
    }
}

/// Level Control cluster.
pub mod level_control {
    use super::{AttributeId, ClusterId, bitflags};

    pub const ID: ClusterId = 0x0008;
    pub const CURRENT_LEVEL: AttributeId = 0x0000;
    pub const MIN_LEVEL: AttributeId = 0x0002;
    pub const MAX_LEVEL: AttributeId = 0x0003;

    bitflags! {
        /// Level Control `FeatureMap` bits.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct LevelControlFeature: u32 {
            const ON_OFF = 1 << 0;
            /// The cluster drives a light.
            const LIGHTING = 1 << 1;
            const FREQUENCY = 1 << 2;
        }
    }
}

/// Boolean State cluster.
pub mod boolean_state {
    use super::{AttributeId, ClusterId};

    pub const ID: ClusterId = 0x0045;
    pub const STATE_VALUE: AttributeId = 0x0000;
}

/// Temperature Measurement cluster.
pub mod temperature_measurement {
    use super::{AttributeId, ClusterId};

    pub const ID: ClusterId = 0x0402;
    pub const MEASURED_VALUE: AttributeId = 0x0000;
}

/// Occupancy Sensing cluster.
pub mod occupancy_sensing {
    use super::{AttributeId, ClusterId, bitflags};

    pub const ID: ClusterId = 0x0406;
    pub const OCCUPANCY: AttributeId = 0x0000;

    bitflags! {
        /// The `Occupancy` attribute bitmap.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct Occupancy: u8 {
            const OCCUPIED = 1 << 0;
        }
    }
}
