// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Value and identifier types shared by both sides of the bridge.
//!
//! - [`StateValue`]: a value held by a state-store leaf
//! - [`AttributeValue`]: a value reported by a device cluster
//! - [`DeviceId`] and [`EndpointPath`]: where an endpoint lives
//! - [`LevelBounds`] and [`LevelPolicy`]: range handling for level writes

mod attribute_value;
mod endpoint_path;
mod level;
mod state_value;

pub use attribute_value::AttributeValue;
pub use endpoint_path::{DeviceId, EndpointPath};
pub use level::{LevelBounds, LevelPolicy};
pub use state_value::StateValue;
