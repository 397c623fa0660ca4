// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Subscription system for state-store writes.
//!
//! The store delivers every write to the bridge; the bridge routes each
//! write through a [`SubscriptionRegistry`] to the handlers adapters
//! registered for that key.
//!
//! # Overview
//!
//! - [`SubscriptionId`] - A unique identifier for a handler, used to unregister
//! - [`SubscriptionRegistry`] - The shared key → handlers table
//!
//! Adapters never touch the registry directly; they go through
//! [`AdapterBase`](crate::adapter::AdapterBase), which records every
//! registration so teardown can remove exactly what it added.

mod registry;

pub use registry::{StoreHandler, SubscriptionId, SubscriptionRegistry};
