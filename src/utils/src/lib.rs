// SPDX-License-Identifier: Apache-2.0

#![deny(missing_docs)]

//! Small helpers shared by every crate in the bridge workspace.

pub mod backoff;
pub mod ids;
pub mod time;
