// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node types.

pub mod data;
pub mod flow;
pub mod parameter;

use crate::library::NodeLibrary;

/// Register every built-in node type
pub fn register_builtins(library: &mut NodeLibrary) {
    flow::register(library);
    data::register(library);
    parameter::register(library);
}
