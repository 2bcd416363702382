//! Module kinds shipped with the standard catalog.

pub mod simpleton;
pub mod wires;
