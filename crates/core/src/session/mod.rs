#![allow(missing_docs)]

//! Bomb sessions and the per-channel registry that owns them.

mod bomb;
mod registry;

pub use bomb::{
    format_elapsed, Bomb, BombOptions, BombReply, BombReport, EndReason, SESSION_COMMANDS,
};
pub use registry::{RegistryEvent, Retirement, SessionRegistry, SharedBomb};
