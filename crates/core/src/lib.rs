#![warn(clippy::all, missing_docs)]

//! Core of ktanesim, a chat-driven Keep Talking and Nobody Explodes bomb simulator.
//!
//! This crate hosts the bomb sessions and their modules, the registry of running bombs,
//! command routing, configuration and bomb log export. Frontends only have to feed
//! [`models::Inbound`] messages to a [`Dispatcher`] and deliver what comes out of their
//! [`transport::Transport`].

pub mod config;
pub mod dispatch;
pub mod edgework;
pub mod error;
pub mod export;
pub mod models;
pub mod module;
pub mod random;
pub mod router;
pub mod selection;
pub mod session;
pub mod settings;
pub mod transport;

#[cfg(test)]
mod test_support;

/// Most modules a single bomb may carry.
pub const MAX_MODULES: usize = 101;

pub use config::AppConfig;
pub use dispatch::Dispatcher;
pub use error::{SimError, SimResult};
pub use export::{LogArchive, LogExporter, OpcLogStore};
pub use models::{ChannelId, Inbound, Participant};
pub use module::ModuleCatalog;
pub use router::{Router, RouterOptions};
pub use session::{RegistryEvent, SessionRegistry};
pub use settings::InMemorySettings;
pub use transport::{Attachment, Outbound, Transport};
