//! Fixtures shared by unit tests. The extra module kinds reuse The Simpleton's puzzle.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    models::ChannelId,
    module::{kinds, ModuleCatalog, ModuleDescriptor, ModuleOrigin},
    transport::{Outbound, Transport},
};

macro_rules! fixture {
    ($name:ident, $id:literal, $display:literal, $origin:ident) => {
        pub static $name: ModuleDescriptor = ModuleDescriptor {
            identifier: $id,
            aliases: &[],
            display_name: $display,
            origin: ModuleOrigin::$origin,
            factory: kinds::simpleton::new,
        };
    };
}

fixture!(KEYPAD, "keypad", "Keypad", Vanilla);
fixture!(PASSWORD, "password", "Password", Vanilla);
fixture!(MEMORY, "memory", "Memory", Vanilla);
fixture!(SWITCHES, "switches", "Switches", Modded);
fixture!(HEXAMAZE, "hexamaze", "Hexamaze", Modded);

/// Four vanilla and three modded kinds.
pub fn catalog() -> ModuleCatalog {
    ModuleCatalog::builder()
        .register(&kinds::wires::DESCRIPTOR)
        .register(&KEYPAD)
        .register(&PASSWORD)
        .register(&MEMORY)
        .register(&kinds::simpleton::DESCRIPTOR)
        .register(&SWITCHES)
        .register(&HEXAMAZE)
        .build()
        .expect("fixture identifiers are unique")
}

/// Transport that remembers everything it was asked to send.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(ChannelId, Outbound)>>,
}

impl RecordingTransport {
    /// Drain the recorded messages.
    pub fn take(&self) -> Vec<(ChannelId, Outbound)> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Drain the recorded messages, keeping only their text.
    pub fn texts(&self) -> Vec<String> {
        self.take()
            .into_iter()
            .map(|(_, message)| message.text)
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, channel: &ChannelId, message: Outbound) -> anyhow::Result<()> {
        self.sent.lock().push((channel.clone(), message));
        Ok(())
    }
}
