//! Line-oriented console frontend.
//!
//! Every stdin line is `<channel> <author>[:<name>] <message>`; replies are printed to
//! stdout prefixed with their channel.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};
use tracing::{debug, info, warn};

use ktanesim_core::{
    transport::{Outbound, Transport},
    ChannelId, Dispatcher, Inbound, Participant, RegistryEvent, SessionRegistry,
};

/// Prints outbound messages to stdout.
pub struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send(&self, channel: &ChannelId, message: Outbound) -> Result<()> {
        let stamp = Local::now().format("%H:%M:%S");
        for line in message.text.lines() {
            println!("{stamp} [{}] {line}", channel.as_str());
        }
        if let Some(attachment) = message.attachment {
            println!(
                "{stamp} [{}] (attachment: {} at {})",
                channel.as_str(),
                attachment.filename,
                attachment.path.display()
            );
        }
        Ok(())
    }
}

/// Split a console line into an inbound message.
pub fn parse_line(line: &str) -> Option<Inbound> {
    let line = line.trim();
    let (channel, rest) = line.split_once(char::is_whitespace)?;
    let (author, text) = rest.trim_start().split_once(char::is_whitespace)?;
    let author = match author.split_once(':') {
        Some((id, name)) if !id.is_empty() && !name.is_empty() => Participant::new(id, name),
        _ => Participant::new(author, author),
    };
    Some(Inbound::new(
        ChannelId::new(channel),
        author,
        text.trim_start(),
    ))
}

pub struct ConsoleApp {
    dispatcher: Dispatcher,
    registry: SessionRegistry,
}

impl ConsoleApp {
    pub fn new(dispatcher: Dispatcher, registry: SessionRegistry) -> Self {
        Self {
            dispatcher,
            registry,
        }
    }

    /// Read stdin until EOF or until a shutdown has drained every bomb.
    pub async fn run(self) -> Result<()> {
        let mut lines = BufReader::new(io::stdin()).lines();
        let mut events = self.registry.subscribe();
        let mut drained = false;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line.context("failed to read stdin")? {
                        Some(line) => self.process_line(&line),
                        None => {
                            info!("Input closed");
                            break;
                        }
                    }
                }
                event = events.recv() => {
                    match event {
                        Ok(RegistryEvent::Drained) => {
                            drained = true;
                            break;
                        }
                        Ok(event) => debug!(?event, "Registry event"),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Registry events dropped");
                            if self.registry.is_drained() {
                                drained = true;
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }

        self.dispatcher.close().await;
        if drained {
            println!("Shutdown complete.");
        }
        Ok(())
    }

    fn process_line(&self, line: &str) {
        match parse_line(line) {
            Some(inbound) => self.dispatcher.submit(inbound),
            None if line.trim().is_empty() => {}
            None => warn!(%line, "Expected `<channel> <author> <message>`"),
        }
    }
}
