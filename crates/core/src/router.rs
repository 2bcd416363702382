#![allow(missing_docs)]

//! Inbound text to actions: tokenizing, generic commands and session commands.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    config::{AppConfig, ListLimits},
    error::{Conflict, SimError, SimResult, UsageError},
    export::LogExporter,
    models::{ChannelId, Inbound, Participant},
    module::ModuleCatalog,
    random::RandomSource,
    selection,
    session::{Bomb, BombOptions, BombReport, SessionRegistry, SESSION_COMMANDS},
    settings::{settings_command, SettingsProvider},
    transport::{Outbound, Transport},
};

const APOLOGY: &str = "An unidentified ~~flying object~~ error has occured during handling of this command. Please get the log for this bomb to one of our code monkeys, along with a description of what you did to cause this";

const SHUTDOWN_NOTICE: &str = "The bot is going into shutdown mode. No new bombs can be started and the bot will go offline when all currently running bombs are solved or detonated.";

/// Split a message into a lower-cased command and its arguments.
///
/// Returns `None` for messages without the prefix or without a command. Backticks and
/// typographic apostrophes become plain `'`.
pub fn tokenize(text: &str, prefix: &str) -> Option<(String, Vec<String>)> {
    let rest = text.strip_prefix(prefix)?;
    let normalized: String = rest
        .chars()
        .map(|c| match c {
            '`' | '\u{2018}' | '\u{2019}' | '\u{2032}' => '\'',
            other => other,
        })
        .collect();
    let mut parts = normalized.split_whitespace().map(str::to_string);
    let command = parts.next()?.to_lowercase();
    Some((command, parts.collect()))
}

fn is_module_number(command: &str) -> bool {
    !command.is_empty() && command.chars().all(|c| c.is_ascii_digit())
}

/// Router knobs taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub prefix: String,
    pub owner_id: Option<String>,
    pub limits: ListLimits,
    pub seed: Option<u64>,
}

impl From<&AppConfig> for RouterOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            owner_id: config.owner_id.clone(),
            limits: config.lists,
            seed: config.seed,
        }
    }
}

/// Routes inbound messages to the registry and the running bombs.
pub struct Router {
    options: RouterOptions,
    catalog: Arc<ModuleCatalog>,
    registry: SessionRegistry,
    settings: Arc<dyn SettingsProvider>,
    exporter: Arc<LogExporter>,
    transport: Arc<dyn Transport>,
    rng: Mutex<RandomSource>,
}

impl Router {
    pub fn new(
        options: RouterOptions,
        catalog: Arc<ModuleCatalog>,
        registry: SessionRegistry,
        settings: Arc<dyn SettingsProvider>,
        exporter: Arc<LogExporter>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let rng = Mutex::new(RandomSource::from_optional_seed(options.seed));
        Self {
            options,
            catalog,
            registry,
            settings,
            exporter,
            transport,
            rng,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn prefix(&self) -> &str {
        &self.options.prefix
    }

    /// Handle one inbound message. Errors are answered in the channel, never returned.
    pub async fn handle(&self, inbound: Inbound) {
        let Some((command, args)) = tokenize(&inbound.text, &self.options.prefix) else {
            return;
        };
        debug!(channel = %inbound.channel, author = %inbound.author.id, %command, "Command received");

        if let Err(err) = self.dispatch(&inbound.channel, &inbound.author, &command, &args).await {
            self.report(&inbound, err).await;
        }
    }

    /// Tell the issuer something went wrong on our side.
    pub async fn report_fault(&self, inbound: &Inbound, err: anyhow::Error) {
        self.report(inbound, SimError::Internal(err)).await;
    }

    async fn report(&self, inbound: &Inbound, err: SimError) {
        let mention = inbound.author.mention();
        let text = if err.is_fault() {
            error!(channel = %inbound.channel, text = %inbound.text, ?err, "Command failed");
            format!("{mention} {APOLOGY}")
        } else {
            format!("{mention} {err}")
        };
        self.say(&inbound.channel, text).await;
    }

    async fn send(&self, channel: &ChannelId, message: Outbound) {
        if let Err(err) = self.transport.send(channel, message).await {
            warn!(channel = %channel, ?err, "Failed to deliver message");
        }
    }

    async fn say(&self, channel: &ChannelId, text: impl Into<String>) {
        self.send(channel, Outbound::text(text)).await;
    }

    async fn dispatch(
        &self,
        channel: &ChannelId,
        author: &Participant,
        command: &str,
        args: &[String],
    ) -> SimResult<()> {
        match command {
            "run" => self.run(channel, args).await,
            "bombs" => self.bombs(channel, author, args).await,
            "allbombs" => {
                self.say(channel, self.registry.len().to_string()).await;
                Ok(())
            }
            "shutdown" => self.shutdown(channel, author, args).await,
            "help" => {
                self.say(channel, self.help()).await;
                Ok(())
            }
            "settings" => {
                let reply =
                    settings_command(&*self.settings, channel, args, &self.options.prefix)?;
                self.say(channel, reply).await;
                Ok(())
            }
            "modules" if self.registry.lookup(channel).is_none() => {
                self.say(channel, self.catalog.listing()).await;
                Ok(())
            }
            _ if SESSION_COMMANDS.contains(&command) || is_module_number(command) => {
                self.session_command(channel, author, command, args).await
            }
            _ => Ok(()),
        }
    }

    async fn run(&self, channel: &ChannelId, args: &[String]) -> SimResult<()> {
        self.registry.ensure_can_start(channel)?;
        let request = selection::parse_run_args(args, &self.catalog, &self.options.prefix)?;
        let mut rng = self.rng.lock().fork();
        let modules = selection::select(&request, &self.catalog, &mut rng)?;
        let module_count = modules.len();

        let bomb = Bomb::new(
            channel.clone(),
            modules,
            self.settings.get(channel),
            BombOptions {
                prefix: self.options.prefix.clone(),
                limits: self.options.limits,
            },
            rng,
        );
        let armed = bomb.armed_message();
        self.registry.start(bomb)?;
        info!(channel = %channel, modules = module_count, "Bomb armed");
        self.say(channel, armed).await;
        Ok(())
    }

    async fn bombs(
        &self,
        channel: &ChannelId,
        author: &Participant,
        args: &[String],
    ) -> SimResult<()> {
        if !args.is_empty() {
            return Err(UsageError::TrailingArguments.into());
        }
        let sessions = self.registry.sessions();
        let mention = author.mention();
        if sessions.is_empty() {
            self.say(channel, format!("{mention} No bombs are running."))
                .await;
            return Ok(());
        }
        let mut reply = format!("{mention} Currently running bombs:");
        for (_, bomb) in sessions {
            reply.push_str(&format!("\n- {}", bomb.lock().await.progress()));
        }
        self.say(channel, reply).await;
        Ok(())
    }

    async fn shutdown(
        &self,
        channel: &ChannelId,
        author: &Participant,
        args: &[String],
    ) -> SimResult<()> {
        if !args.is_empty() {
            return Err(UsageError::TrailingArguments.into());
        }
        if self.options.owner_id.as_deref() != Some(author.id.as_str()) {
            return Err(UsageError::NotPermitted.into());
        }

        let remaining = self.registry.enter_drain_mode();
        for bomb_channel in &remaining {
            self.say(bomb_channel, SHUTDOWN_NOTICE).await;
        }
        if remaining.is_empty() {
            self.say(channel, "***oof***").await;
        } else {
            self.say(channel, format!("{} Shutdown mode activated", author.mention()))
                .await;
        }
        Ok(())
    }

    async fn session_command(
        &self,
        channel: &ChannelId,
        author: &Participant,
        command: &str,
        args: &[String],
    ) -> SimResult<()> {
        let Some(bomb) = self.registry.lookup(channel) else {
            return Err(Conflict::NoBomb {
                prefix: self.options.prefix.clone(),
            }
            .into());
        };

        let (messages, report) = {
            let mut bomb = bomb.lock().await;
            let reply = bomb.handle_command(author, command, args)?;
            let report = reply.end.map(|reason| bomb.terminate(reason));
            (reply.messages, report)
        };

        for message in messages {
            self.say(channel, message).await;
        }
        if let Some(report) = report {
            self.finish(channel, report).await;
        }
        Ok(())
    }

    /// Deregister first, then announce and export; the bomb counts as live for
    /// shutdown purposes until the export is done.
    async fn finish(&self, channel: &ChannelId, report: BombReport) {
        let retirement = self.registry.end(channel);
        info!(
            channel = %channel,
            reason = ?report.reason,
            strikes = report.strikes,
            elapsed_secs = report.elapsed.as_secs(),
            "Bomb ended"
        );
        self.say(channel, report.summary).await;

        let outcome = self.exporter.export(&report.log).await;
        let message = match outcome.attachment {
            Some(attachment) => Outbound::with_attachment(outcome.text, attachment),
            None => Outbound::text(outcome.text),
        };
        self.send(channel, message).await;
        drop(retirement);
    }

    fn help(&self) -> String {
        let p = &self.options.prefix;
        let unclaimed = self.options.limits.unclaimed;
        format!(
            "This bot simulates Keep Talking and Nobody Explodes bombs. Collaborate with others in a channel to defuse them.\n\
             `{p}help`: Show this message\n\
             `{p}bombs`: List the currently running bombs.\n\
             `{p}allbombs`: Show how many bombs are running.\n\
             `{p}run ...`: Start a bomb. Pass no parameters for usage.\n\
             `{p}modules`: When a bomb is running, show the claimed modules. When a bomb is not running, show a list of implemented modules.\n\
             `{p}unclaimed`: Shows {unclaimed} random unclaimed modules from the bomb.\n\
             `{p}find ...`: List all modules on the bomb with `...` in their name.\n\
             `{p}edgework`: Show the edgework string of the bomb.\n\
             `{p}status`: Show the bomb status.\n\
             `{p}<module number> view`: Show the module.\n\
             `{p}<module number> claim`: Claim the module so that only you can give it commands.\n\
             `{p}<module number> unclaim`: Undo a `claim` command.\n\
             `{p}<module number> claimview`, alias `... cv`: `claim` and `view` combined.\n\
             `{p}<module number> player`: Show the player who claimed the module.\n\
             `{p}<module number> take`: If you think someone has abandoned the module, use this command to take it over.\n\
             `{p}<module number> help`: Show the commands of the module.\n\
             `{p}claimany`: Claim a randomly chosen unclaimed module.\n\
             `{p}claimanyview`, alias `{p}cvany`: `{p}claimany` and `view` combined.\n\
             `{p}claims`: Show the list of modules you have claimed.\n\
             `{p}detonate`: If other players agree, detonate the bomb.\n\
             `{p}settings`: Shows information about bomb settings."
        )
    }
}
