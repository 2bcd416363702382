use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    config::ListLimits,
    edgework::Edgework,
    error::{Conflict, SimResult, UsageError},
    models::{ChannelId, Participant},
    module::{Module, ModuleDescriptor, ModuleEnv, ModuleEvent, ModuleOutcome},
    random::RandomSource,
    settings::{BombSettings, Mode},
};

/// Keywords handled by a running bomb.
pub const SESSION_COMMANDS: [&str; 10] = [
    "edgework",
    "status",
    "unclaimed",
    "modules",
    "find",
    "claims",
    "claimany",
    "claimanyview",
    "cvany",
    "detonate",
];

/// How a bomb ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Detonated,
    Defused,
}

/// Messages for the channel, and whether the bomb just ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BombReply {
    pub messages: Vec<String>,
    pub end: Option<EndReason>,
}

impl BombReply {
    fn say(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
            end: None,
        }
    }
}

/// Everything worth keeping once a bomb is gone.
#[derive(Debug, Clone)]
pub struct BombReport {
    pub reason: EndReason,
    pub summary: String,
    pub log: String,
    pub elapsed: Duration,
    pub strikes: u32,
}

/// Per-bomb knobs taken from the application configuration.
#[derive(Debug, Clone)]
pub struct BombOptions {
    pub prefix: String,
    pub limits: ListLimits,
}

impl Default for BombOptions {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            limits: ListLimits::default(),
        }
    }
}

/// `H:MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60
    )
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

/// A live session: edgework, modules and the strike counter of one channel.
pub struct Bomb {
    channel: ChannelId,
    created_at: DateTime<Utc>,
    started: Instant,
    finished: Option<(EndReason, Duration)>,
    strikes: u32,
    edgework: Edgework,
    modules: Vec<Module>,
    settings: BombSettings,
    options: BombOptions,
    rng: RandomSource,
}

impl Bomb {
    /// Arm a bomb. `modules` is already in its final order; module `i` gets index `i + 1`.
    pub fn new(
        channel: ChannelId,
        modules: Vec<&'static ModuleDescriptor>,
        settings: BombSettings,
        options: BombOptions,
        mut rng: RandomSource,
    ) -> Self {
        let edgework = Edgework::generate(&mut rng);
        let modules = modules
            .into_iter()
            .enumerate()
            .map(|(i, descriptor)| Module::new(i + 1, descriptor, &mut rng, &edgework))
            .collect();
        Self {
            channel,
            created_at: Utc::now(),
            started: Instant::now(),
            finished: None,
            strikes: 0,
            edgework,
            modules,
            settings,
            options,
            rng,
        }
    }

    /// Channel the bomb ticks in.
    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn edgework(&self) -> &Edgework {
        &self.edgework
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn settings(&self) -> BombSettings {
        self.settings
    }

    /// Strikes so far; never decreases.
    pub fn strikes(&self) -> u32 {
        self.strikes
    }

    pub fn solved_count(&self) -> usize {
        self.modules.iter().filter(|m| m.is_solved()).count()
    }

    pub fn is_terminated(&self) -> bool {
        self.finished.is_some()
    }

    /// Time on the clock; frozen once the bomb ends.
    pub fn elapsed(&self) -> Duration {
        self.finished
            .map(|(_, elapsed)| elapsed)
            .unwrap_or_else(|| self.started.elapsed())
    }

    /// Announcement sent when the bomb is created.
    pub fn armed_message(&self) -> String {
        format!(
            "A bomb with {} has been armed!\nEdgework: `{}`",
            plural(self.modules.len(), "module", "modules"),
            self.edgework
        )
    }

    /// One line for the `bombs` listing.
    pub fn progress(&self) -> String {
        format!(
            "{} out of {} modules solved after {} and {} in {}",
            self.solved_count(),
            self.modules.len(),
            format_elapsed(self.elapsed()),
            plural(self.strikes as usize, "strike", "strikes"),
            self.channel
        )
    }

    /// Handle a session keyword or a numbered module command.
    ///
    /// Unknown non-numeric commands are ignored.
    pub fn handle_command(
        &mut self,
        author: &Participant,
        command: &str,
        args: &[String],
    ) -> SimResult<BombReply> {
        if self.is_terminated() {
            return Ok(BombReply::default());
        }
        let no_args = || {
            if args.is_empty() {
                Ok(())
            } else {
                Err(UsageError::TrailingArguments)
            }
        };
        let mention = author.mention();

        match command {
            "edgework" => {
                no_args()?;
                Ok(BombReply::say(format!(
                    "{mention} Edgework: `{}`",
                    self.edgework
                )))
            }
            "status" => {
                no_args()?;
                Ok(BombReply::say(self.status()))
            }
            "unclaimed" => {
                no_args()?;
                Ok(BombReply::say(self.unclaimed_listing()))
            }
            "modules" => {
                no_args()?;
                Ok(BombReply::say(self.claimed_listing()))
            }
            "find" => self.find(author, args).map(BombReply::say),
            "claims" => {
                no_args()?;
                Ok(BombReply::say(self.claims(author)))
            }
            "claimany" => self.on_random_unclaimed(author, "claim", args),
            "claimanyview" | "cvany" => self.on_random_unclaimed(author, "claimview", args),
            "detonate" => Ok(BombReply {
                messages: Vec::new(),
                end: Some(EndReason::Detonated),
            }),
            _ if !command.is_empty() && command.chars().all(|c| c.is_ascii_digit()) => {
                self.module_command(author, command, args)
            }
            _ => Ok(BombReply::default()),
        }
    }

    fn module_command(
        &mut self,
        author: &Participant,
        index: &str,
        args: &[String],
    ) -> SimResult<BombReply> {
        let count = self.modules.len();
        let index = index
            .parse::<usize>()
            .ok()
            .filter(|index| (1..=count).contains(index))
            .ok_or(UsageError::OutOfRange {
                index: index.parse().unwrap_or(usize::MAX),
                count,
            })?;
        let Some((subcommand, rest)) = args.split_first() else {
            return Err(UsageError::MissingSubcommand { index }.into());
        };
        self.run_module_command(author, index, &subcommand.to_lowercase(), rest)
    }

    fn run_module_command(
        &mut self,
        author: &Participant,
        index: usize,
        command: &str,
        args: &[String],
    ) -> SimResult<BombReply> {
        let env = ModuleEnv {
            prefix: &self.options.prefix,
            edgework: &self.edgework,
        };
        let outcome = self.modules[index - 1].handle_command(&env, author, command, args)?;
        Ok(self.apply(outcome))
    }

    fn apply(&mut self, outcome: ModuleOutcome) -> BombReply {
        let mut end = None;
        match outcome.event {
            ModuleEvent::None => {}
            ModuleEvent::Strike => {
                self.strikes += 1;
                info!(channel = %self.channel, strikes = self.strikes, "Strike");
            }
            ModuleEvent::Solved => {
                if self.modules.iter().all(Module::is_solved) {
                    end = Some(EndReason::Defused);
                }
            }
        }
        BombReply {
            messages: outcome.messages,
            end,
        }
    }

    fn status(&self) -> String {
        let clock = match self.settings.mode {
            Mode::Zen => "Zen mode on, time",
            Mode::Normal => "Time",
        };
        format!(
            "{clock}: {}, {}, {} out of {} modules solved.",
            format_elapsed(self.elapsed()),
            plural(self.strikes as usize, "strike", "strikes"),
            self.solved_count(),
            self.modules.len()
        )
    }

    /// Random sample of at most `cap` entries, kept in module order.
    fn capped(&mut self, mut indices: Vec<usize>, cap: usize) -> (Vec<usize>, bool) {
        if indices.len() <= cap {
            return (indices, false);
        }
        indices = self.rng.sample(&indices, cap);
        indices.sort_unstable();
        (indices, true)
    }

    fn unclaimed_indices(&self) -> Vec<usize> {
        self.modules
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_solved() && m.claimant().is_none())
            .map(|(i, _)| i)
            .collect()
    }

    fn unclaimed_listing(&mut self) -> String {
        let unclaimed = self.unclaimed_indices();
        if unclaimed.is_empty() {
            return "There are no unclaimed modules.".to_string();
        }
        let cap = self.options.limits.unclaimed;
        let (shown, truncated) = self.capped(unclaimed, cap);
        let mut reply = if truncated {
            format!("{cap} randomly chosen unclaimed modules:")
        } else {
            "Unclaimed modules:".to_string()
        };
        for i in shown {
            let module = &self.modules[i];
            reply.push_str(&format!("\n#{}: {}", module.index(), module.display_name()));
        }
        reply
    }

    fn claimed_listing(&mut self) -> String {
        let claimed: Vec<usize> = self
            .modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.claimant().is_some())
            .map(|(i, _)| i)
            .collect();
        if claimed.is_empty() {
            return self.unclaimed_listing();
        }
        let (shown, _) = self.capped(claimed, self.options.limits.claimed);
        let mut reply = format!(
            "Here are the modules that have currently been claimed by someone. Check `{}unclaimed` for unclaimed modules:",
            self.options.prefix
        );
        for i in shown {
            let module = &self.modules[i];
            if let Some(holder) = module.claimant() {
                reply.push_str(&format!("\n{module} - claimed by {holder}"));
            }
        }
        reply
    }

    fn find(&mut self, author: &Participant, args: &[String]) -> SimResult<String> {
        if args.is_empty() {
            return Err(UsageError::MissingSearchTerm.into());
        }
        let mention = author.mention();
        let needle = args.join(" ").to_lowercase();
        let mut found: Vec<usize> = self
            .modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.display_name().to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        if found.is_empty() {
            return Ok(format!("{mention} Sorry, I couldn't find anything."));
        }

        let cap = self.options.limits.found;
        let mut truncated = false;
        if found.len() > cap {
            found.retain(|&i| !self.modules[i].is_solved());
            (found, truncated) = self.capped(found, cap);
        }

        let lines: Vec<String> = found
            .iter()
            .map(|&i| {
                let module = &self.modules[i];
                format!("{module} - {}", module.status())
            })
            .collect();
        Ok(match lines.as_slice() {
            [only] => format!("{mention} I could only find {only}"),
            _ if truncated => format!(
                "{mention} I've found a lot, so here are {cap} randomly chosen modules:\n{}",
                lines.join("\n")
            ),
            _ => format!("{mention} Here's what I could find:\n{}", lines.join("\n")),
        })
    }

    fn claims(&self, author: &Participant) -> String {
        let mention = author.mention();
        let claims: Vec<String> = self
            .modules
            .iter()
            .filter(|m| m.claimant() == Some(author))
            .map(ToString::to_string)
            .collect();
        match claims.as_slice() {
            [] => format!("{mention} You have not claimed any modules."),
            [only] => format!("{mention} You have only claimed {only}."),
            [init @ .., last] => format!(
                "{mention} You have claimed {} and {last}.",
                init.join(", ")
            ),
        }
    }

    fn on_random_unclaimed(
        &mut self,
        author: &Participant,
        command: &str,
        args: &[String],
    ) -> SimResult<BombReply> {
        let unclaimed = self.unclaimed_indices();
        let Some(&i) = self.rng.pick(&unclaimed) else {
            return Err(Conflict::NoUnclaimed.into());
        };
        self.run_module_command(author, i + 1, command, args)
    }

    /// Stop the clock and assemble the summary and the full log. Idempotent.
    pub fn terminate(&mut self, reason: EndReason) -> BombReport {
        let (reason, elapsed) = *self
            .finished
            .get_or_insert_with(|| (reason, self.started.elapsed()));
        let strike_text = plural(self.strikes as usize, "strike", "strikes");
        let summary = match reason {
            EndReason::Detonated => format!(
                ":boom: The bomb has been **detonated** after {} and {strike_text}.",
                format_elapsed(elapsed)
            ),
            EndReason::Defused => format!(
                "The bomb has been defused after {} and {strike_text}.",
                format_elapsed(elapsed)
            ),
        };
        BombReport {
            reason,
            summary,
            log: self.log(),
            elapsed,
            strikes: self.strikes,
        }
    }

    /// Edgework followed by every module log, separated by blank lines.
    pub fn log(&self) -> String {
        std::iter::once(format!("Edgework: {}", self.edgework))
            .chain(self.modules.iter().map(|m| m.log().to_string()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
