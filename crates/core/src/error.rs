#![allow(missing_docs)]

//! Error taxonomy for command handling.
//!
//! The `Display` form of every user-facing variant is the sentence sent back to the
//! issuing participant, so keep them phrased for chat.

use thiserror::Error;

use crate::{settings::SettingsError, MAX_MODULES};

/// Malformed command. Answered with a hint, never logged as a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("Trailing arguments.")]
    TrailingArguments,
    #[error("Double check the module number - {}", module_count_phrase(.count))]
    OutOfRange { index: usize, count: usize },
    #[error("What should I do with module {index}? You need to give me a command!")]
    MissingSubcommand { index: usize },
    #[error("{module} doesn't understand `{command}`. Try `{module_prefix} help`.")]
    UnknownCommand {
        module: String,
        module_prefix: String,
        command: String,
    },
    #[error("A negative module count?! What does that mean? Antimatter?")]
    NegativeCount,
    #[error("What should I look for?")]
    MissingSearchTerm,
    #[error("You don't have permission to use this command.")]
    NotPermitted,
    #[error("{0}")]
    Hint(String),
}

fn module_count_phrase(count: &usize) -> String {
    if *count == 1 {
        "there is only 1 module on this bomb!".to_string()
    } else {
        format!("there are only {count} modules on this bomb!")
    }
}

/// The command is well-formed but the current state forbids it. Nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("A bomb is already ticking in this channel! Solve that one first!")]
    AlreadyRunning,
    #[error("No bomb is currently ticking in this channel. Change this sad fact with `{prefix}run`.")]
    NoBomb { prefix: String },
    #[error("Sorry, {module} has already been claimed by {by}.")]
    AlreadyClaimed { module: String, by: String },
    #[error("Sorry, {module} is claimed by {by}, not you.")]
    NotYourClaim { module: String, by: String },
    #[error("{module} isn't claimed by anyone.")]
    NotClaimed { module: String },
    #[error("{module} has already been solved.")]
    AlreadySolved { module: String },
    #[error("Sorry, there are no unclaimed modules.")]
    NoUnclaimed,
}

/// Session creation rejected while choosing modules. No partial session exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("No such module: `{0}`")]
    UnknownModule(String),
    #[error("You've blacklisted all the modules! If you don't want to play, just say so!")]
    ExhaustedCatalog,
    #[error("Nope. A bomb can't have more than {} modules.", MAX_MODULES)]
    CountTooLarge,
    #[error("{}", multiplicity_phrase(.token, .too_many_markers))]
    AmbiguousMultiplicity {
        token: String,
        too_many_markers: bool,
    },
    #[error("A bomb with 0 modules has been... armed? Look, it doesn't seem to want to work. I don't think a bomb with no modules is a good idea.")]
    NothingToDefuse,
    #[error("module identifier `{0}` is registered twice")]
    DuplicateIdentifier(String),
}

fn multiplicity_phrase(token: &str, too_many_markers: &bool) -> String {
    if *too_many_markers {
        format!("There are too many stars in `{token}`.")
    } else {
        format!("`{token}`: which one is the module and which one is the count?")
    }
}

/// Everything a command can fail with.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Conflict(#[from] Conflict),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("The bot is in shutdown mode. No new bombs can be started.")]
    DrainRejected,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SimError {
    /// Whether operators should hear about this one.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Result alias used by command handlers.
pub type SimResult<T> = Result<T, SimError>;
