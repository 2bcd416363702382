//! The seam between the shared claim/solve machinery and individual module kinds.

use std::fmt;

use crate::{edgework::Edgework, error::UsageError, random::RandomSource};

/// Per-module log buffer. Every line is prefixed with `[<display name> #<index>]`.
#[derive(Debug, Clone)]
pub struct ModuleLog {
    prefix: String,
    lines: Vec<String>,
}

impl ModuleLog {
    pub(crate) fn new(display_name: &str, index: usize) -> Self {
        Self {
            prefix: format!("[{display_name} #{index}]"),
            lines: Vec::new(),
        }
    }

    /// Append one line.
    pub fn push(&mut self, line: impl AsRef<str>) {
        self.lines.push(format!("{} {}", self.prefix, line.as_ref()));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for ModuleLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// What a module kind gets to see while setting up.
pub struct PuzzleSetup<'a> {
    pub rng: &'a mut RandomSource,
    pub edgework: &'a Edgework,
    pub log: &'a mut ModuleLog,
}

/// What a module kind gets to see while handling a command.
pub struct PuzzleContext<'a> {
    pub edgework: &'a Edgework,
    pub log: &'a mut ModuleLog,
}

/// Result of a module-specific command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PuzzleAction {
    /// Nothing to report.
    Nothing,
    /// Answer the issuer without touching any state.
    Reply(String),
    /// Wrong move: the bomb gains a strike.
    Strike(String),
    /// The module is solved.
    Solve,
}

/// Behaviour of one module kind.
///
/// Implementations only deal with their own puzzle state; claims, solved checks and
/// strike accounting happen in [`Module`](super::Module).
pub trait Puzzle: Send {
    /// Commands this kind understands, lower-case.
    fn commands(&self) -> &'static [&'static str];

    /// Help text; `{cmd}` is replaced with the prefixed module number.
    fn help(&self) -> &'static str;

    /// Textual rendering of the current state.
    fn describe(&self) -> String;

    /// Handle one of [`Puzzle::commands`].
    fn handle(
        &mut self,
        ctx: &mut PuzzleContext<'_>,
        command: &str,
        args: &[String],
    ) -> Result<PuzzleAction, UsageError>;
}

/// Constructor stored in the catalog.
pub type PuzzleFactory = fn(&mut PuzzleSetup<'_>) -> Box<dyn Puzzle>;
