//! The Simpleton: one button, push it.

use crate::{
    error::UsageError,
    module::{ModuleDescriptor, ModuleOrigin, Puzzle, PuzzleAction, PuzzleContext, PuzzleSetup},
};

pub static DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    identifier: "simpleton",
    aliases: &["thesimpleton"],
    display_name: "The Simpleton",
    origin: ModuleOrigin::Modded,
    factory: new,
};

pub(crate) fn new(_setup: &mut PuzzleSetup<'_>) -> Box<dyn Puzzle> {
    Box::new(Simpleton { pushed: false })
}

struct Simpleton {
    pushed: bool,
}

impl Puzzle for Simpleton {
    fn commands(&self) -> &'static [&'static str] {
        &["push"]
    }

    fn help(&self) -> &'static str {
        "Use `{cmd} push` to push the button and solve the module."
    }

    fn describe(&self) -> String {
        if self.pushed {
            "A big button reading PUSH IT! It has been pushed.".to_string()
        } else {
            "A big button reading PUSH IT!".to_string()
        }
    }

    fn handle(
        &mut self,
        ctx: &mut PuzzleContext<'_>,
        _command: &str,
        args: &[String],
    ) -> Result<PuzzleAction, UsageError> {
        if !args.is_empty() {
            return Err(UsageError::TrailingArguments);
        }
        ctx.log.push("Button pushed, solving module");
        self.pushed = true;
        Ok(PuzzleAction::Solve)
    }
}
