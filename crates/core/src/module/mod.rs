#![allow(missing_docs)]

//! Modules on a bomb and the claim/solve state machine they all share.

pub mod catalog;
pub mod kinds;
mod puzzle;

use std::fmt;

use tracing::debug;

use crate::{
    edgework::Edgework,
    error::{Conflict, SimResult, UsageError},
    models::Participant,
    random::RandomSource,
};

pub use catalog::{CatalogBuilder, ModuleCatalog, ModuleDescriptor, ModuleOrigin};
pub use puzzle::{ModuleLog, Puzzle, PuzzleAction, PuzzleContext, PuzzleFactory, PuzzleSetup};

/// Who, if anyone, is working on a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimState {
    Unclaimed,
    Claimed(Participant),
    /// Terminal.
    Solved,
}

/// Bomb-level facts a module command may need.
#[derive(Debug, Clone, Copy)]
pub struct ModuleEnv<'a> {
    pub prefix: &'a str,
    pub edgework: &'a Edgework,
}

/// Side effect of a module command on the bomb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleEvent {
    None,
    Strike,
    Solved,
}

/// Messages plus the event the bomb has to account for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutcome {
    pub messages: Vec<String>,
    pub event: ModuleEvent,
}

impl ModuleOutcome {
    fn reply(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
            event: ModuleEvent::None,
        }
    }

    fn silent() -> Self {
        Self {
            messages: Vec::new(),
            event: ModuleEvent::None,
        }
    }
}

/// One module on a bomb.
pub struct Module {
    index: usize,
    descriptor: &'static ModuleDescriptor,
    state: ClaimState,
    log: ModuleLog,
    puzzle: Box<dyn Puzzle>,
}

impl Module {
    /// Instantiate a module kind at the given 1-based index.
    pub fn new(
        index: usize,
        descriptor: &'static ModuleDescriptor,
        rng: &mut RandomSource,
        edgework: &Edgework,
    ) -> Self {
        let mut log = ModuleLog::new(descriptor.display_name, index);
        let puzzle = (descriptor.factory)(&mut PuzzleSetup {
            rng,
            edgework,
            log: &mut log,
        });
        Self {
            index,
            descriptor,
            state: ClaimState::Unclaimed,
            log,
            puzzle,
        }
    }

    /// 1-based position on the bomb.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn display_name(&self) -> &'static str {
        self.descriptor.display_name
    }

    pub fn origin(&self) -> ModuleOrigin {
        self.descriptor.origin
    }

    pub fn state(&self) -> &ClaimState {
        &self.state
    }

    /// Whether the module reached its terminal state.
    pub fn is_solved(&self) -> bool {
        matches!(self.state, ClaimState::Solved)
    }

    /// Current holder, if claimed and unsolved.
    pub fn claimant(&self) -> Option<&Participant> {
        match &self.state {
            ClaimState::Claimed(holder) => Some(holder),
            _ => None,
        }
    }

    pub fn log(&self) -> &ModuleLog {
        &self.log
    }

    /// Short status used by `find`.
    pub fn status(&self) -> String {
        match &self.state {
            ClaimState::Unclaimed => "unclaimed".to_string(),
            ClaimState::Claimed(holder) => format!("claimed by {holder}"),
            ClaimState::Solved => "solved".to_string(),
        }
    }

    /// Claim for `who`. Claiming your own module again is a no-op.
    pub fn claim(&mut self, who: &Participant) -> Result<(), Conflict> {
        match &self.state {
            ClaimState::Solved => Err(self.already_solved()),
            ClaimState::Claimed(holder) if holder != who => Err(Conflict::AlreadyClaimed {
                module: self.to_string(),
                by: holder.to_string(),
            }),
            ClaimState::Claimed(_) => Ok(()),
            ClaimState::Unclaimed => {
                self.state = ClaimState::Claimed(who.clone());
                Ok(())
            }
        }
    }

    /// Release a claim held by `who`.
    pub fn unclaim(&mut self, who: &Participant) -> Result<(), Conflict> {
        match &self.state {
            ClaimState::Solved => Err(self.already_solved()),
            ClaimState::Unclaimed => Err(Conflict::NotClaimed {
                module: self.to_string(),
            }),
            ClaimState::Claimed(holder) if holder != who => Err(Conflict::NotYourClaim {
                module: self.to_string(),
                by: holder.to_string(),
            }),
            ClaimState::Claimed(_) => {
                self.state = ClaimState::Unclaimed;
                Ok(())
            }
        }
    }

    /// Move the claim to `who` whoever held it. Returns the previous holder.
    pub fn take(&mut self, who: &Participant) -> Result<Option<Participant>, Conflict> {
        if self.is_solved() {
            return Err(self.already_solved());
        }
        let previous = std::mem::replace(&mut self.state, ClaimState::Claimed(who.clone()));
        Ok(match previous {
            ClaimState::Claimed(holder) => Some(holder),
            _ => None,
        })
    }

    /// Mark solved. Returns `false` when it already was.
    pub fn solve(&mut self) -> bool {
        if self.is_solved() {
            return false;
        }
        self.state = ClaimState::Solved;
        true
    }

    fn already_solved(&self) -> Conflict {
        Conflict::AlreadySolved {
            module: self.to_string(),
        }
    }

    fn command_prefix(&self, env: &ModuleEnv<'_>) -> String {
        format!("{}{}", env.prefix, self.index)
    }

    fn help_text(&self, env: &ModuleEnv<'_>) -> String {
        self.puzzle
            .help()
            .replace("{cmd}", &self.command_prefix(env))
    }

    fn view(&self, env: &ModuleEnv<'_>) -> String {
        format!(
            "{self} ({}):\n{}\n{}",
            self.status(),
            self.puzzle.describe(),
            self.help_text(env)
        )
    }

    /// Run a module-level command issued by `author`.
    pub fn handle_command(
        &mut self,
        env: &ModuleEnv<'_>,
        author: &Participant,
        command: &str,
        args: &[String],
    ) -> SimResult<ModuleOutcome> {
        let mention = author.mention();
        match command {
            "claim" | "unclaim" | "take" | "player" | "help" | "view" | "claimview" | "cv"
                if !args.is_empty() =>
            {
                Err(UsageError::TrailingArguments.into())
            }
            "claim" => {
                let already_mine = self.claimant() == Some(author);
                self.claim(author)?;
                if already_mine {
                    Ok(ModuleOutcome::reply(format!(
                        "{mention} You have already claimed {self}."
                    )))
                } else {
                    debug!(module = self.index, player = %author.id, "Module claimed");
                    Ok(ModuleOutcome::reply(format!(
                        "{mention} {self} is yours now."
                    )))
                }
            }
            "unclaim" => {
                self.unclaim(author)?;
                Ok(ModuleOutcome::reply(format!(
                    "{mention} {self} is no longer claimed."
                )))
            }
            "take" => {
                let previous = self.take(author)?;
                let reply = match previous {
                    Some(holder) if &holder != author => {
                        format!("{mention} You took {self} from {holder}.")
                    }
                    _ => format!("{mention} {self} is yours now."),
                };
                Ok(ModuleOutcome::reply(reply))
            }
            "player" => Ok(ModuleOutcome::reply(match &self.state {
                ClaimState::Claimed(holder) => format!("{self} is claimed by {holder}."),
                ClaimState::Unclaimed => format!("Nobody has claimed {self}."),
                ClaimState::Solved => format!("{self} has already been solved."),
            })),
            "help" => Ok(ModuleOutcome::reply(self.help_text(env))),
            "view" => Ok(ModuleOutcome::reply(self.view(env))),
            "claimview" | "cv" => {
                self.claim(author)?;
                Ok(ModuleOutcome::reply(format!(
                    "{mention} {}",
                    self.view(env)
                )))
            }
            _ if self.puzzle.commands().contains(&command) => {
                self.run_puzzle_command(env, author, command, args)
            }
            _ => Err(UsageError::UnknownCommand {
                module: self.to_string(),
                module_prefix: self.command_prefix(env),
                command: command.to_string(),
            }
            .into()),
        }
    }

    fn run_puzzle_command(
        &mut self,
        env: &ModuleEnv<'_>,
        author: &Participant,
        command: &str,
        args: &[String],
    ) -> SimResult<ModuleOutcome> {
        match &self.state {
            ClaimState::Solved => return Err(self.already_solved().into()),
            ClaimState::Claimed(holder) if holder != author => {
                return Err(Conflict::NotYourClaim {
                    module: self.to_string(),
                    by: holder.to_string(),
                }
                .into())
            }
            _ => {}
        }

        let mut ctx = PuzzleContext {
            edgework: env.edgework,
            log: &mut self.log,
        };
        let action = self.puzzle.handle(&mut ctx, command, args)?;
        let mention = author.mention();
        Ok(match action {
            PuzzleAction::Nothing => ModuleOutcome::silent(),
            PuzzleAction::Reply(text) => ModuleOutcome::reply(format!("{mention} {text}")),
            PuzzleAction::Strike(reason) => {
                self.log.push(format!("Strike! {reason}"));
                ModuleOutcome {
                    messages: vec![format!("{mention} {self} gave a strike! {reason}")],
                    event: ModuleEvent::Strike,
                }
            }
            PuzzleAction::Solve => {
                self.solve();
                self.log.push("Module solved");
                ModuleOutcome {
                    messages: vec![format!("{mention} {self} has been solved.")],
                    event: ModuleEvent::Solved,
                }
            }
        })
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.descriptor.display_name, self.index)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("index", &self.index)
            .field("kind", &self.descriptor.identifier)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn simpleton(index: usize) -> (Module, Edgework) {
        let mut rng = RandomSource::seeded(3);
        let edgework = Edgework::generate(&mut rng);
        let module = Module::new(index, &kinds::simpleton::DESCRIPTOR, &mut rng, &edgework);
        (module, edgework)
    }

    fn alice() -> Participant {
        Participant::new("1", "alice")
    }

    fn bob() -> Participant {
        Participant::new("2", "bob")
    }

    #[test]
    fn claim_take_unclaim_transitions() {
        let (mut module, _) = simpleton(3);

        module.claim(&alice()).expect("free module");
        module.claim(&alice()).expect("claiming twice is fine");
        assert_eq!(
            module.claim(&bob()),
            Err(Conflict::AlreadyClaimed {
                module: "The Simpleton (#3)".to_string(),
                by: "alice".to_string(),
            })
        );

        assert_eq!(module.take(&bob()), Ok(Some(alice())));
        assert_eq!(module.claimant(), Some(&bob()));
        assert!(matches!(
            module.unclaim(&alice()),
            Err(Conflict::NotYourClaim { .. })
        ));
        module.unclaim(&bob()).expect("own claim");
        assert_eq!(module.state(), &ClaimState::Unclaimed);
        assert_eq!(module.take(&alice()), Ok(None));
    }

    #[test]
    fn solved_is_terminal() {
        let (mut module, _) = simpleton(1);
        module.claim(&alice()).expect("free module");
        assert!(module.solve());
        assert!(!module.solve());
        assert!(matches!(module.claim(&bob()), Err(Conflict::AlreadySolved { .. })));
        assert!(matches!(module.unclaim(&alice()), Err(Conflict::AlreadySolved { .. })));
        assert!(matches!(module.take(&bob()), Err(Conflict::AlreadySolved { .. })));
    }

    #[test]
    fn puzzle_commands_respect_claims() {
        let (mut module, edgework) = simpleton(2);
        let env = ModuleEnv {
            prefix: "!",
            edgework: &edgework,
        };
        module.claim(&alice()).expect("free module");

        let denied = module.handle_command(&env, &bob(), "push", &[]);
        assert!(matches!(
            denied,
            Err(SimError::Conflict(Conflict::NotYourClaim { .. }))
        ));
        assert!(!module.is_solved());

        let outcome = module
            .handle_command(&env, &alice(), "push", &[])
            .expect("claimed by issuer");
        assert_eq!(outcome.event, ModuleEvent::Solved);
        assert!(module.is_solved());
        assert!(module
            .log()
            .lines()
            .iter()
            .all(|line| line.starts_with("[The Simpleton #2]")));

        let again = module.handle_command(&env, &alice(), "push", &[]);
        assert!(matches!(
            again,
            Err(SimError::Conflict(Conflict::AlreadySolved { .. }))
        ));
    }

    #[test]
    fn unknown_and_generic_commands() {
        let (mut module, edgework) = simpleton(5);
        let env = ModuleEnv {
            prefix: "!",
            edgework: &edgework,
        };

        let help = module
            .handle_command(&env, &alice(), "help", &[])
            .expect("help works");
        assert_eq!(
            help.messages,
            vec!["Use `!5 push` to push the button and solve the module.".to_string()]
        );

        let player = module
            .handle_command(&env, &alice(), "player", &[])
            .expect("player works");
        assert_eq!(player.messages, vec!["Nobody has claimed The Simpleton (#5).".to_string()]);

        let unknown = module
            .handle_command(&env, &alice(), "cut", &["1".to_string()])
            .expect_err("simpleton has no wires");
        assert_eq!(
            unknown.to_string(),
            "The Simpleton (#5) doesn't understand `cut`. Try `!5 help`."
        );

        let trailing = module.handle_command(&env, &alice(), "claim", &["now".to_string()]);
        assert!(matches!(
            trailing,
            Err(SimError::Usage(UsageError::TrailingArguments))
        ));

        let cv = module
            .handle_command(&env, &alice(), "cv", &[])
            .expect("claimview works");
        assert!(cv.messages[0].starts_with("<@1> The Simpleton (#5) (claimed by alice):"));
    }
}
