//! Wires: three to six coloured wires, exactly one of them is the right one to cut.

use std::fmt;

use crate::{
    edgework::Edgework,
    error::UsageError,
    module::{ModuleDescriptor, ModuleOrigin, Puzzle, PuzzleAction, PuzzleContext, PuzzleSetup},
};

pub static DESCRIPTOR: ModuleDescriptor = ModuleDescriptor {
    identifier: "wires",
    aliases: &["simplewires"],
    display_name: "Wires",
    origin: ModuleOrigin::Vanilla,
    factory: new,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Blue,
    Yellow,
    Black,
    White,
}

impl Color {
    const ALL: [Color; 5] = [
        Color::Red,
        Color::Blue,
        Color::Yellow,
        Color::Black,
        Color::White,
    ];
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::Red => "red",
            Color::Blue => "blue",
            Color::Yellow => "yellow",
            Color::Black => "black",
            Color::White => "white",
        })
    }
}

struct Wires {
    colors: Vec<Color>,
    cut: Vec<bool>,
    solution: usize,
}

fn new(setup: &mut PuzzleSetup<'_>) -> Box<dyn Puzzle> {
    let count = 3 + setup.rng.index(4);
    let colors: Vec<Color> = (0..count)
        .map(|_| Color::ALL[setup.rng.index(Color::ALL.len())])
        .collect();
    let solution = solve(&colors, setup.edgework);

    setup.log.push(format!("Wires: {}", join(&colors)));
    setup.log.push(format!("Solution: cut wire {}", solution + 1));

    Box::new(Wires {
        cut: vec![false; colors.len()],
        colors,
        solution,
    })
}

fn join(colors: &[Color]) -> String {
    colors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Zero-based position of the wire to cut.
fn solve(colors: &[Color], edgework: &Edgework) -> usize {
    let count_of = |color| colors.iter().filter(|&&c| c == color).count();
    let last_of = |color| colors.iter().rposition(|&c| c == color);
    let last = colors.len() - 1;
    let odd = edgework.serial().last_digit_odd();

    match colors.len() {
        3 => {
            if count_of(Color::Red) == 0 {
                1
            } else if colors[last] == Color::White {
                last
            } else if count_of(Color::Blue) > 1 {
                last_of(Color::Blue).unwrap_or(last)
            } else {
                last
            }
        }
        4 => {
            if count_of(Color::Red) > 1 && odd {
                last_of(Color::Red).unwrap_or(last)
            } else if colors[last] == Color::Yellow && count_of(Color::Red) == 0 {
                0
            } else if count_of(Color::Blue) == 1 {
                0
            } else if count_of(Color::Yellow) > 1 {
                last
            } else {
                1
            }
        }
        5 => {
            if colors[last] == Color::Black && odd {
                3
            } else if count_of(Color::Red) == 1 && count_of(Color::Yellow) > 1 {
                0
            } else if count_of(Color::Black) == 0 {
                1
            } else {
                0
            }
        }
        _ => {
            if count_of(Color::Yellow) == 0 && odd {
                2
            } else if count_of(Color::Yellow) == 1 && count_of(Color::White) > 1 {
                3
            } else if count_of(Color::Red) == 0 {
                last
            } else {
                3
            }
        }
    }
}

impl Puzzle for Wires {
    fn commands(&self) -> &'static [&'static str] {
        &["cut"]
    }

    fn help(&self) -> &'static str {
        "Use `{cmd} cut 3` to cut the third wire. Wires are counted from the top."
    }

    fn describe(&self) -> String {
        self.colors
            .iter()
            .zip(&self.cut)
            .enumerate()
            .map(|(i, (color, cut))| {
                if *cut {
                    format!("{}: {color} (cut)", i + 1)
                } else {
                    format!("{}: {color}", i + 1)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn handle(
        &mut self,
        ctx: &mut PuzzleContext<'_>,
        _command: &str,
        args: &[String],
    ) -> Result<PuzzleAction, UsageError> {
        let usage = || {
            UsageError::Hint(format!(
                "`cut` expects a single wire number between 1 and {}.",
                self.colors.len()
            ))
        };
        let [wire] = args else {
            return Err(usage());
        };
        let wire: usize = wire.parse().map_err(|_| usage())?;
        if wire == 0 || wire > self.colors.len() {
            return Err(usage());
        }

        let position = wire - 1;
        if self.cut[position] {
            return Ok(PuzzleAction::Reply(format!("Wire {wire} is already cut.")));
        }
        self.cut[position] = true;
        ctx.log.push(format!("Cut wire {wire}"));

        if position == self.solution {
            Ok(PuzzleAction::Solve)
        } else {
            Ok(PuzzleAction::Strike(format!(
                "Wire {wire} was not the one to cut."
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{module::ModuleLog, random::RandomSource};
    use Color::*;

    fn edgework(serial: &str) -> Edgework {
        format!("0B 0H // {serial}").parse().expect("valid edgework")
    }

    #[test]
    fn three_wire_rules() {
        let even = edgework("KT4NE8");
        assert_eq!(solve(&[Blue, Blue, Black], &even), 1);
        assert_eq!(solve(&[Red, Blue, White], &even), 2);
        assert_eq!(solve(&[Blue, Red, Blue], &even), 2);
        assert_eq!(solve(&[Blue, Blue, Red], &even), 1);
        assert_eq!(solve(&[Red, Black, Yellow], &even), 2);
    }

    #[test]
    fn serial_parity_matters() {
        let odd = edgework("KT4NE7");
        let even = edgework("KT4NE8");
        let four = [Red, Blue, Red, White];
        assert_eq!(solve(&four, &odd), 2);
        assert_eq!(solve(&four, &even), 0);

        let six = [Red, Blue, Black, White, Black, Blue];
        assert_eq!(solve(&six, &odd), 2);
        assert_eq!(solve(&six, &even), 3);
    }

    #[test]
    fn cutting_wires() {
        let edgework = edgework("KT4NE8");
        let mut log = ModuleLog::new("Wires", 1);
        let mut wires = Wires {
            colors: vec![Red, Blue, White],
            cut: vec![false; 3],
            solution: 2,
        };
        let mut ctx = PuzzleContext {
            edgework: &edgework,
            log: &mut log,
        };

        let strike = wires.handle(&mut ctx, "cut", &["1".to_string()]);
        assert!(matches!(strike, Ok(PuzzleAction::Strike(_))));
        let again = wires.handle(&mut ctx, "cut", &["1".to_string()]);
        assert!(matches!(again, Ok(PuzzleAction::Reply(_))));
        assert!(wires.handle(&mut ctx, "cut", &["7".to_string()]).is_err());
        assert!(wires.handle(&mut ctx, "cut", &[]).is_err());
        assert_eq!(
            wires.handle(&mut ctx, "cut", &["3".to_string()]),
            Ok(PuzzleAction::Solve)
        );
        assert!(wires.describe().contains("1: red (cut)"));
        assert!(log.lines().iter().any(|line| line == "[Wires #1] Cut wire 3"));
    }

    #[test]
    fn setup_logs_wires_and_solution() {
        let edgework = edgework("KT4NE8");
        for seed in 0..20 {
            let mut log = ModuleLog::new("Wires", 4);
            let mut rng = RandomSource::seeded(seed);
            let puzzle = new(&mut PuzzleSetup {
                rng: &mut rng,
                edgework: &edgework,
                log: &mut log,
            });

            let lines = log.lines();
            assert_eq!(lines.len(), 2);
            let colors = lines[0]
                .strip_prefix("[Wires #4] Wires: ")
                .expect("colour line first");
            let wire_count = colors.split(", ").count();
            assert!((3..=6).contains(&wire_count));
            assert_eq!(puzzle.describe().lines().count(), wire_count);

            let solution: usize = lines[1]
                .strip_prefix("[Wires #4] Solution: cut wire ")
                .and_then(|n| n.parse().ok())
                .expect("solution line second");
            assert!((1..=wire_count).contains(&solution));
        }
    }
}
