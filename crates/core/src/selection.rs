#![allow(missing_docs)]

//! Turning `run` arguments into the ordered list of modules for a new bomb.
//!
//! Parsing and selection are pure; all randomness comes from the injected
//! [`RandomSource`], so a seeded source reproduces a bomb exactly.

use crate::{
    error::{CatalogError, SimResult, UsageError},
    module::{ModuleCatalog, ModuleDescriptor, ModuleOrigin},
    random::RandomSource,
    MAX_MODULES,
};

/// A named vanilla/modded ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Distribution {
    /// Name as typed after the module count.
    pub name: &'static str,
    /// Share of vanilla modules, in percent.
    pub vanilla_percent: usize,
    /// Aliases are accepted but not advertised in the usage text.
    pub listed: bool,
}

const fn distribution(name: &'static str, vanilla_percent: usize, listed: bool) -> Distribution {
    Distribution {
        name,
        vanilla_percent,
        listed,
    }
}

/// Every distribution `run` understands.
pub const DISTRIBUTIONS: [Distribution; 12] = [
    distribution("vanilla", 100, true),
    distribution("mods", 0, true),
    distribution("modded", 0, false),
    distribution("mixed", 50, true),
    distribution("lightmixed", 67, false),
    distribution("mixedlight", 67, true),
    distribution("heavymixed", 33, false),
    distribution("mixedheavy", 33, true),
    distribution("light", 80, true),
    distribution("heavy", 20, true),
    distribution("extralight", 90, true),
    distribution("extraheavy", 10, true),
];

/// Case-insensitive distribution lookup.
pub fn find_distribution(name: &str) -> Option<&'static Distribution> {
    let name = name.to_lowercase();
    DISTRIBUTIONS.iter().find(|d| d.name == name)
}

/// What the players asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleRequest {
    /// `run <count> <distribution> [-veto ...]`
    Random {
        count: usize,
        vanilla_percent: usize,
        vetoes: Vec<&'static ModuleDescriptor>,
    },
    /// `run <module>[*count] ...`, already expanded.
    Explicit(Vec<&'static ModuleDescriptor>),
}

/// Reply for a malformed `run`.
pub fn usage(prefix: &str) -> String {
    let mut usage = format!(
        "Usage: `{prefix}run <module count> <module distribution> [-<module 1> [-<module 2> [...]]]` or \
         `{prefix}run <module 1>[*<count>] [<module 2>[*<count>] [...]]`.\n\
         For example:\n - `{prefix}run 7 vanilla` - 7 random vanilla modules\n \
         - `{prefix}run 12 mixed -password -switches` - 12 modules, half of them being vanilla. \
         Password and Switches modules will not be generated\n \
         - `{prefix}run keypad*3` - three Keypad modules and nothing else\n\
         Use `{prefix}modules` to see the implemented modules.\nAvailable distributions:"
    );
    for d in DISTRIBUTIONS.iter().filter(|d| d.listed) {
        usage.push_str(&format!(
            "\n`{}`: {}% vanilla, {}% modded",
            d.name,
            d.vanilla_percent,
            100 - d.vanilla_percent
        ));
    }
    usage
}

fn is_number(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Digits that don't fit a `usize` are simply too many modules.
fn parse_count(token: &str) -> Result<usize, CatalogError> {
    token.parse().map_err(|_| CatalogError::CountTooLarge)
}

/// Parse the arguments of `run`.
pub fn parse_run_args(
    args: &[String],
    catalog: &ModuleCatalog,
    prefix: &str,
) -> SimResult<ModuleRequest> {
    let Some(first) = args.first() else {
        return Err(UsageError::Hint(usage(prefix)).into());
    };

    if first
        .strip_prefix('-')
        .map_or(false, |rest| is_number(rest))
    {
        return Err(UsageError::NegativeCount.into());
    }

    if is_number(first) {
        let distribution = args
            .get(1)
            .and_then(|name| find_distribution(name))
            .ok_or_else(|| UsageError::Hint(usage(prefix)))?;
        let count = parse_count(first)?;
        if count > MAX_MODULES {
            return Err(CatalogError::CountTooLarge.into());
        }

        let mut vetoes: Vec<&'static ModuleDescriptor> = Vec::new();
        for veto in &args[2..] {
            let Some(name) = veto.strip_prefix('-') else {
                return Err(UsageError::Hint(usage(prefix)).into());
            };
            let descriptor = catalog
                .lookup(name)
                .ok_or_else(|| CatalogError::UnknownModule(name.to_string()))?;
            if !vetoes.contains(&descriptor) {
                vetoes.push(descriptor);
            }
        }

        return Ok(ModuleRequest::Random {
            count,
            vanilla_percent: distribution.vanilla_percent,
            vetoes,
        });
    }

    let mut chosen: Vec<&'static ModuleDescriptor> = Vec::new();
    for token in args {
        let (name, count) = match token.split_once('*') {
            None => (token.as_str(), 1),
            Some((_, right)) if right.contains('*') => {
                return Err(CatalogError::AmbiguousMultiplicity {
                    token: token.clone(),
                    too_many_markers: true,
                }
                .into())
            }
            Some((left, right)) => match (is_number(left), is_number(right)) {
                (true, false) => (right, parse_count(left)?),
                (false, true) => (left, parse_count(right)?),
                _ => {
                    return Err(CatalogError::AmbiguousMultiplicity {
                        token: token.clone(),
                        too_many_markers: false,
                    }
                    .into())
                }
            },
        };

        let descriptor = catalog
            .lookup(name)
            .ok_or_else(|| CatalogError::UnknownModule(name.to_string()))?;
        if count > MAX_MODULES || chosen.len() + count > MAX_MODULES {
            return Err(CatalogError::CountTooLarge.into());
        }
        chosen.extend(std::iter::repeat(descriptor).take(count));
    }

    Ok(ModuleRequest::Explicit(chosen))
}

/// `count / pool.len()` full passes over the pool, then a sample without replacement
/// for the remainder. An empty pool yields nothing.
pub fn fill_category<T: Clone>(pool: &[T], count: usize, rng: &mut RandomSource) -> Vec<T> {
    if pool.is_empty() {
        return Vec::new();
    }
    let mut chosen = Vec::with_capacity(count);
    for _ in 0..count / pool.len() {
        chosen.extend_from_slice(pool);
    }
    chosen.extend(rng.sample(pool, count % pool.len()));
    chosen
}

/// Resolve a request into the shuffled module list; index `i` becomes module `i + 1`.
pub fn select(
    request: &ModuleRequest,
    catalog: &ModuleCatalog,
    rng: &mut RandomSource,
) -> Result<Vec<&'static ModuleDescriptor>, CatalogError> {
    let mut chosen = match request {
        ModuleRequest::Explicit(modules) => modules.clone(),
        ModuleRequest::Random {
            count,
            vanilla_percent,
            vetoes,
        } => {
            let count = *count;
            if count > MAX_MODULES {
                return Err(CatalogError::CountTooLarge);
            }

            let catalog_vanilla = catalog.by_origin(ModuleOrigin::Vanilla);
            let catalog_modded = catalog.by_origin(ModuleOrigin::Modded);
            let without_vetoes = |pool: Vec<&'static ModuleDescriptor>| -> Vec<_> {
                pool.into_iter().filter(|d| !vetoes.contains(d)).collect()
            };
            let vanilla_pool = without_vetoes(catalog_vanilla.clone());
            let modded_pool = without_vetoes(catalog_modded.clone());

            let mut vanilla_count = vanilla_percent * count / 100;
            if catalog_vanilla.is_empty() {
                vanilla_count = 0;
            } else if catalog_modded.is_empty() {
                vanilla_count = count;
            }
            let modded_count = count - vanilla_count;

            if (vanilla_count > 0 && vanilla_pool.is_empty())
                || (modded_count > 0 && modded_pool.is_empty())
                || (vanilla_pool.is_empty() && modded_pool.is_empty())
            {
                return Err(CatalogError::ExhaustedCatalog);
            }

            let mut chosen = fill_category(&vanilla_pool, vanilla_count, rng);
            chosen.extend(fill_category(&modded_pool, modded_count, rng));
            chosen
        }
    };

    if chosen.is_empty() {
        return Err(CatalogError::NothingToDefuse);
    }
    rng.shuffle(&mut chosen);
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SimError, test_support};

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    fn parse(line: &str) -> SimResult<ModuleRequest> {
        parse_run_args(&args(line), &test_support::catalog(), "!")
    }

    fn run(line: &str, seed: u64) -> Result<Vec<&'static ModuleDescriptor>, SimError> {
        let catalog = test_support::catalog();
        let request = parse_run_args(&args(line), &catalog, "!")?;
        Ok(select(&request, &catalog, &mut RandomSource::seeded(seed))?)
    }

    fn count_origin(modules: &[&ModuleDescriptor], origin: ModuleOrigin) -> usize {
        modules.iter().filter(|d| d.origin == origin).count()
    }

    #[test]
    fn seven_vanilla() -> anyhow::Result<()> {
        let modules = run("7 vanilla", 1)?;
        assert_eq!(modules.len(), 7);
        assert_eq!(count_origin(&modules, ModuleOrigin::Vanilla), 7);
        Ok(())
    }

    #[test]
    fn twelve_mixed_with_vetoes() -> anyhow::Result<()> {
        for seed in 0..20 {
            let modules = run("12 mixed -password -switches", seed)?;
            assert_eq!(modules.len(), 12);
            assert_eq!(count_origin(&modules, ModuleOrigin::Vanilla), 6);
            assert_eq!(count_origin(&modules, ModuleOrigin::Modded), 6);
            assert!(!modules.contains(&&test_support::PASSWORD));
            assert!(!modules.contains(&&test_support::SWITCHES));
        }
        Ok(())
    }

    #[test]
    fn ratio_accounting_floors_vanilla_share() -> anyhow::Result<()> {
        let modules = run("3 lightmixed", 9)?;
        assert_eq!(count_origin(&modules, ModuleOrigin::Vanilla), 2);
        let modules = run("101 extraheavy", 9)?;
        assert_eq!(count_origin(&modules, ModuleOrigin::Vanilla), 10);
        assert_eq!(count_origin(&modules, ModuleOrigin::Modded), 91);
        Ok(())
    }

    #[test]
    fn explicit_multiplicity() -> anyhow::Result<()> {
        let modules = run("keypad*3", 4)?;
        assert_eq!(modules, vec![&test_support::KEYPAD; 3]);

        let modules = run("2*Wires memory", 4)?;
        assert_eq!(modules.len(), 3);
        assert_eq!(modules.iter().filter(|d| d.identifier == "wires").count(), 2);
        Ok(())
    }

    #[test]
    fn fill_uses_full_passes_then_distinct_remainder() {
        let pool = ["a", "b", "c"];
        let mut rng = RandomSource::seeded(8);
        let chosen = fill_category(&pool, 7, &mut rng);
        assert_eq!(chosen.len(), 7);
        for item in pool {
            let n = chosen.iter().filter(|&&c| c == item).count();
            assert!((2..=3).contains(&n), "{item} appeared {n} times");
        }
        assert!(fill_category::<&str>(&[], 4, &mut rng).is_empty());
    }

    #[test]
    fn rejects_bad_counts() {
        assert!(matches!(
            parse("-5 vanilla"),
            Err(SimError::Usage(UsageError::NegativeCount))
        ));
        assert!(matches!(
            parse("102 vanilla"),
            Err(SimError::Catalog(CatalogError::CountTooLarge))
        ));
        assert!(matches!(
            parse("99999999999999999999999 vanilla"),
            Err(SimError::Catalog(CatalogError::CountTooLarge))
        ));
        assert!(matches!(
            parse("keypad*60 wires*50"),
            Err(SimError::Catalog(CatalogError::CountTooLarge))
        ));
        assert!(matches!(
            run("0 vanilla", 0),
            Err(SimError::Catalog(CatalogError::NothingToDefuse))
        ));
        assert!(matches!(
            run("keypad*0", 0),
            Err(SimError::Catalog(CatalogError::NothingToDefuse))
        ));
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(matches!(
            parse("keypad*2*3"),
            Err(SimError::Catalog(CatalogError::AmbiguousMultiplicity {
                too_many_markers: true,
                ..
            }))
        ));
        assert!(matches!(
            parse("2*3"),
            Err(SimError::Catalog(CatalogError::AmbiguousMultiplicity {
                too_many_markers: false,
                ..
            }))
        ));
        assert!(matches!(
            parse("banana"),
            Err(SimError::Catalog(CatalogError::UnknownModule(name))) if name == "banana"
        ));
        assert!(matches!(parse("7 spicy"), Err(SimError::Usage(UsageError::Hint(_)))));
        assert!(matches!(
            parse("7 vanilla password"),
            Err(SimError::Usage(UsageError::Hint(_)))
        ));
        assert!(matches!(parse(""), Err(SimError::Usage(UsageError::Hint(_)))));
    }

    #[test]
    fn veto_exhaustion() {
        let every_vanilla = "5 vanilla -wires -keypad -password -memory";
        assert!(matches!(
            run(every_vanilla, 0),
            Err(SimError::Catalog(CatalogError::ExhaustedCatalog))
        ));
        // the modded share is zero, so vetoing all modded kinds is harmless
        assert!(run("5 vanilla -simpleton -switches -hexamaze", 0).is_ok());
        assert!(matches!(
            run("5 mixed -simpleton -switches -hexamaze", 0),
            Err(SimError::Catalog(CatalogError::ExhaustedCatalog))
        ));
    }

    #[test]
    fn empty_catalog_category_absorbs_the_total() -> anyhow::Result<()> {
        let catalog = ModuleCatalog::builder()
            .register(&test_support::KEYPAD)
            .register(&test_support::PASSWORD)
            .build()?;
        let request = parse_run_args(&args("4 mods"), &catalog, "!")?;
        let modules = select(&request, &catalog, &mut RandomSource::seeded(2))?;
        assert_eq!(count_origin(&modules, ModuleOrigin::Vanilla), 4);
        Ok(())
    }

    #[test]
    fn usage_lists_only_advertised_distributions() {
        let text = usage("!");
        assert!(text.contains("`mixed`: 50% vanilla, 50% modded"));
        assert!(!text.contains("`lightmixed`"));
        assert!(text.contains("`!run 7 vanilla`"));
    }
}
