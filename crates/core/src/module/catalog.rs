//! Registry of module kinds, built once at startup.

use std::{collections::HashMap, fmt};

use crate::error::CatalogError;

use super::{kinds, puzzle::PuzzleFactory};

/// Where a module kind comes from; only used for ratio accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleOrigin {
    Vanilla,
    Modded,
}

impl fmt::Display for ModuleOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModuleOrigin::Vanilla => "vanilla",
            ModuleOrigin::Modded => "modded",
        })
    }
}

/// Static description of a module kind.
pub struct ModuleDescriptor {
    /// Canonical identifier used in `run` lists.
    pub identifier: &'static str,
    /// Additional identifiers.
    pub aliases: &'static [&'static str],
    /// Name shown to players.
    pub display_name: &'static str,
    pub origin: ModuleOrigin,
    pub factory: PuzzleFactory,
}

impl ModuleDescriptor {
    /// Identifier plus aliases.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.identifier).chain(self.aliases.iter().copied())
    }
}

impl fmt::Debug for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<module {:?}>", self.identifier)
    }
}

impl PartialEq for ModuleDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for ModuleDescriptor {}

/// Immutable lookup table from identifiers and aliases to module kinds.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    descriptors: Vec<&'static ModuleDescriptor>,
    by_name: HashMap<String, &'static ModuleDescriptor>,
}

impl ModuleCatalog {
    /// Start an empty catalog.
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Catalog with every module kind that ships with the crate.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::builder()
            .register(&kinds::wires::DESCRIPTOR)
            .register(&kinds::simpleton::DESCRIPTOR)
            .build()
    }

    /// Case-insensitive lookup by identifier or alias.
    pub fn lookup(&self, name: &str) -> Option<&'static ModuleDescriptor> {
        self.by_name.get(&name.to_lowercase()).copied()
    }

    /// Module kinds of one origin, in registration order.
    pub fn by_origin(&self, origin: ModuleOrigin) -> Vec<&'static ModuleDescriptor> {
        self.descriptors
            .iter()
            .copied()
            .filter(|descriptor| descriptor.origin == origin)
            .collect()
    }

    /// Every module kind, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &'static ModuleDescriptor> + '_ {
        self.descriptors.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Reply to `modules` when no bomb is running.
    pub fn listing(&self) -> String {
        let mut reply = String::from("Available modules:");
        for origin in [ModuleOrigin::Vanilla, ModuleOrigin::Modded] {
            let names: Vec<String> = self
                .by_origin(origin)
                .into_iter()
                .map(|descriptor| format!("`{}` ({})", descriptor.identifier, descriptor.display_name))
                .collect();
            if !names.is_empty() {
                reply.push_str(&format!("\n{origin}: {}", names.join(", ")));
            }
        }
        reply
    }
}

/// Collects descriptors and validates them on [`CatalogBuilder::build`].
#[derive(Default)]
pub struct CatalogBuilder {
    descriptors: Vec<&'static ModuleDescriptor>,
}

impl CatalogBuilder {
    /// Add a module kind.
    pub fn register(mut self, descriptor: &'static ModuleDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Freeze the catalog. Every identifier and alias must be unique, ignoring case.
    pub fn build(self) -> Result<ModuleCatalog, CatalogError> {
        let mut by_name = HashMap::new();
        for &descriptor in &self.descriptors {
            for name in descriptor.names() {
                let key = name.to_lowercase();
                if by_name.insert(key.clone(), descriptor).is_some() {
                    return Err(CatalogError::DuplicateIdentifier(key));
                }
            }
        }
        Ok(ModuleCatalog {
            descriptors: self.descriptors,
            by_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_resolves_aliases_case_insensitively() -> anyhow::Result<()> {
        let catalog = ModuleCatalog::standard()?;
        assert_eq!(catalog.len(), 2);
        let wires = catalog.lookup("WIRES").expect("wires registered");
        assert_eq!(wires.display_name, "Wires");
        assert_eq!(catalog.lookup("SimpleWires"), Some(wires));
        assert_eq!(
            catalog.lookup("thesimpleton").map(|d| d.identifier),
            Some("simpleton")
        );
        assert!(catalog.lookup("password").is_none());
        Ok(())
    }

    #[test]
    fn duplicate_identifiers_are_rejected() {
        let result = ModuleCatalog::builder()
            .register(&kinds::wires::DESCRIPTOR)
            .register(&kinds::wires::DESCRIPTOR)
            .build();
        assert_eq!(
            result.err(),
            Some(CatalogError::DuplicateIdentifier("wires".to_string()))
        );
    }

    #[test]
    fn origins_split_the_catalog() -> anyhow::Result<()> {
        let catalog = ModuleCatalog::standard()?;
        assert_eq!(catalog.by_origin(ModuleOrigin::Vanilla).len(), 1);
        assert_eq!(catalog.by_origin(ModuleOrigin::Modded).len(), 1);
        let listing = catalog.listing();
        assert!(listing.contains("vanilla: `wires` (Wires)"));
        assert!(listing.contains("modded: `simpleton` (The Simpleton)"));
        Ok(())
    }
}
