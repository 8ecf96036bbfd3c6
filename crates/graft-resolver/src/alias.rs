//! The alias table of one graph build.

use std::collections::BTreeMap;

use graft_core::reference::PackageRef;
use graft_core::requirement::{Requirement, Requirements};

use crate::error::{ResolveError, ResolveResult};

/// Alias reference (without revision) → the reference it stands for.
///
/// Owned by a single graph build. Callers may seed it with the table of a
/// previous build to skip loading alias recipes again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    targets: BTreeMap<PackageRef, PackageRef>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, alias: &PackageRef) -> Option<&PackageRef> {
        self.targets.get(&alias.without_revision())
    }

    pub fn insert(&mut self, alias: &PackageRef, target: PackageRef) {
        self.targets.insert(alias.without_revision(), target);
    }

    /// Cache a freshly discovered alias. When the alias was itself reached
    /// through an earlier alias (`original`), that one is pointed at the
    /// final target too, so chains collapse to a single lookup.
    pub fn record(&mut self, alias: &PackageRef, target: &PackageRef, original: Option<&PackageRef>) {
        tracing::debug!("caching alias {alias} -> {target}");
        self.insert(alias, target.clone());
        if let Some(original) = original {
            self.insert(original, target.clone());
        }
    }

    /// Follow cached aliases from `reference` to a reference that is not an alias.
    pub fn follow(&self, reference: &PackageRef) -> ResolveResult<Option<PackageRef>> {
        let mut chain: Vec<PackageRef> = Vec::new();
        let mut current = reference.clone();
        while let Some(target) = self.get(&current) {
            let key = current.without_revision();
            if chain.contains(&key) {
                chain.push(key);
                return Err(ResolveError::AliasCycle {
                    reference: reference.to_string(),
                    chain: join(&chain),
                });
            }
            chain.push(key);
            current = target.clone();
        }
        Ok((!chain.is_empty()).then_some(current))
    }

    /// Rewrite a requirement that points at a cached alias.
    pub fn resolve_requirement(&self, requirement: &mut Requirement) -> ResolveResult<()> {
        if self.targets.is_empty() {
            return Ok(());
        }
        if let Some(target) = self.follow(&requirement.reference)? {
            requirement.reference = target;
        }
        Ok(())
    }

    pub fn resolve_all(&self, requirements: &mut Requirements) -> ResolveResult<()> {
        for requirement in requirements.values_mut() {
            self.resolve_requirement(requirement)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PackageRef, &PackageRef)> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

pub(crate) fn join(chain: &[PackageRef]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(text: &str) -> PackageRef {
        PackageRef::parse(text).unwrap()
    }

    #[test]
    fn follows_chains() {
        let mut table = AliasTable::new();
        table.insert(&r("zlib/latest"), r("zlib/stable"));
        table.insert(&r("zlib/stable"), r("zlib/1.2.11"));

        let mut req = Requirement::new(r("zlib/latest"));
        table.resolve_requirement(&mut req).unwrap();
        assert_eq!(req.reference, r("zlib/1.2.11"));
    }

    #[test]
    fn lookup_ignores_revision() {
        let mut table = AliasTable::new();
        table.insert(&r("zlib/latest#abc"), r("zlib/1.2.11"));
        assert_eq!(table.get(&r("zlib/latest")), Some(&r("zlib/1.2.11")));
    }

    #[test]
    fn unaliased_reference_is_left_alone() {
        let table = AliasTable::new();
        let mut req = Requirement::new(r("zlib/1.2.11"));
        table.resolve_requirement(&mut req).unwrap();
        assert_eq!(req.reference, r("zlib/1.2.11"));
        assert_eq!(table.follow(&r("zlib/1.2.11")).unwrap(), None);
    }

    #[test]
    fn record_collapses_to_final_target() {
        let mut table = AliasTable::new();
        table.record(&r("a/latest"), &r("a/stable"), None);
        table.record(&r("a/stable"), &r("a/2.0"), Some(&r("a/latest")));
        assert_eq!(table.get(&r("a/latest")), Some(&r("a/2.0")));
        assert_eq!(table.get(&r("a/stable")), Some(&r("a/2.0")));
    }

    #[test]
    fn cycles_are_an_error() {
        let mut table = AliasTable::new();
        table.insert(&r("a/x"), r("a/y"));
        table.insert(&r("a/y"), r("a/x"));
        let mut req = Requirement::new(r("a/x"));
        let err = table.resolve_requirement(&mut req).unwrap_err();
        assert!(matches!(err, ResolveError::AliasCycle { .. }));
        assert!(err.to_string().contains("a/x -> a/y -> a/x"), "got: {err}");
    }
}
