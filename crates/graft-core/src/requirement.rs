//! Requirements: the edges a package declares towards its dependencies.

use std::fmt;

use graft_util::errors::GraftError;
use indexmap::IndexMap;

use crate::reference::PackageRef;

/// One declared dependency of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Target of the edge. Range resolution and alias resolution rewrite it in place.
    pub reference: PackageRef,
    /// Not propagated to consumers of the requiring package.
    pub private: bool,
    /// Only needed to build the requiring package.
    pub build_require: bool,
    /// Pins a version for packages further upstream without adding an edge.
    pub is_override: bool,
    /// Node id pinned by a lock file.
    pub locked_id: Option<usize>,
}

impl Requirement {
    pub fn new(reference: PackageRef) -> Self {
        Self {
            reference,
            private: false,
            build_require: false,
            is_override: false,
            locked_id: None,
        }
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn build(mut self) -> Self {
        self.build_require = true;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.reference.name
    }

    /// Private and build requirements keep their subtree out of the consumer's scope.
    pub fn is_isolated(&self) -> bool {
        self.private || self.build_require
    }

    /// Pin this requirement to a locked reference and node id.
    pub fn lock(&mut self, reference: PackageRef, locked_id: usize) {
        self.reference = reference;
        self.locked_id = Some(locked_id);
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reference)?;
        if self.private {
            f.write_str(" (private)")?;
        }
        if self.build_require {
            f.write_str(" (build)")?;
        }
        if self.is_override {
            f.write_str(" (override)")?;
        }
        Ok(())
    }
}

/// The requirement set of a package, keyed by package name in declaration order.
///
/// Equality compares the sets as maps, so two evaluations that declare the
/// same requirements in a different order are equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    reqs: IndexMap<String, Requirement>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a requirement. Declaring the same package twice with a
    /// different reference is an error; an identical redeclaration is ignored.
    pub fn add(&mut self, req: Requirement) -> Result<(), GraftError> {
        if let Some(existing) = self.reqs.get(req.name()) {
            if existing.reference != req.reference {
                return Err(GraftError::Recipe {
                    message: format!(
                        "Duplicated requirement {} != {}",
                        existing.reference, req.reference
                    ),
                });
            }
            return Ok(());
        }
        self.reqs.insert(req.name().to_string(), req);
        Ok(())
    }

    /// Insert or replace the requirement for its package name.
    /// A replaced entry keeps its position.
    pub fn insert(&mut self, req: Requirement) {
        self.reqs.insert(req.name().to_string(), req);
    }

    pub fn remove(&mut self, name: &str) -> Option<Requirement> {
        self.reqs.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Requirement> {
        self.reqs.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Requirement> {
        self.reqs.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.reqs.contains_key(name)
    }

    pub fn values(&self) -> impl Iterator<Item = &Requirement> {
        self.reqs.values()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Requirement> {
        self.reqs.values_mut()
    }

    pub fn names(&self) -> Vec<String> {
        self.reqs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.reqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reqs.is_empty()
    }

    /// Re-key every entry by its current reference name.
    ///
    /// Alias resolution can point a requirement at a differently named
    /// package; this keeps lookups by name consistent afterwards.
    pub fn rekey(&mut self) {
        if self.reqs.iter().all(|(k, r)| k == r.name()) {
            return;
        }
        let reqs = std::mem::take(&mut self.reqs);
        for (_, req) in reqs {
            self.reqs.insert(req.name().to_string(), req);
        }
    }

    /// Apply requirements coming from downstream consumers.
    ///
    /// A downstream requirement for the same package supersedes the declared
    /// reference. Private requirements are never overridden.
    pub fn apply_downstream(
        &mut self,
        down_reqs: &Requirements,
        own_ref: Option<&PackageRef>,
        down_ref: Option<&PackageRef>,
    ) {
        for (name, req) in self.reqs.iter_mut() {
            if req.private {
                continue;
            }
            let Some(other) = down_reqs.get(name) else {
                continue;
            };
            if other.reference != req.reference {
                tracing::warn!(
                    "{}: requirement {} overridden by {} to {}",
                    own_ref.map_or_else(|| "root".to_string(), ToString::to_string),
                    req.reference,
                    down_ref.map_or_else(|| "your recipe".to_string(), ToString::to_string),
                    other.reference
                );
                req.reference = other.reference.clone();
            }
        }
    }

    /// The requirement set this package hands to its own dependencies:
    /// everything from downstream plus its non-private requirements, minus itself.
    pub fn propagated(&self, down_reqs: &Requirements, own_name: Option<&str>) -> Requirements {
        let mut new_reqs = down_reqs.clone();
        if let Some(name) = own_name {
            new_reqs.remove(name);
        }
        for req in self.reqs.values() {
            if req.private {
                continue;
            }
            new_reqs.insert(req.clone());
        }
        new_reqs
    }
}

impl fmt::Display for Requirements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, req) in self.reqs.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", req.reference)?;
        }
        f.write_str("]")
    }
}

impl FromIterator<Requirement> for Requirements {
    fn from_iter<I: IntoIterator<Item = Requirement>>(iter: I) -> Self {
        let mut reqs = Requirements::new();
        for req in iter {
            reqs.insert(req);
        }
        reqs
    }
}
