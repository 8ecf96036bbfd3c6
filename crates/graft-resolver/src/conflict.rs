//! Compatibility of a requested reference with one already in the graph.

use graft_core::reference::PackageRef;

/// Outcome of comparing a candidate reference against a resolved one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    Compatible,
    /// Name, version, user or channel differ.
    VersionMismatch,
    /// Same version but both sides carry a different revision.
    RevisionMismatch,
}

impl Compatibility {
    pub fn is_compatible(self) -> bool {
        self == Compatibility::Compatible
    }
}

/// Compare `candidate` with the `previous` reference already resolved under
/// the same name.
///
/// A missing revision on either side matches anything: editable packages
/// have no revision, and a requirement without one does not constrain it.
pub fn compare(previous: &PackageRef, candidate: &PackageRef) -> Compatibility {
    if !previous.version_eq(candidate) {
        return Compatibility::VersionMismatch;
    }
    match (&previous.revision, &candidate.revision) {
        (Some(a), Some(b)) if a != b => Compatibility::RevisionMismatch,
        _ => Compatibility::Compatible,
    }
}
