//! The loaded manifest of a package and the user hooks it carries.

use std::collections::BTreeMap;
use std::fmt;

use crate::options::{DepsOptions, PackageOptions};
use crate::reference::PackageRef;
use crate::requirement::Requirements;

/// Lifecycle hooks authored by recipe writers.
///
/// Hooks may run several times for the same package (a diamond can force a
/// re-expansion), so they must produce the same result for the same inputs.
pub trait RecipeHooks: fmt::Debug {
    fn config_options(&self, _ctx: &mut HookContext<'_>) -> miette::Result<()> {
        Ok(())
    }

    fn configure(&self, _ctx: &mut HookContext<'_>) -> miette::Result<()> {
        Ok(())
    }

    fn requirements(&self, _ctx: &mut HookContext<'_>) -> miette::Result<()> {
        Ok(())
    }
}

/// Hooks for manifests without user code.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl RecipeHooks for NoHooks {}

/// What a hook can see and change.
pub struct HookContext<'a> {
    pub options: &'a mut PackageOptions,
    pub requires: &'a mut Requirements,
    pub settings: &'a BTreeMap<String, String>,
}

/// Names of the hooks, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    ConfigOptions,
    Configure,
    Requirements,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hook::ConfigOptions => "config_options",
            Hook::Configure => "configure",
            Hook::Requirements => "requirements",
        })
    }
}

/// A loaded package manifest: declared requirements, options and hooks.
#[derive(Debug)]
pub struct Manifest {
    pub name: Option<String>,
    pub version: Option<String>,
    pub display_name: String,
    pub requires: Requirements,
    pub options: PackageOptions,
    pub settings: BTreeMap<String, String>,
    /// Set when this manifest only points at another reference.
    pub alias: Option<PackageRef>,
    pub python_requires: Vec<PackageRef>,
    /// Option values applied to build requirements injected into this package.
    pub build_requires_options: DepsOptions,
    pub in_local_cache: bool,
    pub develop: bool,
    hooks: Box<dyn RecipeHooks>,
    original_requires: Option<Requirements>,
    evaluated_requires: Option<Requirements>,
}

impl Manifest {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            name: None,
            version: None,
            display_name: display_name.into(),
            requires: Requirements::new(),
            options: PackageOptions::new(),
            settings: BTreeMap::new(),
            alias: None,
            python_requires: Vec::new(),
            build_requires_options: DepsOptions::new(),
            in_local_cache: true,
            develop: false,
            hooks: Box::new(NoHooks),
            original_requires: None,
            evaluated_requires: None,
        }
    }

    /// A manifest for a named package version.
    pub fn for_package(name: &str, version: &str) -> Self {
        let mut manifest = Self::new(format!("{name}/{version}"));
        manifest.name = Some(name.to_string());
        manifest.version = Some(version.to_string());
        manifest
    }

    pub fn with_hooks(mut self, hooks: Box<dyn RecipeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_requires(mut self, requires: Requirements) -> Self {
        self.requires = requires;
        self
    }

    /// Run one lifecycle hook.
    ///
    /// Before every run of the requirements hook after the first, the
    /// requirement set is restored to what it was before the first run, so a
    /// re-evaluation never sees what an earlier evaluation added.
    pub fn run_hook(&mut self, hook: Hook) -> miette::Result<()> {
        if hook == Hook::Requirements {
            match &self.original_requires {
                None => self.original_requires = Some(self.requires.clone()),
                Some(original) => self.requires = original.clone(),
            }
        }
        let mut ctx = HookContext {
            options: &mut self.options,
            requires: &mut self.requires,
            settings: &self.settings,
        };
        match hook {
            Hook::ConfigOptions => self.hooks.config_options(&mut ctx),
            Hook::Configure => self.hooks.configure(&mut ctx),
            Hook::Requirements => self.hooks.requirements(&mut ctx),
        }
    }

    /// Remember the requirement set produced by the first evaluation; on
    /// later calls return it when the current set differs.
    pub fn check_evaluated_requires(&mut self) -> Result<(), Requirements> {
        match &self.evaluated_requires {
            None => {
                self.evaluated_requires = Some(self.requires.clone());
                Ok(())
            }
            Some(previous) if *previous != self.requires => Err(previous.clone()),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::requirement::Requirement;

    #[derive(Debug, Default)]
    struct CountingHooks {
        calls: Cell<u32>,
    }

    impl RecipeHooks for CountingHooks {
        fn requirements(&self, ctx: &mut HookContext<'_>) -> miette::Result<()> {
            self.calls.set(self.calls.get() + 1);
            ctx.requires
                .add(Requirement::new(PackageRef::new("dep", "1.0")))?;
            Ok(())
        }
    }

    #[test]
    fn requirements_hook_starts_from_original_each_time() {
        let mut m = Manifest::for_package("pkg", "1.0").with_hooks(Box::new(CountingHooks::default()));
        m.requires
            .insert(Requirement::new(PackageRef::new("base", "1.0")));

        m.run_hook(Hook::Requirements).unwrap();
        assert_eq!(m.requires.len(), 2);

        // something later rewrites the evaluated set
        m.requires.insert(Requirement::new(PackageRef::new("extra", "1.0")));
        m.run_hook(Hook::Requirements).unwrap();
        assert_eq!(m.requires.names(), vec!["base", "dep"]);
    }

    #[test]
    fn evaluated_requires_detects_changes() {
        let mut m = Manifest::for_package("pkg", "1.0");
        m.requires
            .insert(Requirement::new(PackageRef::new("a", "1.0")));
        assert!(m.check_evaluated_requires().is_ok());
        assert!(m.check_evaluated_requires().is_ok());

        m.requires
            .insert(Requirement::new(PackageRef::new("a", "2.0")));
        let previous = m.check_evaluated_requires().unwrap_err();
        assert_eq!(previous.get("a").unwrap().reference.version, "1.0");
    }

    #[test]
    fn hook_names() {
        assert_eq!(Hook::ConfigOptions.to_string(), "config_options");
        assert_eq!(Hook::Configure.to_string(), "configure");
        assert_eq!(Hook::Requirements.to_string(), "requirements");
    }
}
