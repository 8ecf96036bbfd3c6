//! Building manifests from recipe files.

use std::path::Path;

use graft_core::manifest::Manifest;
use graft_core::profile::Profile;
use graft_core::recipe::RecipeFile;
use graft_core::reference::PackageRef;
use graft_util::errors::GraftError;

use crate::hooks::DeclarativeHooks;

/// Turn a parsed recipe into a manifest ready for the graph builder.
///
/// Alias recipes only carry their target. Everything else gets its static
/// requirements, declared options with defaults, dependency option values,
/// the profile settings and the declarative hooks.
pub fn manifest_from_recipe(
    recipe: &RecipeFile,
    profile: &Profile,
    locked_python_requires: Option<&[PackageRef]>,
) -> Result<Manifest, GraftError> {
    let reference = recipe.reference()?;
    let mut manifest = Manifest::for_package(&reference.name, &reference.version);
    manifest.display_name = reference.without_revision().to_string();

    manifest.alias = recipe.alias_target()?;
    if manifest.alias.is_some() {
        return Ok(manifest);
    }

    manifest.requires = recipe.static_requirements()?;

    let own_defaults = recipe.own_defaults();
    for (name, allowed) in &recipe.options {
        let default = own_defaults.get(name.as_str()).copied();
        manifest.options.declare(name, allowed.clone(), default);
    }
    if let Some(undeclared) = own_defaults.keys().find(|k| !recipe.options.contains_key(**k)) {
        return Err(GraftError::Recipe {
            message: format!(
                "{}: default-options sets undeclared option '{undeclared}'",
                manifest.display_name
            ),
        });
    }
    for (package, values) in recipe.deps_defaults().iter() {
        for (option, value) in values {
            manifest.options.set_dep(package, option, value);
        }
    }

    manifest.settings = profile.settings.clone();
    manifest.build_requires_options = profile.build_requires_options.clone();
    manifest.python_requires = match locked_python_requires {
        Some(locked) => locked.to_vec(),
        None => recipe.python_requires()?,
    };

    let hooks = DeclarativeHooks::from_recipe(recipe)?;
    if !hooks.is_empty() {
        manifest = manifest.with_hooks(Box::new(hooks));
    }
    Ok(manifest)
}

/// Load the root recipe of a resolution from disk.
pub fn load_consumer(path: &Path, profile: &Profile) -> miette::Result<Manifest> {
    let recipe = RecipeFile::from_path(path)?;
    let mut manifest = manifest_from_recipe(&recipe, profile, None)?;
    if manifest.alias.is_some() {
        return Err(GraftError::Recipe {
            message: format!("the root recipe cannot be an alias ({})", path.display()),
        }
        .into());
    }
    manifest.display_name = format!("{} ({})", manifest.display_name, path.display());
    tracing::debug!("loaded consumer {}", manifest.display_name);
    Ok(manifest)
}
