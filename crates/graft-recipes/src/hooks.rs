//! Hooks driven by the declarative rules of a recipe file.

use graft_core::manifest::{HookContext, RecipeHooks};
use graft_core::options::DepsOptions;
use graft_core::recipe::RecipeFile;
use graft_core::reference::PackageRef;
use graft_core::requirement::Requirement;
use graft_util::errors::GraftError;

#[derive(Debug, Clone)]
struct Conditional {
    option: String,
    value: String,
    requires: Vec<PackageRef>,
}

#[derive(Debug, Clone)]
struct ConfigureRule {
    option: String,
    value: String,
    set: DepsOptions,
}

/// `requirements()` adds the `[[conditional]]` requirements whose option
/// matches; `configure()` applies the `[[configure]]` dependency options.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeHooks {
    conditionals: Vec<Conditional>,
    configure: Vec<ConfigureRule>,
}

impl DeclarativeHooks {
    pub fn from_recipe(recipe: &RecipeFile) -> Result<Self, GraftError> {
        let mut conditionals = Vec::new();
        for c in &recipe.conditionals {
            let requires = c
                .requires
                .iter()
                .map(|s| PackageRef::parse(s))
                .collect::<Result<Vec<_>, _>>()?;
            conditionals.push(Conditional {
                option: c.option.clone(),
                value: c.value.clone(),
                requires,
            });
        }
        let configure = recipe
            .configure_rules
            .iter()
            .map(|r| ConfigureRule {
                option: r.option.clone(),
                value: r.value.clone(),
                set: r.set.clone(),
            })
            .collect();
        Ok(Self {
            conditionals,
            configure,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty() && self.configure.is_empty()
    }
}

impl RecipeHooks for DeclarativeHooks {
    fn configure(&self, ctx: &mut HookContext<'_>) -> miette::Result<()> {
        for rule in &self.configure {
            if ctx.options.get(&rule.option) != Some(rule.value.as_str()) {
                continue;
            }
            for (package, values) in rule.set.iter() {
                for (option, value) in values {
                    ctx.options.set_dep(package, option, value);
                }
            }
        }
        Ok(())
    }

    fn requirements(&self, ctx: &mut HookContext<'_>) -> miette::Result<()> {
        for cond in &self.conditionals {
            if ctx.options.get(&cond.option) != Some(cond.value.as_str()) {
                continue;
            }
            for reference in &cond.requires {
                ctx.requires.add(Requirement::new(reference.clone()))?;
            }
        }
        Ok(())
    }
}
