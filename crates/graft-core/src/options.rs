//! Package options and their propagation towards dependencies.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::reference::PackageRef;

/// Allowed-values marker accepting any value.
pub const ANY_VALUE: &str = "ANY";

/// Option values addressed to other packages: package name → option → value.
///
/// Serialized as a flat table of `"pkg:option" = "value"` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct DepsOptions(BTreeMap<String, BTreeMap<String, String>>);

impl DepsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, package: &str, option: &str, value: &str) {
        self.0
            .entry(package.to_string())
            .or_default()
            .insert(option.to_string(), value.to_string());
    }

    /// Set a value only when nothing was assigned for that option yet.
    pub fn set_default(&mut self, package: &str, option: &str, value: &str) {
        self.0
            .entry(package.to_string())
            .or_default()
            .entry(option.to_string())
            .or_insert_with(|| value.to_string());
    }

    pub fn get(&self, package: &str) -> Option<&BTreeMap<String, String>> {
        self.0.get(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, String>)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }

    /// Parse a `pkg:option` key.
    pub fn split_key(key: &str) -> Option<(&str, &str)> {
        let (package, option) = key.split_once(':')?;
        if package.is_empty() || option.is_empty() {
            return None;
        }
        Some((package, option))
    }
}

impl TryFrom<BTreeMap<String, String>> for DepsOptions {
    type Error = String;

    fn try_from(flat: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut options = DepsOptions::new();
        for (key, value) in &flat {
            let (package, option) = DepsOptions::split_key(key)
                .ok_or_else(|| format!("option '{key}' must be written as 'package:option'"))?;
            options.set(package, option, value);
        }
        Ok(options)
    }
}

impl From<DepsOptions> for BTreeMap<String, String> {
    fn from(options: DepsOptions) -> Self {
        let mut flat = BTreeMap::new();
        for (package, values) in options.0 {
            for (option, value) in values {
                flat.insert(format!("{package}:{option}"), value);
            }
        }
        flat
    }
}

/// The options of one package plus the values it passes upstream.
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Option name → allowed values. An empty list or [`ANY_VALUE`] accepts anything.
    declared: BTreeMap<String, Vec<String>>,
    values: BTreeMap<String, String>,
    /// Who assigned a value from downstream, for conflict messages.
    assigned_by: BTreeMap<String, String>,
    deps: DepsOptions,
}

impl PackageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an option with its allowed values and optional default.
    pub fn declare(&mut self, name: &str, allowed: Vec<String>, default: Option<&str>) {
        self.declared.insert(name.to_string(), allowed);
        if let Some(value) = default {
            self.values.insert(name.to_string(), value.to_string());
        }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Assign one of this package's own options.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        if !self.is_declared(name) {
            return Err(self.unknown_option(name));
        }
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Drop an option entirely (e.g. one that does not apply on this platform).
    pub fn remove(&mut self, name: &str) {
        self.declared.remove(name);
        self.values.remove(name);
        self.assigned_by.remove(name);
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Set an option value for a dependency. Downstream values still win.
    pub fn set_dep(&mut self, package: &str, option: &str, value: &str) {
        self.deps.set(package, option, value);
    }

    /// Option values this package propagates to its dependencies.
    pub fn deps_values(&self) -> &DepsOptions {
        &self.deps
    }

    /// Take option values coming from downstream.
    ///
    /// Values addressed to this package are assigned to its own options; a
    /// second downstream consumer trying to assign a different value is an
    /// error. Values for other packages pass through and replace whatever this
    /// package itself would have set.
    pub fn propagate_upstream(
        &mut self,
        down: &DepsOptions,
        down_ref: Option<&PackageRef>,
        own_name: &str,
    ) -> Result<(), String> {
        let down_name = down_ref.map_or_else(|| "root".to_string(), ToString::to_string);
        for (package, values) in down.iter() {
            if package == own_name {
                for (option, value) in values {
                    if !self.is_declared(option) {
                        return Err(self.unknown_option(option));
                    }
                    if let Some(previous_by) = self.assigned_by.get(option) {
                        let current = self.values.get(option).map(String::as_str).unwrap_or("");
                        if current != value {
                            return Err(format!(
                                "{down_name} tried to change {own_name} option {option} to {value} \
                                 but it was already assigned to {current} by {previous_by}"
                            ));
                        }
                        continue;
                    }
                    self.values.insert(option.clone(), value.clone());
                    self.assigned_by.insert(option.clone(), down_name.clone());
                }
            } else {
                for (option, value) in values {
                    self.deps.set(package, option, value);
                }
            }
        }
        Ok(())
    }

    /// Check every declared option has a value from its allowed set.
    pub fn validate(&self) -> Result<(), String> {
        for (name, allowed) in &self.declared {
            let Some(value) = self.values.get(name) else {
                return Err(format!("'options.{name}' value not defined"));
            };
            let any = allowed.is_empty() || allowed.iter().any(|a| a == ANY_VALUE);
            if !any && !allowed.contains(value) {
                return Err(format!(
                    "'{value}' is not a valid 'options.{name}' value.\nPossible values are {allowed:?}"
                ));
            }
        }
        Ok(())
    }

    fn unknown_option(&self, name: &str) -> String {
        let possible: Vec<&String> = self.declared.keys().collect();
        format!("option '{name}' doesn't exist\nPossible options are {possible:?}")
    }
}

impl fmt::Display for PackageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
