//! Build-time argument registry
//!
//! Arguments are declared first and resolved afterwards. The renderer only
//! ever borrows an [`ArgumentRegistry`] immutably, so declarations cannot
//! interleave with resolution and shadow one another.

use super::error::PlanError;
use super::token::is_valid_name;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A named build-time parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArgument {
    pub name: String,
    /// Default value, possibly empty
    pub default: String,
    /// Value chosen during rendering; `None` until resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
}

impl BuildArgument {
    pub fn value(&self) -> &str {
        self.resolved.as_deref().unwrap_or(&self.default)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArgumentRegistry {
    arguments: Vec<BuildArgument>,
    index: HashMap<String, usize>,
}

impl ArgumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(name, default)` pairs, in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, PlanError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut registry = Self::new();
        for (name, default) in pairs {
            registry.declare(name, default)?;
        }
        Ok(registry)
    }

    pub fn declare(
        &mut self,
        name: impl Into<String>,
        default: impl Into<String>,
    ) -> Result<(), PlanError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(PlanError::InvalidArgumentName(name));
        }
        if self.index.contains_key(&name) {
            return Err(PlanError::DuplicateArgument(name));
        }

        let default = default.into();
        debug!(argument = %name, default = %default, "Declared build argument");
        self.index.insert(name.clone(), self.arguments.len());
        self.arguments.push(BuildArgument {
            name,
            default,
            resolved: None,
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&BuildArgument> {
        self.index.get(name).map(|&i| &self.arguments[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildArgument> {
        self.arguments.iter()
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Returns `override_value` if given, otherwise the declared default.
    pub fn resolve(&self, name: &str, override_value: Option<&str>) -> Result<String, PlanError> {
        let argument = self.get(name).ok_or_else(|| self.undeclared(name))?;
        Ok(override_value.unwrap_or(&argument.default).to_string())
    }

    /// Resolve every declared argument against `overrides`.
    ///
    /// Every override key must name a declared argument.
    pub fn resolve_all(&self, overrides: &BuildOverrides) -> Result<ResolvedArguments, PlanError> {
        if let Some(name) = overrides.keys().find(|name| !self.contains(name)) {
            return Err(self.undeclared(name));
        }

        let mut arguments = Vec::with_capacity(self.arguments.len());
        for argument in &self.arguments {
            let value = self.resolve(&argument.name, overrides.get(&argument.name))?;
            arguments.push(BuildArgument {
                resolved: Some(value),
                ..argument.clone()
            });
        }

        Ok(ResolvedArguments::new(arguments))
    }

    fn undeclared(&self, name: &str) -> PlanError {
        let suggestion = self
            .arguments
            .iter()
            .map(|arg| (strsim::jaro_winkler(name, &arg.name), &arg.name))
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, candidate)| candidate.clone());

        PlanError::UndeclaredArgument {
            name: name.to_string(),
            suggestion,
        }
    }
}

/// Caller-supplied argument values, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOverrides(BTreeMap<String, String>);

impl BuildOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Parse `KEY=VALUE` pairs. The value may itself contain `=`.
    pub fn parse<I, S>(pairs: I) -> Result<Self, PlanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    overrides.insert(key.trim(), value);
                }
                _ => return Err(PlanError::InvalidOverride(pair.to_string())),
            }
        }
        Ok(overrides)
    }

    /// Add entries from `other` that are not already present.
    pub fn merge_missing(&mut self, other: &BuildOverrides) {
        for (key, value) in &other.0 {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BuildOverrides {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut overrides = Self::new();
        for (key, value) in iter {
            overrides.insert(key, value);
        }
        overrides
    }
}

/// Arguments with their resolved values fixed, in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedArguments {
    arguments: Vec<BuildArgument>,
}

impl ResolvedArguments {
    fn new(arguments: Vec<BuildArgument>) -> Self {
        Self { arguments }
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name)
            .and_then(|arg| arg.resolved.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildArgument> {
        self.arguments.iter()
    }

    pub fn into_vec(self) -> Vec<BuildArgument> {
        self.arguments
    }
}
