//! Environment layering for spawned agents.

use std::collections::{BTreeMap, HashMap};

/// Environment variables supplied by the caller of `spawn`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionEnv {
    vars: BTreeMap<String, String>,
}

impl ExecutionEnv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one variable.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Return a copy with `overrides` applied on top.
    #[must_use]
    pub fn with_overrides<'a, I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        for (key, value) in overrides {
            self.vars.insert(key.clone(), value.clone());
        }
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ExecutionEnv {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for ExecutionEnv {
    fn from(vars: HashMap<String, String>) -> Self {
        vars.into_iter().collect()
    }
}

/// Layer backend-mandated variables over the caller's.
///
/// Later layers win on key collisions; caller keys no layer mentions pass
/// through unchanged.
#[must_use]
pub fn merge_env<'a, L>(caller: &ExecutionEnv, mandated: L) -> BTreeMap<String, String>
where
    L: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut merged: BTreeMap<String, String> = caller
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    for (key, value) in mandated {
        if let Some(previous) = merged.insert(key.to_string(), value.to_string()) {
            if previous != value && caller.get(key).is_some() {
                tracing::debug!(key, "Backend-mandated variable overrides caller value");
            }
        }
    }

    merged
}
