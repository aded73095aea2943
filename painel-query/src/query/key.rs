//! Query keys.
//!
//! A key is an ordered scope path plus a canonical parameter map. Parameters
//! are kept in a `BTreeMap` so two keys built with the same options in a
//! different order compare and hash equal, and absent options never appear.

use std::collections::BTreeMap;
use std::fmt;

/// Scalar parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Identity of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    scope: Vec<String>,
    params: BTreeMap<String, ParamValue>,
}

impl QueryKey {
    /// Key with a scope path and no parameters.
    pub fn new<I, S>(scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope: scope.into_iter().map(Into::into).collect(),
            params: BTreeMap::new(),
        }
    }

    /// Attach a parameter bag.
    pub fn with_params(mut self, params: ParamBag) -> Self {
        self.params = params.0;
        self
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Stable string form, e.g. `category-screening/alta_do_dia?limit=5&setor=Energy`.
    pub fn canonical(&self) -> String {
        let mut out = self.scope.join("/");
        if !self.params.is_empty() {
            out.push('?');
            let pairs: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            out.push_str(&pairs.join("&"));
        }
        out
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Builder for the parameter part of a key.
#[derive(Debug, Clone, Default)]
pub struct ParamBag(BTreeMap<String, ParamValue>);

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Insert only when the value is present.
    pub fn insert_opt<V: Into<ParamValue>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.insert(name, v),
            None => self,
        }
    }
}

/// Scope-prefix matcher used by invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    prefix: Vec<String>,
}

impl KeyPattern {
    pub fn prefix<I, S>(prefix: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: prefix.into_iter().map(Into::into).collect(),
        }
    }

    /// Pattern that matches every key.
    pub fn all() -> Self {
        Self { prefix: Vec::new() }
    }

    /// Pattern that matches exactly this key's scope (and any parameters).
    pub fn from_key(key: &QueryKey) -> Self {
        Self {
            prefix: key.scope.clone(),
        }
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        key.scope.len() >= self.prefix.len()
            && self.prefix.iter().zip(&key.scope).all(|(p, s)| p == s)
    }
}
