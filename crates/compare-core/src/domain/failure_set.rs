//! Deduplicated, immutable set of failing test case names.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{ContractViolation, Result};

/// The failing test cases of a single build.
///
/// Names are opaque and case-sensitive. Duplicates collapse on construction
/// and iteration is always in lexicographic (byte) order. There is no way to
/// add or remove names once the set exists; derived sets are new values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FailureSet {
    #[serde(deserialize_with = "deserialize_names")]
    names: BTreeSet<String>,
}

impl FailureSet {
    /// An empty failure set (a build with no failing tests).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a failure set from a JSON array of strings.
    ///
    /// Rejects anything that is not an array, and any `null` or non-string
    /// entry, instead of coercing it.
    pub fn from_json(value: &Value) -> Result<Self> {
        let entries = value.as_array().ok_or_else(|| ContractViolation::NotAnArray {
            found: json_kind(value).to_string(),
        })?;

        let mut names = BTreeSet::new();
        for (index, entry) in entries.iter().enumerate() {
            match entry {
                Value::String(name) => {
                    names.insert(name.clone());
                }
                Value::Null => return Err(ContractViolation::NullEntry { index }),
                other => {
                    return Err(ContractViolation::NonStringEntry {
                        index,
                        found: other.to_string(),
                    })
                }
            }
        }
        Ok(Self { names })
    }

    pub(crate) fn from_set(names: BTreeSet<String>) -> Self {
        Self { names }
    }

    pub(crate) fn as_set(&self) -> &BTreeSet<String> {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(String::as_str)
    }

    /// Whether every name in `self` is also in `other`.
    pub fn is_subset(&self, other: &FailureSet) -> bool {
        self.names.is_subset(&other.names)
    }

    /// Owned, sorted copy of the names.
    pub fn to_vec(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for FailureSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vec<String>> for FailureSet {
    fn from(names: Vec<String>) -> Self {
        names.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a FailureSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

impl TryFrom<Value> for FailureSet {
    type Error = ContractViolation;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_json(&value)
    }
}

impl fmt::Display for FailureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", name)?;
        }
        write!(f, "}}")
    }
}

fn deserialize_names<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    FailureSet::from_json(&value)
        .map(|set| set.names)
        .map_err(serde::de::Error::custom)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
