/// Document types for annotated feature files
///
/// These types represent the parsed structure of one feature file. A Document
/// is built once per input file and never mutated afterwards.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// A coerced annotation value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    /// Plain or quoted text: `@url=/top`, `@str="a, b"`
    String(String),
    /// Array literal or comma list: `@sub=["a","b"]`, `@top=foo,bar`
    List(Vec<String>),
}

impl AnnotationValue {
    /// Borrow the value as a single string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AnnotationValue::String(s) => Some(s),
            AnnotationValue::List(_) => None,
        }
    }

    /// View the value as a sequence of tokens.
    ///
    /// A string is a single token, a list yields each item.
    pub fn tokens(&self) -> Vec<&str> {
        match self {
            AnnotationValue::String(s) => vec![s.as_str()],
            AnnotationValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        AnnotationValue::String(value.to_string())
    }
}

impl From<Vec<&str>> for AnnotationValue {
    fn from(items: Vec<&str>) -> Self {
        AnnotationValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Ordered, key-unique set of annotations.
///
/// Iteration follows first-insertion order. Inserting an existing key replaces
/// its value in place, so the key keeps its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    entries: Vec<(String, AnnotationValue)>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a key (last write wins)
    pub fn insert(&mut self, key: impl Into<String>, value: AnnotationValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AnnotationValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Shallow merge: a copy of `self` with every entry of `overrides` applied
    pub fn merged_with(&self, overrides: &AnnotationSet) -> AnnotationSet {
        let mut merged = self.clone();
        for (key, value) in overrides.iter() {
            merged.insert(key, value.clone());
        }
        merged
    }

    /// A copy of the set without the given keys
    pub fn without(&self, excluded: &[&str]) -> AnnotationSet {
        AnnotationSet {
            entries: self
                .entries
                .iter()
                .filter(|(k, _)| !excluded.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }

    /// Serialize as a compact JSON object in insertion order
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for AnnotationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>> FromIterator<(K, AnnotationValue)> for AnnotationSet {
    fn from_iter<I: IntoIterator<Item = (K, AnnotationValue)>>(iter: I) -> Self {
        let mut set = AnnotationSet::new();
        for (key, value) in iter {
            set.insert(key, value);
        }
        set
    }
}

/// One parsed feature file
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub feature_name: String,
    /// Annotations declared above the `Feature:` header
    pub annotations: AnnotationSet,
    pub scenarios: Vec<Scenario>,
}

/// `Scenario: <name>` block
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    /// Annotations declared above this `Scenario:` header
    pub annotations: AnnotationSet,
    pub steps: Vec<StepLine>,
}

/// Verbatim step text, used as the lookup key against step definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepLine {
    pub text: String,
    /// 1-based line number in the feature file
    pub line: usize,
}

impl StepLine {
    pub fn new(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            line,
        }
    }
}
