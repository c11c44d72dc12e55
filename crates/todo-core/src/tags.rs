//! Tag subsystem primitives.
//!
//! A tag is not stored on its own: it only exists as a string inside a todo's
//! [`TagSet`]. "Todos with tag T" is an inverted lookup over all todos, which
//! lives in the repository.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, TodoError};

pub(crate) const TAG_REQUIRED: &str = "\"tag\" is a required field";
pub(crate) const TAG_NOT_STRING: &str = "\"tag\" must be a string with at least one character";
pub(crate) const TAGS_REQUIRED: &str = "\"tags\" is a required field";
pub(crate) const TAGS_NOT_LIST: &str =
    "\"tags\" must be a list of strings with at least one character";

/// Set-valued tag attribute of a todo.
///
/// Keeps first-insertion order so listings are stable, but membership is what
/// matters: duplicates collapse and empty strings are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Create an empty tag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tag set, failing on the first empty tag.
    pub fn try_from_iter<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::new();
        for tag in tags {
            let tag = tag.into();
            if tag.is_empty() {
                return Err(TodoError::validation(TAGS_NOT_LIST));
            }
            set.insert(tag);
        }
        Ok(set)
    }

    /// Build a tag set from untrusted persisted data, dropping empty entries.
    ///
    /// Returns the set and the number of entries that were dropped or collapsed.
    pub fn from_lenient(tags: Vec<String>) -> (Self, usize) {
        let total = tags.len();
        let mut set = Self::new();
        for tag in tags {
            if !tag.is_empty() {
                set.insert(tag);
            }
        }
        let dropped = total - set.len();
        (set, dropped)
    }

    /// Insert a tag. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        debug_assert!(!tag.is_empty(), "empty tags must be rejected before insert");
        if self.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    /// Remove a tag. Returns `false` if it was not present.
    pub fn remove(&mut self, tag: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        self.0.len() != before
    }

    /// Exact, case-sensitive membership test
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.clone()
    }
}

impl<'de> Deserialize<'de> for TagSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tags = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_lenient(tags).0)
    }
}

/// Validate a single tag taken from an untyped request body.
///
/// Missing or `null` is a required-field error; anything that is not a
/// non-empty string is rejected as well.
pub fn parse_tag_value(value: Option<&Value>) -> Result<String> {
    match value {
        None | Some(Value::Null) => Err(TodoError::validation(TAG_REQUIRED)),
        Some(Value::String(tag)) if !tag.is_empty() => Ok(tag.clone()),
        Some(_) => Err(TodoError::validation(TAG_NOT_STRING)),
    }
}

/// Validate a tag given directly as a string (e.g. from a path segment).
pub fn validate_tag(tag: &str) -> Result<&str> {
    if tag.is_empty() {
        return Err(TodoError::validation(TAG_NOT_STRING));
    }
    Ok(tag)
}

/// Validate a list of tags taken from an untyped request body.
///
/// `null` is treated as the empty set.
pub fn parse_tag_list(value: &Value) -> Result<TagSet> {
    match value {
        Value::Null => Ok(TagSet::new()),
        Value::Array(items) => {
            let tags = items
                .iter()
                .map(|item| match item {
                    Value::String(tag) => Ok(tag.clone()),
                    _ => Err(TodoError::validation(TAGS_NOT_LIST)),
                })
                .collect::<Result<Vec<_>>>()?;
            TagSet::try_from_iter(tags)
        }
        _ => Err(TodoError::validation(TAGS_NOT_LIST)),
    }
}

/// Parse the body of a tag replacement: `{"tags": [...]}` or a bare array.
///
/// An object without a `tags` key is rejected rather than read as empty;
/// an explicit `"tags": null` clears the set.
pub fn parse_tags_body(value: &Value) -> Result<TagSet> {
    match value {
        Value::Object(map) => match map.get("tags") {
            Some(tags) => parse_tag_list(tags),
            None => Err(TodoError::validation(TAGS_REQUIRED)),
        },
        Value::Array(_) => parse_tag_list(value),
        Value::Null => Err(TodoError::validation(TAGS_REQUIRED)),
        _ => Err(TodoError::validation(TAGS_NOT_LIST)),
    }
}
