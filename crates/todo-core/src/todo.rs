//! Todo records, their identity, and the payloads that create or change them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{Result, TodoError};
use crate::tags::{parse_tag_list, TagSet};

pub(crate) const TITLE_REQUIRED: &str = "\"title\" is a required field";
pub(crate) const TITLE_NOT_STRING: &str = "\"title\" must be a string with at least one character";

/// Identity of a todo.
///
/// Ids handed out by the in-process allocator are numeric; ids generated by a
/// document store are opaque strings. Numeric ids sort before store keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TodoId {
    /// Allocator-assigned sequence number
    Seq(u64),
    /// Store-assigned key
    Key(String),
}

impl TodoId {
    /// Parse an id from its textual form (a path segment or a store key).
    ///
    /// Canonical decimal numbers become [`TodoId::Seq`]; everything else,
    /// including numbers with leading zeros, stays a [`TodoId::Key`] so the
    /// textual form round-trips.
    pub fn parse(s: &str) -> Self {
        let canonical = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_digit())
            && (s == "0" || !s.starts_with('0'));
        if canonical {
            if let Ok(n) = s.parse::<u64>() {
                return TodoId::Seq(n);
            }
        }
        TodoId::Key(s.to_string())
    }

    /// The numeric value, if this id came from the allocator
    pub fn as_seq(&self) -> Option<u64> {
        match self {
            TodoId::Seq(n) => Some(*n),
            TodoId::Key(_) => None,
        }
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoId::Seq(n) => write!(f, "{}", n),
            TodoId::Key(k) => f.write_str(k),
        }
    }
}

impl From<u64> for TodoId {
    fn from(n: u64) -> Self {
        TodoId::Seq(n)
    }
}

/// A task record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    /// Client-side sort hint, kept exactly as the client sent it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Number>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub tags: TagSet,
}

impl Todo {
    /// Create a todo from a validated payload and an assigned id
    pub fn new(id: TodoId, payload: NewTodo) -> Self {
        Self {
            id,
            title: payload.title,
            order: payload.order,
            completed: payload.completed,
            tags: payload.tags,
        }
    }

    /// Resource URL of this todo relative to `base` (e.g. `http://host:8080`).
    ///
    /// Derived at read time, never stored.
    pub fn url(&self, base: &str) -> String {
        format!("{}/todos/{}", base.trim_end_matches('/'), self.id)
    }

    /// Persisted form of this todo (the id is the document key)
    pub fn to_document(&self) -> TodoDocument {
        TodoDocument {
            title: self.title.clone(),
            order: self.order.clone(),
            completed: self.completed,
            tags: self.tags.to_vec(),
        }
    }
}

/// Document shape stored by a [`crate::store::TodoStore`], keyed by store id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoDocument {
    pub title: String,
    #[serde(default)]
    pub order: Option<Number>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Validated payload for creating a todo
#[derive(Debug, Clone, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub order: Option<Number>,
    pub completed: bool,
    pub tags: TagSet,
}

impl NewTodo {
    /// Payload with only a title; everything else defaulted
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            order: None,
            completed: false,
            tags: TagSet::new(),
        }
    }

    pub fn with_order(mut self, order: impl Into<Number>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Persisted form of the todo this payload creates
    pub fn to_document(&self) -> TodoDocument {
        TodoDocument {
            title: self.title.clone(),
            order: self.order.clone(),
            completed: self.completed,
            tags: self.tags.to_vec(),
        }
    }

    /// Check the invariants of a payload built in code
    pub fn validate(&self) -> Result<()> {
        if self.title.is_empty() {
            return Err(TodoError::validation(TITLE_REQUIRED));
        }
        Ok(())
    }

    /// Validate an untyped request body.
    ///
    /// `title` must be a non-empty string. `completed` defaults to `false`,
    /// `tags` to the empty set; `order` is optional. Unknown fields, including
    /// any client-supplied `id` or `url`, are ignored.
    pub fn from_value(value: Value) -> Result<Self> {
        let body = as_object(&value)?;

        let title = match body.get("title") {
            None | Some(Value::Null) => return Err(TodoError::validation(TITLE_REQUIRED)),
            Some(Value::String(s)) if s.is_empty() => {
                return Err(TodoError::validation(TITLE_REQUIRED))
            }
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(TodoError::validation(TITLE_NOT_STRING)),
        };

        let completed = match body.get("completed") {
            None | Some(Value::Null) => false,
            Some(v) => parse_completed(v)?,
        };

        let order = match body.get("order") {
            None => None,
            Some(v) => parse_order(v)?,
        };

        let tags = match body.get("tags") {
            None => TagSet::new(),
            Some(v) => parse_tag_list(v)?,
        };

        Ok(Self {
            title,
            order,
            completed,
            tags,
        })
    }
}

/// Partial update of a todo.
///
/// Shallow merge: every field that is `Some` fully replaces the stored value.
/// `tags` replaces the whole set rather than appending to it. `order` is
/// doubly optional so that an explicit `null` clears the sort hint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub order: Option<Option<Number>>,
    pub completed: Option<bool>,
    pub tags: Option<TagSet>,
}

impl TodoPatch {
    /// Validate an untyped request body. Unknown fields are ignored.
    pub fn from_value(value: Value) -> Result<Self> {
        let body = as_object(&value)?;

        let title = match body.get("title") {
            None => None,
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(_) => return Err(TodoError::validation(TITLE_NOT_STRING)),
        };

        let completed = match body.get("completed") {
            None => None,
            Some(v) => Some(parse_completed(v)?),
        };

        let order = match body.get("order") {
            None => None,
            Some(v) => Some(parse_order(v)?),
        };

        let tags = match body.get("tags") {
            None => None,
            Some(v) => Some(parse_tag_list(v)?),
        };

        Ok(Self {
            title,
            order,
            completed,
            tags,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.order.is_none() && self.completed.is_none() && self.tags.is_none()
    }

    /// Merge this patch into `todo`
    pub fn apply(self, todo: &mut Todo) {
        if let Some(title) = self.title {
            todo.title = title;
        }
        if let Some(order) = self.order {
            todo.order = order;
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(tags) = self.tags {
            todo.tags = tags;
        }
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| TodoError::validation("request body must be a JSON object"))
}

fn parse_completed(value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| TodoError::validation("\"completed\" must be a boolean"))
}

fn parse_order(value: &Value) -> Result<Option<Number>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(Some(n.clone())),
        _ => Err(TodoError::validation("\"order\" must be a number")),
    }
}
