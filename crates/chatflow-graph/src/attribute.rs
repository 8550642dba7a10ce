//! Typed access to node attributes
//!
//! Bot models store attributes as `{ name, value: { value } }` objects keyed by
//! an opaque attribute id. The attribute *name* is what carries meaning, so it
//! is parsed into [`AttributeName`] once at load time.

use serde::{Serialize, Serializer};

/// Known attribute names, with a catch-all for everything else
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeName {
    /// `Name` (bot display name, node label name)
    Name,
    /// `Intent Keyword` on incoming-message nodes
    IntentKeyword,
    /// `Function Name` on bot-action nodes
    FunctionName,
    /// `Intent Label` on incoming-message nodes
    IntentLabel,
    /// Any attribute this crate does not interpret
    Unknown(String),
}

impl AttributeName {
    /// Wire spelling of the attribute name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Name => "Name",
            Self::IntentKeyword => "Intent Keyword",
            Self::FunctionName => "Function Name",
            Self::IntentLabel => "Intent Label",
            Self::Unknown(name) => name,
        }
    }
}

impl From<&str> for AttributeName {
    fn from(value: &str) -> Self {
        match value {
            "Name" => Self::Name,
            "Intent Keyword" => Self::IntentKeyword,
            "Function Name" => Self::FunctionName,
            "Intent Label" => Self::IntentLabel,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl Serialize for AttributeName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// A single attribute with its value flattened to text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Parsed attribute name
    pub name: AttributeName,
    /// Value as text; `None` when absent or JSON `null`
    pub value: Option<String>,
}

impl Attribute {
    /// Create attribute from name and value
    #[must_use]
    pub fn new(name: impl Into<AttributeName>, value: Option<impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            value: value.map(Into::into),
        }
    }

    /// Non-empty text value, if any
    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.value.as_deref().filter(|v| !v.is_empty())
    }

    /// Flatten a raw JSON attribute value into text
    pub(crate) fn flatten(value: &serde_json::Value) -> Option<String> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl From<String> for AttributeName {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}
