//! Domain types for the ssh.cx API.
//!
//! # Design
//! The service does not publish a schema, so every known field is optional
//! and anything unrecognized lands in `extra`. A record that fails to match
//! even this loose shape is surfaced as `Reply::Unknown` instead of an error.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The two parallel entities the API manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Url,
    File,
}

impl Resource {
    /// Path segment under the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Url => "url",
            Resource::File => "file",
        }
    }
}

/// Identifies exactly one record, resolved server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Id(u64),
    Short(String),
}

impl Reference {
    /// Request parameter as sent on the wire.
    pub(crate) fn param(&self) -> (&'static str, String) {
        match self {
            Reference::Id(id) => ("id", id.to_string()),
            Reference::Short(code) => ("short", code.clone()),
        }
    }
}

/// A shortened link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    /// Target URL the short link redirects to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Answer to a demo-token request or a demo-token exchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DemoGrant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Normalized response of a successful call.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    /// A single record.
    One(T),
    /// A list of records.
    Many(Vec<T>),
    /// 2xx with an empty body. The service uses this for some deletes; it is
    /// reported as-is rather than treated as an error.
    NoContent,
    /// Valid JSON that does not match the record type.
    Unknown(Value),
}

impl<T> Reply<T> {
    /// The single record, if this reply carries exactly one.
    pub fn one(self) -> Option<T> {
        match self {
            Reply::One(record) => Some(record),
            _ => None,
        }
    }

    /// All records carried by this reply; empty for `NoContent` and `Unknown`.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Reply::One(record) => vec![record],
            Reply::Many(records) => records,
            Reply::NoContent | Reply::Unknown(_) => Vec::new(),
        }
    }

    pub fn is_no_content(&self) -> bool {
        matches!(self, Reply::NoContent)
    }
}

impl<T: Serialize> Reply<T> {
    /// JSON rendering for display; `NoContent` becomes `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Reply::One(record) => serde_json::to_value(record).unwrap_or(Value::Null),
            Reply::Many(records) => serde_json::to_value(records).unwrap_or(Value::Null),
            Reply::NoContent => Value::Null,
            Reply::Unknown(value) => value.clone(),
        }
    }
}

/// Accepts an id as a JSON number or a numeric string.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid id {n}"))),
        Some(Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid id {s:?}"))),
        Some(other) => Err(serde::de::Error::custom(format!("invalid id {other}"))),
    }
}
