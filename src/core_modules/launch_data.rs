// THEORY:
// `LaunchPayload` is the typed form of the `initData` a Telegram client hands to the
// Mini-App at start-up: a flat set of string fields plus a `hash` signature over them.
//
// The client may deliver it in two shapes and both land here:
// - the raw query string (`query_id=...&user=%7B...%7D&auth_date=...&hash=...`),
//   decoded with form-urlencoding rules, where `user` is itself a JSON document;
// - an already unpacked JSON object of scalar fields.
//
// Fields live in a `BTreeMap`, so the canonical check-string (every field except
// `hash`, sorted by key, `key=value` joined with '\n') is a plain in-order walk. The
// `hash` is stored apart from the fields and can never leak into the check-string.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::VerificationError;

/// The payload field that carries the signature.
pub const HASH_FIELD: &str = "hash";
/// Field holding the JSON-encoded user in the query-string form.
const USER_FIELD: &str = "user";

/// An untrusted, signed identity claim.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchPayload {
    fields: BTreeMap<String, String>,
    hash: Option<String>,
}

/// A Telegram user id. Numeric ids stay numbers on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum UserId {
    Numeric(i64),
    Text(String),
}

impl UserId {
    /// Reads an id from its text form; integers become `Numeric`.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(id) => UserId::Numeric(id),
            Err(_) => UserId::Text(raw.to_string()),
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(match number.as_i64() {
                Some(id) => UserId::Numeric(id),
                None => UserId::Text(number.to_string()),
            }),
            Value::String(text) => Some(UserId::Text(text.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(id) => write!(f, "{id}"),
            UserId::Text(id) => f.write_str(id),
        }
    }
}

/// Public profile fields of the user behind a launch payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct UserProfile {
    pub id: Option<UserId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

impl LaunchPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a payload from key/value pairs; a `hash` pair becomes the signature and
    /// a repeated key keeps its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut payload = Self::new();
        for (key, value) in pairs {
            payload.insert(key, value);
        }
        payload
    }

    /// Parses the raw `initData` query string.
    ///
    /// A key that appears twice makes the payload ambiguous and is rejected.
    pub fn parse_query(raw: &str) -> Result<Self, VerificationError> {
        let mut payload = Self::new();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            if payload.contains(&key) {
                return Err(VerificationError::MalformedPayload(format!(
                    "field `{key}` appears more than once"
                )));
            }
            payload.insert(key.into_owned(), value.into_owned());
        }
        Ok(payload)
    }

    /// Builds a payload from a flat JSON object.
    ///
    /// Scalars are rendered as text (`1` -> "1", `true` -> "true", `null` -> "null");
    /// nested arrays or objects are rejected.
    pub fn from_json_object(object: &Map<String, Value>) -> Result<Self, VerificationError> {
        let mut payload = Self::new();
        for (key, value) in object {
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                Value::Null => "null".to_string(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(VerificationError::MalformedPayload(format!(
                        "field `{key}` is not a scalar"
                    )));
                }
            };
            payload.insert(key.clone(), text);
        }
        Ok(payload)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if key == HASH_FIELD {
            self.hash = Some(value.into());
        } else {
            self.fields.insert(key, value.into());
        }
    }

    fn contains(&self, key: &str) -> bool {
        if key == HASH_FIELD {
            self.hash.is_some()
        } else {
            self.fields.contains_key(key)
        }
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        if key == HASH_FIELD {
            return self.hash();
        }
        self.fields.get(key).map(String::as_str)
    }

    /// Signed fields in check-string order (the hash excluded).
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The canonical message that the signature covers.
    pub fn check_string(&self) -> String {
        self.fields()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Public user fields, read from the JSON `user` field when present and from
    /// top-level fields otherwise.
    pub fn user_profile(&self) -> UserProfile {
        let embedded = self
            .fields
            .get(USER_FIELD)
            .and_then(|raw| serde_json::from_str::<Map<String, Value>>(raw).ok());

        match embedded {
            Some(user) => {
                let field = |name: &str| user.get(name).and_then(scalar_text);
                UserProfile {
                    id: user.get("id").and_then(UserId::from_json),
                    first_name: field("first_name"),
                    last_name: field("last_name"),
                    username: field("username"),
                    language_code: field("language_code"),
                }
            }
            None => {
                let field = |name: &str| self.fields.get(name).cloned();
                UserProfile {
                    id: self.fields.get("id").map(|raw| UserId::parse(raw)),
                    first_name: field("first_name"),
                    last_name: field("last_name"),
                    username: field("username"),
                    language_code: field("language_code"),
                }
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
