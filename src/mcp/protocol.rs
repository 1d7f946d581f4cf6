//! Action protocol types
//!
//! One JSON request envelope per line in, one JSON response envelope per
//! line out. Requests name an action and carry its parameters plus the
//! transport-level query and header maps used for scope hints.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::scope::{HintSources, NAMESPACE_HEADER, ScopeResolver};

/// Envelope version written on every response
pub const PROTOCOL_VERSION: &str = "1.0";

/// Caller-chosen request identifier, echoed back on the response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl RequestId {
    /// Fresh random identifier for requests that did not supply one
    #[inline]
    pub fn generate() -> Self {
        Self::String(Uuid::new_v4().simple().to_string())
    }
}

/// Incoming action request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub id: Option<RequestId>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Map<String, Value>,
    /// Query-string style hints (`conv`, `ns`)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub query: HashMap<String, String>,
    /// Header style hints (`X-Doc-NS`), matched case-insensitively
    #[serde(default, deserialize_with = "null_as_empty")]
    pub headers: HashMap<String, String>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ActionRequest {
    #[inline]
    pub fn new(action: &str, parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        Self {
            action: Some(action.to_string()),
            parameters,
            ..Self::default()
        }
    }

    /// String-valued parameter; numbers are accepted and rendered as text
    #[inline]
    pub fn param_str(&self, name: &str) -> Option<String> {
        match self.parameters.get(name)? {
            Value::String(value) => Some(value.clone()),
            Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Resolve scope hints: parameters, then the query map, then headers
    #[inline]
    pub fn scope_resolver(&self) -> ScopeResolver {
        let conversation_field = self
            .param_str("conversationId")
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.param_str("conv"));
        let namespace_field = self.param_str("ns");

        let conversation = HintSources {
            field: conversation_field.as_deref(),
            query: self.query.get("conv").map(String::as_str),
            header: None,
        };
        let namespace = HintSources {
            field: namespace_field.as_deref(),
            query: self.query.get("ns").map(String::as_str),
            header: self.header(NAMESPACE_HEADER),
        };

        ScopeResolver::from_hints(conversation, namespace)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Machine-readable failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCode {
    Validation,
    Upstream,
    Internal,
}

/// Outgoing response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub version: String,
    pub id: RequestId,
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ActionResponse {
    #[inline]
    pub fn success(id: RequestId, data: Value) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            id,
            status: ResponseStatus::Success,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    #[inline]
    pub fn error(id: RequestId, message: String, code: ErrorCode) -> Self {
        Self {
            version: PROTOCOL_VERSION.to_string(),
            id,
            status: ResponseStatus::Error,
            data: None,
            error: Some(message),
            code: Some(code),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
