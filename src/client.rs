use crate::config::RequestConfig;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Message shown when a failed response carries no `detail`
pub const GENERIC_FAILURE: &str = "Request failed";

/// Errors surfaced by a single `/ask` round trip
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request could not be sent or the body could not be read
    #[error("{0}")]
    Network(#[from] reqwest::Error),
    /// The body was not JSON
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// Non-2xx status; the message is the backend's `detail` when present
    #[error("{message}")]
    Status { status: u16, message: String },
}

/// Body of `POST /ask`
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl AskRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            provider: None,
        }
    }

    pub fn with_overrides(mut self, overrides: &RequestConfig) -> Self {
        self.top_k = overrides.top_k;
        self.provider = overrides.provider.clone();
        self
    }
}

/// Successful `/ask` response. Fields are read leniently from the JSON body:
/// only their presence is checked, never their types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AskResponse {
    pub answer: Option<String>,
    pub sources: Option<Vec<Source>>,
}

impl AskResponse {
    /// Pick `answer` and `sources` out of any JSON value. A body that is not
    /// an object simply has neither.
    pub fn from_value(data: &Value) -> Self {
        let answer = data.get("answer").and_then(answer_text);
        let sources = data
            .get("sources")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Source::from_value).collect());

        Self { answer, sources }
    }
}

/// Falsy answers (`null`, `false`, `0`, `""`) count as no answer; any other
/// non-string value is shown as its JSON text.
fn answer_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(text) if text.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(display_value(other)),
    }
}

/// A citation backing an answer. Each field keeps whatever JSON the backend
/// sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Source {
    pub rank: Option<Value>,
    pub score: Option<Value>,
    pub id: Option<Value>,
    pub path: Option<String>,
}

impl Source {
    pub fn from_value(item: &Value) -> Self {
        Self {
            rank: item.get("rank").cloned(),
            score: item.get("score").cloned(),
            id: item.get("id").cloned(),
            path: item.get("path").and_then(Value::as_str).map(str::to_string),
        }
    }

    /// `#<rank> (<score>) - <id>`
    pub fn summary(&self) -> String {
        format!(
            "#{} ({}) - {}",
            field_text(&self.rank),
            field_text(&self.score),
            field_text(&self.id)
        )
    }
}

fn field_text(field: &Option<Value>) -> String {
    field.as_ref().map(display_value).unwrap_or_default()
}

/// Strings as-is, whole floats without a fraction (`1.0` as `1`), anything
/// else as its JSON text.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(n) if n.is_f64() => n
            .as_f64()
            .map(|f| f.to_string())
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// HTTP client bound to one backend endpoint
#[derive(Clone)]
pub struct RagClient {
    endpoint: String,
    overrides: RequestConfig,
    client: reqwest::Client,
}

impl RagClient {
    /// No timeout is configured: a request waits until the network layer
    /// itself gives up.
    pub fn new(endpoint: impl Into<String>, overrides: RequestConfig) -> Self {
        Self {
            endpoint: endpoint.into(),
            overrides,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn ask_url(&self) -> String {
        format!("{}/ask", self.endpoint.trim_end_matches('/'))
    }

    /// Send one query and decode the answer.
    pub async fn ask(&self, query: &str) -> Result<AskResponse, RequestError> {
        let url = self.ask_url();
        let payload = AskRequest::new(query).with_overrides(&self.overrides);

        tracing::debug!(%url, "sending query");
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        // The body is parsed before the status is looked at, so a failed
        // response with a non-JSON body reports the decode error.
        let data: Value = serde_json::from_str(&body)?;
        tracing::debug!(status = status.as_u16(), "query settled");

        if !status.is_success() {
            return Err(RequestError::Status {
                status: status.as_u16(),
                message: failure_message(&data),
            });
        }

        Ok(AskResponse::from_value(&data))
    }
}

fn failure_message(data: &Value) -> String {
    match data.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::Null) | None => GENERIC_FAILURE.to_string(),
        Some(Value::String(_)) => GENERIC_FAILURE.to_string(),
        Some(other) => other.to_string(),
    }
}
