use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use trrbot_core::errors::BotError;

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("slack request `{method}` failed: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("slack request `{method}` returned HTTP {status}")]
    Http { method: String, status: u16 },
    #[error("slack method `{method}` returned error `{error}`")]
    Slack { method: String, error: String },
    #[error("slack method `{method}` returned an unexpected payload: {message}")]
    Decode { method: String, message: String },
}

impl ApiError {
    pub fn method(&self) -> &str {
        match self {
            Self::Transport { method, .. }
            | Self::Http { method, .. }
            | Self::Slack { method, .. }
            | Self::Decode { method, .. } => method,
        }
    }
}

impl From<ApiError> for BotError {
    fn from(error: ApiError) -> Self {
        let method = error.method().to_owned();
        BotError::slack_api(error.to_string()).with_context("slack_method", method)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostedMessage {
    pub channel: String,
    pub ts: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub channel_id: String,
    pub thread_ts: Option<String>,
    pub filename: String,
    pub title: String,
    pub initial_comment: Option<String>,
    pub content: Vec<u8>,
}

/// The slice of the Slack Web API the bot talks to.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, ApiError>;

    /// `name` is the bare emoji name, without surrounding colons.
    async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<(), ApiError>;

    async fn upload_file(&self, upload: FileUpload) -> Result<(), ApiError>;
}

pub struct WebApiClient {
    http: Client,
    base_url: String,
    bot_token: SecretString,
}

impl WebApiClient {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_base_url(bot_token, DEFAULT_API_BASE_URL)
    }

    pub fn with_base_url(bot_token: SecretString, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .user_agent(concat!("trrbot/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http, base_url: base_url.into().trim_end_matches('/').to_owned(), bot_token }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn call_json(&self, method: &str, body: &Value) -> Result<Value, ApiError> {
        debug!(event_name = "slack.api.request", method, "calling slack web api");
        let response = self
            .http
            .post(self.url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport { method: method.to_owned(), source })?;

        read_payload(method, response).await
    }

    async fn call_form(&self, method: &str, form: &[(&str, String)]) -> Result<Value, ApiError> {
        debug!(event_name = "slack.api.request", method, "calling slack web api");
        let response = self
            .http
            .post(self.url(method))
            .bearer_auth(self.bot_token.expose_secret())
            .form(form)
            .send()
            .await
            .map_err(|source| ApiError::Transport { method: method.to_owned(), source })?;

        read_payload(method, response).await
    }
}

async fn read_payload(method: &str, response: reqwest::Response) -> Result<Value, ApiError> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        return Err(ApiError::Http { method: method.to_owned(), status });
    }

    let payload: Value = response
        .json()
        .await
        .map_err(|source| ApiError::Transport { method: method.to_owned(), source })?;
    check_ok(method, payload)
}

/// Slack reports failures in the body as `{"ok": false, "error": "..."}` with HTTP 200.
pub(crate) fn check_ok(method: &str, payload: Value) -> Result<Value, ApiError> {
    let ok = payload.get("ok").and_then(Value::as_bool);
    match ok {
        Some(true) => Ok(payload),
        Some(false) => Err(ApiError::Slack {
            method: method.to_owned(),
            error: payload
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_owned(),
        }),
        None => Err(ApiError::Decode {
            method: method.to_owned(),
            message: "missing `ok` field".to_owned(),
        }),
    }
}

fn decode<T: for<'de> Deserialize<'de>>(method: &str, payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload)
        .map_err(|error| ApiError::Decode { method: method.to_owned(), message: error.to_string() })
}

#[derive(Deserialize)]
struct PostMessageResponse {
    channel: String,
    ts: String,
}

#[derive(Deserialize)]
struct UploadUrlResponse {
    upload_url: String,
    file_id: String,
}

#[async_trait]
impl SlackApi for WebApiClient {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostedMessage, ApiError> {
        let mut body = json!({ "channel": channel, "text": text });
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = Value::from(thread_ts);
        }

        let payload = self.call_json("chat.postMessage", &body).await?;
        let response: PostMessageResponse = decode("chat.postMessage", payload)?;
        Ok(PostedMessage { channel: response.channel, ts: response.ts })
    }

    async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> Result<(), ApiError> {
        let body = json!({ "channel": channel, "timestamp": ts, "name": name });
        self.call_json("reactions.add", &body).await?;
        Ok(())
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<(), ApiError> {
        let method = "files.getUploadURLExternal";
        let payload = self
            .call_form(
                method,
                &[
                    ("filename", upload.filename.clone()),
                    ("length", upload.content.len().to_string()),
                ],
            )
            .await?;
        let target: UploadUrlResponse = decode(method, payload)?;

        let part = Part::bytes(upload.content).file_name(upload.filename.clone());
        let response = self
            .http
            .post(&target.upload_url)
            .multipart(Form::new().part("file", part))
            .send()
            .await
            .map_err(|source| ApiError::Transport { method: "files.upload".to_owned(), source })?;
        if !response.status().is_success() {
            return Err(ApiError::Http {
                method: "files.upload".to_owned(),
                status: response.status().as_u16(),
            });
        }

        let mut body = json!({
            "files": [{ "id": target.file_id, "title": upload.title }],
            "channel_id": upload.channel_id,
        });
        if let Some(comment) = upload.initial_comment {
            body["initial_comment"] = Value::from(comment);
        }
        if let Some(thread_ts) = upload.thread_ts {
            body["thread_ts"] = Value::from(thread_ts);
        }
        self.call_json("files.completeUploadExternal", &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use trrbot_core::errors::BotErrorKind;
    use trrbot_core::BotError;

    use super::{check_ok, ApiError};

    #[test]
    fn ok_payload_passes_through() {
        let payload = json!({ "ok": true, "channel": "C1", "ts": "1.2" });
        assert_eq!(check_ok("chat.postMessage", payload.clone()).expect("ok"), payload);
    }

    #[test]
    fn error_payload_becomes_slack_error() {
        let error = check_ok("reactions.add", json!({ "ok": false, "error": "already_reacted" }))
            .expect_err("not ok");

        assert!(matches!(
            error,
            ApiError::Slack { ref method, ref error }
                if method == "reactions.add" && error == "already_reacted"
        ));
    }

    #[test]
    fn payload_without_ok_is_a_decode_error() {
        let error = check_ok("chat.postMessage", json!({ "channel": "C1" })).expect_err("no ok");
        assert!(matches!(error, ApiError::Decode { .. }));
    }

    #[test]
    fn api_errors_map_to_retryable_slack_api_errors() {
        let error: BotError =
            ApiError::Http { method: "chat.postMessage".to_owned(), status: 503 }.into();

        assert_eq!(error.kind(), BotErrorKind::SlackApi);
        assert!(error.is_retryable());
        assert_eq!(error.context().get("slack_method"), Some(&json!("chat.postMessage")));
    }
}
