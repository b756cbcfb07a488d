//! HTTP relay transport.
//!
//! Provides [`HttpRelay`], a reqwest-backed implementation of the [`Relay`]
//! contract against the backend's REST endpoints. This is a thin layer that
//! just maps requests and statuses - protocol logic stays in the
//! coordinators.
//!
//! Endpoint contract:
//!
//! - `POST /chats/{id}/dh/send_public_key` with `{ "public_key_b64": … }`
//! - `GET  /chats/{id}/dh/get_public_key` → `{ "public_key_b64": … }`,
//!   404 while the peer has not published
//! - `POST /chats/{id}/send_message` with `{ "text": … }`
//! - `GET  /chats/{id}/messages` → `{ "messages": [ … ] }`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use sealink_core::{ChatId, Message};
use serde::{Deserialize, Serialize};

use crate::relay::{Relay, RelayError};

/// Relay implementation over the backend's REST API.
///
/// Clone is cheap: `reqwest::Client` is an Arc-backed handle.
#[derive(Clone)]
pub struct HttpRelay {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpRelay {
    /// Create a relay for the given base URL (e.g. `http://host:8000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: trim_slash(base_url.into()), bearer_token: None }
    }

    /// Attach a bearer token to every request.
    ///
    /// Session-token lifecycle (refresh, storage) is the caller's concern.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn url(&self, chat_id: ChatId, endpoint: &str) -> String {
        format!("{}/chats/{chat_id}/{endpoint}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn trim_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

fn unavailable(err: reqwest::Error) -> RelayError {
    RelayError::Unavailable(err.to_string())
}

/// Map a non-success status to `Rejected`.
fn check_status(status: StatusCode) -> Result<(), RelayError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(RelayError::Rejected { status: status.as_u16() })
    }
}

#[derive(Serialize)]
struct PublishKeyRequest<'a> {
    public_key_b64: &'a str,
}

#[derive(Deserialize)]
struct PeerKeyResponse {
    public_key_b64: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    messages: Vec<WireMessage>,
}

/// Message as the relay serializes it. Carries no chat id; the client
/// stamps rows with the chat they were fetched for.
#[derive(Deserialize)]
struct WireMessage {
    id: u64,
    sender_id: u64,
    text: String,
    timestamp: DateTime<Utc>,
}

impl WireMessage {
    fn into_message(self, chat_id: ChatId) -> Message {
        Message {
            id: self.id,
            chat_id,
            sender_id: self.sender_id,
            text: self.text,
            timestamp: self.timestamp,
        }
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn publish_public_key(
        &self,
        chat_id: ChatId,
        public_key_b64: &str,
    ) -> Result<(), RelayError> {
        let response = self
            .authorize(self.http.post(self.url(chat_id, "dh/send_public_key")))
            .json(&PublishKeyRequest { public_key_b64 })
            .send()
            .await
            .map_err(unavailable)?;

        check_status(response.status())
    }

    async fn fetch_peer_public_key(&self, chat_id: ChatId) -> Result<Option<String>, RelayError> {
        let response = self
            .authorize(self.http.get(self.url(chat_id, "dh/get_public_key")))
            .send()
            .await
            .map_err(unavailable)?;

        // 404 is the "peer has not published yet" signal, not an error.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(response.status())?;

        let body: PeerKeyResponse = response.json().await.map_err(unavailable)?;
        Ok(Some(body.public_key_b64))
    }

    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<(), RelayError> {
        let response = self
            .authorize(self.http.post(self.url(chat_id, "send_message")))
            .json(&SendMessageRequest { text })
            .send()
            .await
            .map_err(unavailable)?;

        check_status(response.status())
    }

    async fn fetch_messages(&self, chat_id: ChatId) -> Result<Vec<Message>, RelayError> {
        let response = self
            .authorize(self.http.get(self.url(chat_id, "messages")))
            .send()
            .await
            .map_err(unavailable)?;

        check_status(response.status())?;

        let body: MessagesResponse = response.json().await.map_err(unavailable)?;
        Ok(body.messages.into_iter().map(|m| m.into_message(chat_id)).collect())
    }
}
