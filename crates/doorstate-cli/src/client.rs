// HTTP client wrapper for the door state API

use doorstate_core::{sign, DoorStatus, SigningKey, StateEvent};
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found")]
    NotFound,

    #[error("server stored {received_state} at {received_time}, expected {sent_state} at {sent_time}")]
    EchoMismatch {
        sent_time: i64,
        sent_state: String,
        received_time: i64,
        received_state: String,
    },
}

/// Signed submission body, field names as the server expects them
#[derive(Debug, Serialize)]
struct SubmitStateRequest {
    time: i64,
    state: String,
    hmac: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
}

pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().await?;
        self.handle_response(response).await
    }

    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).query(query).send().await?;
        self.handle_response(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.post(&url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// Current door state as reported by the server
    pub async fn current(&self) -> Result<DoorStatus, ClientError> {
        self.get("/door/").await
    }

    /// Sign and submit an event, then check the server echoed it back unchanged
    pub async fn submit(&self, key: &SigningKey, event: StateEvent) -> Result<StateEvent, ClientError> {
        let request = SubmitStateRequest {
            time: event.seconds(),
            state: event.state.as_str().to_string(),
            hmac: sign(key, Some(event.seconds()), event.state),
        };
        let stored: StateEvent = self.post("/door/", &request).await?;

        if stored != event {
            return Err(ClientError::EchoMismatch {
                sent_time: event.seconds(),
                sent_state: event.state.to_string(),
                received_time: stored.seconds(),
                received_state: stored.state.to_string(),
            });
        }
        Ok(stored)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json().await?;
        Ok(body)
    }
}
