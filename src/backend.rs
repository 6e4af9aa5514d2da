//! HTTP client for the assistant backend.
//!
//! Two endpoints are used: `GET /hud-data` returns a section payload for the
//! fetch-driven mode and `POST /generate` answers a user query. Requests run
//! on short-lived worker threads so the event loop never blocks; results come
//! back over a channel that the app polls once per tick.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::hud::section::{Payload, Section};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("backend worker disconnected")]
    Disconnected,
}

/// Body of a `/generate` answer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub response: String,
    #[serde(default)]
    pub base64_audio: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hud_sections: Vec<Value>,
}

/// An explicit `null` reads the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl GenerateResponse {
    pub fn has_audio(&self) -> bool {
        self.base64_audio.as_deref().is_some_and(|audio| !audio.is_empty())
    }

    pub fn sections(&self) -> Vec<Section> {
        Section::parse_all(self.hud_sections.clone())
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| BackendError::Transport {
                url: base_url.clone(),
                source,
            })?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET /hud-data`, optionally scoped to a location.
    pub fn fetch_hud_data(&self, location: Option<&str>) -> Result<Payload, BackendError> {
        let url = self.endpoint("hud-data");
        let mut request = self.http.get(&url);
        if let Some(location) = location.filter(|l| !l.is_empty()) {
            request = request.query(&[("location", location)]);
        }
        let value = self.send_json(&url, request)?;
        Payload::from_value(value).map_err(|err| BackendError::Decode {
            url,
            reason: err.to_string(),
        })
    }

    /// `POST /generate` with `{ "query": .. }`.
    pub fn generate(&self, query: &str) -> Result<GenerateResponse, BackendError> {
        let url = self.endpoint("generate");
        let request = self.http.post(&url).json(&GenerateRequest { query });
        let value = self.send_json(&url, request)?;
        serde_json::from_value(value).map_err(|err| BackendError::Decode {
            url,
            reason: err.to_string(),
        })
    }

    fn send_json(
        &self,
        url: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<Value, BackendError> {
        let response = request.send().map_err(|source| BackendError::Transport {
            url: url.to_string(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.json::<Value>().map_err(|err| BackendError::Decode {
            url: url.to_string(),
            reason: err.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    HudData { location: Option<String> },
    Generate { query: String },
}

#[derive(Debug)]
pub enum BackendReply {
    HudData(Result<Payload, BackendError>),
    Generate {
        query: String,
        result: Result<GenerateResponse, BackendError>,
    },
}

/// Runs backend requests off the UI thread.
#[derive(Debug)]
pub struct BackendWorker {
    client: BackendClient,
    tx: Sender<BackendReply>,
    rx: Receiver<BackendReply>,
    in_flight: usize,
    queries_in_flight: usize,
}

impl BackendWorker {
    pub fn new(client: BackendClient) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            client,
            tx,
            rx,
            in_flight: 0,
            queries_in_flight: 0,
        }
    }

    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// `/generate` requests still waiting for an answer.
    pub fn queries_in_flight(&self) -> usize {
        self.queries_in_flight
    }

    pub fn submit(&mut self, request: BackendRequest) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let name = match &request {
            BackendRequest::HudData { .. } => "aura-hud-data",
            BackendRequest::Generate { .. } => "aura-hud-generate",
        };
        let is_query = matches!(request, BackendRequest::Generate { .. });
        tracing::debug!(?request, "submitting backend request");
        let spawned = thread::Builder::new().name(name.into()).spawn(move || {
            let reply = match request {
                BackendRequest::HudData { location } => {
                    BackendReply::HudData(client.fetch_hud_data(location.as_deref()))
                }
                BackendRequest::Generate { query } => {
                    let result = client.generate(&query);
                    BackendReply::Generate { query, result }
                }
            };
            let _ = tx.send(reply);
        });
        match spawned {
            Ok(_) => {
                self.in_flight += 1;
                if is_query {
                    self.queries_in_flight += 1;
                }
            }
            Err(err) => tracing::error!(%err, "failed to spawn backend worker thread"),
        }
    }

    /// Next finished request, if any.
    pub fn try_recv(&mut self) -> Option<BackendReply> {
        match self.rx.try_recv() {
            Ok(reply) => {
                self.settle(&reply);
                Some(reply)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the next reply arrives or `timeout` elapses.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<BackendReply, BackendError> {
        let reply = self
            .rx
            .recv_timeout(timeout)
            .map_err(|_| BackendError::Disconnected)?;
        self.settle(&reply);
        Ok(reply)
    }

    fn settle(&mut self, reply: &BackendReply) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if matches!(reply, BackendReply::Generate { .. }) {
            self.queries_in_flight = self.queries_in_flight.saturating_sub(1);
        }
    }
}
