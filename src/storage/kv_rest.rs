//! Redis-over-REST Backend
//!
//! Speaks the Upstash / Vercel KV REST wire format: every call is one
//! bearer-authenticated `POST <url>/pipeline` whose body is a JSON array of
//! Redis commands, answered by one `{result}` or `{error}` object per command.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{SnapshotStore, decode_snapshot, encode_snapshot};
use crate::benchmark::Snapshot;
use crate::constants::cache::{RESULTS_KEY, TIMESTAMP_KEY};
use crate::types::{ArenaError, Result};

const REQUEST_TIMEOUT_SECS: u64 = 15;

pub struct KvRestStore {
    url: String,
    /// REST token stored securely - never exposed in logs or debug output
    token: SecretString,
    client: reqwest::Client,
}

impl std::fmt::Debug for KvRestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvRestStore")
            .field("url", &self.url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl KvRestStore {
    pub fn new(url: &str, token: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ArenaError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            token: SecretString::from(token.to_string()),
            client,
        })
    }

    /// Send commands as one pipeline; returns each command's result
    async fn pipeline(&self, commands: Value) -> Result<Vec<Value>> {
        let url = format!("{}/pipeline", self.url);
        debug!("KV pipeline: {}", commands);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&commands)
            .send()
            .await
            .map_err(|e| ArenaError::CacheUnavailable(format!("KV request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArenaError::CacheUnavailable(format!(
                "KV returned {}: {}",
                status,
                body.trim()
            )));
        }

        let replies: Vec<CommandReply> = response
            .json()
            .await
            .map_err(|e| ArenaError::CacheUnavailable(format!("Invalid KV response: {}", e)))?;

        replies
            .into_iter()
            .map(|reply| match reply.error {
                Some(error) => Err(ArenaError::CacheUnavailable(format!("KV error: {}", error))),
                None => Ok(reply.result),
            })
            .collect()
    }
}

#[async_trait]
impl SnapshotStore for KvRestStore {
    fn name(&self) -> &'static str {
        "kv-rest"
    }

    async fn load(&self) -> Result<Option<Snapshot>> {
        let results = self
            .pipeline(json!([["GET", RESULTS_KEY], ["GET", TIMESTAMP_KEY]]))
            .await?;

        let text = |i: usize| results.get(i).and_then(Value::as_str).map(str::to_string);
        decode_snapshot(text(0), text(1))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let (results, timestamp) = encode_snapshot(snapshot)?;
        self.pipeline(json!([
            ["SET", RESULTS_KEY, results],
            ["SET", TIMESTAMP_KEY, timestamp]
        ]))
        .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.pipeline(json!([["DEL", RESULTS_KEY, TIMESTAMP_KEY]]))
            .await?;
        Ok(())
    }
}
