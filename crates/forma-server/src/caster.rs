//! [`RemoteCaster`] — a [`Caster`] that delegates to an HTTP endpoint.
//!
//! The endpoint receives the [`CastRequest`] as JSON and answers with the
//! record as a JSON object. `422` means the input could not be cast; any
//! other non-success status means the endpoint is unusable.

use std::time::Duration;

use forma_core::cast::{CastError, CastRequest, Caster};
use reqwest::{Client, StatusCode};

/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct RemoteCaster {
  client: Client,
  url:    String,
}

impl RemoteCaster {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      url: url.into(),
    })
  }
}

impl Caster for RemoteCaster {
  async fn cast(&self, request: CastRequest) -> Result<serde_json::Value, CastError> {
    tracing::debug!(target_schema = %request.target.name, url = %self.url, "casting");

    let resp = self
      .client
      .post(&self.url)
      .json(&request)
      .send()
      .await
      .map_err(|e| CastError::Unavailable(e.to_string()))?;

    let status = resp.status();
    if status == StatusCode::UNPROCESSABLE_ENTITY {
      let detail = resp.text().await.unwrap_or_default();
      return Err(CastError::Unparseable(detail));
    }
    if !status.is_success() {
      return Err(CastError::Unavailable(format!("cast endpoint → {status}")));
    }

    let value: serde_json::Value = resp
      .json()
      .await
      .map_err(|e| CastError::Unparseable(e.to_string()))?;
    if !value.is_object() {
      return Err(CastError::Unparseable(format!(
        "expected a JSON object, got {value}"
      )));
    }
    Ok(value)
  }
}
