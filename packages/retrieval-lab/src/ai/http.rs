//! Shared request plumbing for the HTTP collaborators.

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{CallError, CallResult};

/// Map a non-success status to the call taxonomy.
pub(crate) fn status_error(provider: &str, status: StatusCode, body: &str) -> CallError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        CallError::RateLimited(format!("{} returned 429: {}", provider, body))
    } else {
        CallError::Api(format!("{} returned {}: {}", provider, status, body))
    }
}

/// POST `body` as JSON with bearer auth and decode the JSON answer.
pub(crate) async fn post_json<B, R>(
    client: &Client,
    provider: &str,
    url: &str,
    api_key: &SecretString,
    body: &B,
) -> CallResult<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = client
        .post(url)
        .bearer_auth(api_key.expose_secret())
        .json(body)
        .send()
        .await
        .map_err(|e| CallError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let error = status_error(provider, status, &text);
        warn!(provider, %status, error = %error, "Request failed");
        return Err(error);
    }

    response
        .json()
        .await
        .map_err(|e| CallError::Transport(format!("{} response body: {}", provider, e)))
}
