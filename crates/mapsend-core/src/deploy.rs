//! Deploy marker registration.
//!
//! `POST {base}/{app_id}/markers.json?token={token}` with
//! `{"kind":"deploy","revision":"..."}`, wrapped in the retry executor.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;

use crate::control::CancelSignal;
use crate::retry::{Retry, RetryError, RetryPolicy};
use crate::transport::{self, HttpOptions, RequestError};

/// API base used when config does not override it.
pub const DEFAULT_DEPLOY_ENDPOINT: &str = "https://appsignal.com/api";

#[derive(Debug, Serialize)]
struct MarkerBody<'a> {
    kind: &'static str,
    revision: &'a str,
}

/// Target for deploy markers of one app.
#[derive(Clone)]
pub struct DeployMarker {
    pub endpoint: String,
    pub app_id: String,
    pub personal_api_token: String,
    pub http: HttpOptions,
}

impl fmt::Debug for DeployMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployMarker")
            .field("endpoint", &self.endpoint)
            .field("app_id", &self.app_id)
            .field("personal_api_token", &"<redacted>")
            .finish()
    }
}

impl DeployMarker {
    /// Marker URL with the app id in the path and the token as a query parameter.
    pub fn marker_url(&self) -> Result<url::Url> {
        let base = format!("{}/", self.endpoint.trim_end_matches('/'));
        let mut url = url::Url::parse(&base)
            .with_context(|| format!("invalid deploy endpoint: {}", self.endpoint))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("deploy endpoint cannot be a base: {}", self.endpoint))?
            .pop_if_empty()
            .push(&self.app_id)
            .push("markers.json");
        url.query_pairs_mut()
            .append_pair("token", &self.personal_api_token);
        Ok(url)
    }

    /// JSON body for a marker.
    pub fn body(revision: &str) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&MarkerBody {
            kind: "deploy",
            revision,
        })?)
    }

    /// Single attempt; `create` wraps it in retries.
    pub async fn send(&self, url: &str, body: &[u8]) -> Result<(), RequestError> {
        let url = url.to_string();
        let body = body.to_vec();
        let http = self.http;
        transport::run_blocking(move || transport::post_json(&url, &body, http)).await?;
        Ok(())
    }

    /// Register a deploy marker for `revision`, retrying per `policy`.
    pub async fn create(
        &self,
        revision: &str,
        policy: &RetryPolicy,
        cancel: Option<&CancelSignal>,
    ) -> Result<(), RetryError<RequestError>> {
        let (url, body) = match self.marker_url().and_then(|u| Ok((u, Self::body(revision)?))) {
            Ok(pair) => pair,
            Err(e) => {
                return Err(RetryError::Fatal {
                    attempt: 0,
                    source: RequestError::Invalid(format!("{:#}", e)),
                })
            }
        };
        let url = url.to_string();

        let result = Retry::new(policy)
            .cancel_on(cancel)
            .on_failed_attempt(|e: &RequestError, ctx| {
                tracing::warn!(
                    attempt = ctx.attempt_number,
                    remaining = ctx.attempts_remaining,
                    "creating deploy marker failed: {}",
                    e
                );
                Ok(())
            })
            .run(|| self.send(&url, &body))
            .await;

        match &result {
            Ok(()) => tracing::debug!(revision, "created deploy marker"),
            Err(e) => tracing::debug!(revision, "creating deploy marker failed: {}", e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(endpoint: &str) -> DeployMarker {
        DeployMarker {
            endpoint: endpoint.to_string(),
            app_id: "5f1b0a".to_string(),
            personal_api_token: "tok en&x".to_string(),
            http: HttpOptions::default(),
        }
    }

    #[test]
    fn marker_url_embeds_app_id_and_encodes_token() {
        let url = marker(DEFAULT_DEPLOY_ENDPOINT).marker_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://appsignal.com/api/5f1b0a/markers.json?token=tok+en%26x"
        );
        let url = marker("http://127.0.0.1:9000/api/").marker_url().unwrap();
        assert_eq!(url.path(), "/api/5f1b0a/markers.json");
    }

    #[test]
    fn body_is_deploy_kind_with_revision() {
        let body = DeployMarker::body("4f2a9c1").unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v, serde_json::json!({"kind": "deploy", "revision": "4f2a9c1"}));
    }

    #[test]
    fn debug_output_redacts_token() {
        assert!(!format!("{:?}", marker(DEFAULT_DEPLOY_ENDPOINT)).contains("tok en"));
    }

    #[tokio::test]
    async fn invalid_endpoint_fails_without_attempting() {
        let err = marker("not a url")
            .create("rev", &RetryPolicy::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RetryError::Fatal { attempt: 0, .. }));
    }
}
