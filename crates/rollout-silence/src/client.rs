//! HTTP client for the Alertmanager v2 silence API.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use tracing::debug;
use url::Url;

use crate::error::{Result, SilenceError};
use crate::registry::SilenceRegistry;
use crate::types::Silence;

/// Per-request timeout. There are no retries, so a hung registry costs at
/// most this long per reconciliation step.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for one Alertmanager instance.
///
/// The authorization value is sent verbatim as the `Authorization` header
/// on every request; whatever scheme the deployment uses is the
/// operator's business, not this client's.
#[derive(Debug, Clone)]
pub struct AlertmanagerClient {
    base_url: String,
    auth_header: String,
    http: reqwest::Client,
}

impl AlertmanagerClient {
    /// Create a client for the registry at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::InvalidUrl`] if `base_url` does not parse as
    /// an absolute URL, or [`SilenceError::Request`] if the underlying HTTP
    /// client cannot be constructed.
    pub fn new(base_url: &str, auth_header: impl Into<String>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|err| SilenceError::InvalidUrl {
            reason: err.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| SilenceError::Request {
                reason: err.to_string(),
            })?;

        Ok(Self {
            base_url,
            auth_header: auth_header.into(),
            http,
        })
    }

    /// Registry base URL, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn silences_url(&self) -> String {
        format!("{}/api/v2/silences", self.base_url)
    }

    fn silence_url(&self, id: &str) -> String {
        format!("{}/api/v2/silence/{id}", self.base_url)
    }
}

fn check_ok(status: StatusCode) -> Result<()> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(SilenceError::UnexpectedStatus {
            status: status.as_u16(),
        })
    }
}

impl SilenceRegistry for AlertmanagerClient {
    fn create<'a>(
        &'a self,
        silence: &'a Silence,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .post(self.silences_url())
                .header(AUTHORIZATION, &self.auth_header)
                .json(silence)
                .send()
                .await
                .map_err(|err| SilenceError::Request {
                    reason: err.to_string(),
                })?;

            check_ok(response.status())?;
            debug!(comment = %silence.comment, "created silence");
            Ok(())
        })
    }

    fn list<'a>(&'a self) -> Pin<Box<dyn Future<Output = Result<Vec<Silence>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .get(self.silences_url())
                .header(AUTHORIZATION, &self.auth_header)
                .send()
                .await
                .map_err(|err| SilenceError::Request {
                    reason: err.to_string(),
                })?;

            check_ok(response.status())?;

            let body = response.text().await.map_err(|err| SilenceError::Request {
                reason: err.to_string(),
            })?;
            serde_json::from_str(&body).map_err(|err| SilenceError::Decode {
                reason: err.to_string(),
            })
        })
    }

    fn delete_by_id<'a>(
        &'a self,
        id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .http
                .delete(self.silence_url(id))
                .header(AUTHORIZATION, &self.auth_header)
                .send()
                .await
                .map_err(|err| SilenceError::Request {
                    reason: err.to_string(),
                })?;

            check_ok(response.status())?;
            debug!(id = %id, "deleted silence");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_unparseable_url() {
        let err = AlertmanagerClient::new("not a url", "token").unwrap_err();
        assert!(matches!(err, SilenceError::InvalidUrl { .. }));
    }

    #[test]
    fn new_trims_trailing_slashes() {
        let client = AlertmanagerClient::new("http://alertmanager.monitoring:9093/", "token")
            .unwrap();
        assert_eq!(client.base_url(), "http://alertmanager.monitoring:9093");
        assert_eq!(
            client.silences_url(),
            "http://alertmanager.monitoring:9093/api/v2/silences"
        );
    }

    #[test]
    fn silence_url_embeds_id() {
        let client = AlertmanagerClient::new("http://alertmanager:9093", "token").unwrap();
        assert_eq!(
            client.silence_url("5fe34cc1"),
            "http://alertmanager:9093/api/v2/silence/5fe34cc1"
        );
    }

    #[test]
    fn only_200_counts_as_success() {
        assert!(check_ok(StatusCode::OK).is_ok());

        for status in [
            StatusCode::CREATED,
            StatusCode::NO_CONTENT,
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let err = check_ok(status).unwrap_err();
            assert!(matches!(
                err,
                SilenceError::UnexpectedStatus { status: s } if s == status.as_u16()
            ));
        }
    }
}
