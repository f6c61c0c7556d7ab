//! Helper process configuration.
//!
//! Settings arrive on the command line (the Alertmanager credential through
//! the environment) and are validated once at startup. A configuration that
//! passes [`HelperConfig::validate`] never produces a fatal error later in
//! the run.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use rollout_silence::ReconcilerConfig;
use rollout_watch::SamplerConfig;

use crate::error::{HelperError, Result};

/// Runtime configuration for the helper process.
#[derive(Debug, Clone)]
pub struct HelperConfig {
    /// Alertmanager base URL. Required unless `no_alertmanager` is set.
    pub alertmanager_url: Option<String>,
    /// Authorization header value for Alertmanager requests. Required unless
    /// `no_alertmanager` is set.
    pub alertmanager_token: Option<String>,
    /// Disable the Alertmanager integration and only log transitions.
    pub no_alertmanager: bool,
    /// Kubernetes API base URL override. When unset, the in-cluster
    /// service-account environment is used.
    pub kube_api_url: Option<String>,
    /// Bearer token file to use with `kube_api_url`.
    pub kube_token_path: Option<PathBuf>,
    /// Listen address for the health endpoints.
    pub health_addr: SocketAddr,
    /// Seconds between node listings.
    pub poll_interval_secs: u64,
    /// Minutes each created silence stays active.
    pub silence_ttl_mins: i64,
}

impl HelperConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Alertmanager endpoint or credential is
    /// missing while the integration is enabled, or if any tuning value is
    /// out of range.
    pub fn validate(&self) -> Result<()> {
        if !self.no_alertmanager {
            let url = self.alertmanager_url.as_deref().unwrap_or_default();
            if url.is_empty() {
                return Err(HelperError::Config(
                    "alertmanager URL is required unless --no-alertmanager is set".to_string(),
                ));
            }

            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(HelperError::Config(
                    "alertmanager URL must start with http:// or https://".to_string(),
                ));
            }

            if self
                .alertmanager_token
                .as_deref()
                .unwrap_or_default()
                .is_empty()
            {
                return Err(HelperError::Config(
                    "alertmanager token is required unless --no-alertmanager is set (set ALERTMNGR_TOKEN)"
                        .to_string(),
                ));
            }
        }

        if self.poll_interval_secs == 0 {
            return Err(HelperError::Config(
                "poll interval must be greater than 0".to_string(),
            ));
        }

        if self.silence_ttl_mins <= 0 {
            return Err(HelperError::Config(
                "silence TTL must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Alertmanager URL and credential, present when the integration is
    /// enabled. Always `Some` for a validated configuration with
    /// `no_alertmanager` unset.
    #[must_use]
    pub fn alertmanager(&self) -> Option<(&str, &str)> {
        if self.no_alertmanager {
            return None;
        }

        match (
            self.alertmanager_url.as_deref(),
            self.alertmanager_token.as_deref(),
        ) {
            (Some(url), Some(token)) => Some((url, token)),
            _ => None,
        }
    }

    /// Sampler settings derived from this configuration.
    #[must_use]
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            ..SamplerConfig::default()
        }
    }

    /// Reconciler settings derived from this configuration.
    #[must_use]
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            silence_ttl: chrono::Duration::minutes(self.silence_ttl_mins),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> HelperConfig {
        HelperConfig {
            alertmanager_url: Some("https://alertmanager.example.com".to_string()),
            alertmanager_token: Some("Bearer secret".to_string()),
            no_alertmanager: false,
            kube_api_url: None,
            kube_token_path: None,
            health_addr: "127.0.0.1:8080".parse().expect("valid address"),
            poll_interval_secs: 30,
            silence_ttl_mins: 90,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        valid_config().validate().expect("config should be valid");
    }

    #[test]
    fn test_missing_url_rejected() {
        let mut config = valid_config();
        config.alertmanager_url = None;

        let err = config.validate().expect_err("should reject missing URL");
        assert!(err.to_string().contains("URL is required"));
    }

    #[test]
    fn test_empty_url_rejected() {
        let mut config = valid_config();
        config.alertmanager_url = Some(String::new());

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_url_scheme_rejected() {
        let mut config = valid_config();
        config.alertmanager_url = Some("ftp://alertmanager.example.com".to_string());

        let err = config.validate().expect_err("should reject bad scheme");
        assert!(err.to_string().contains("http:// or https://"));
    }

    #[test]
    fn test_missing_token_rejected() {
        let mut config = valid_config();
        config.alertmanager_token = None;

        let err = config.validate().expect_err("should reject missing token");
        assert!(err.to_string().contains("ALERTMNGR_TOKEN"));
    }

    #[test]
    fn test_no_alertmanager_skips_endpoint_checks() {
        let config = HelperConfig {
            alertmanager_url: None,
            alertmanager_token: None,
            no_alertmanager: true,
            ..valid_config()
        };

        config.validate().expect("log-only mode needs no endpoint");
        assert!(config.alertmanager().is_none());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let mut config = valid_config();
        config.poll_interval_secs = 0;

        let err = config.validate().expect_err("should reject zero interval");
        assert!(err.to_string().contains("poll interval"));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = valid_config();
        config.silence_ttl_mins = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_ttl_rejected() {
        let mut config = valid_config();
        config.silence_ttl_mins = -5;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_alertmanager_accessor_returns_endpoint() {
        let config = valid_config();

        let (url, token) = config.alertmanager().expect("integration enabled");
        assert_eq!(url, "https://alertmanager.example.com");
        assert_eq!(token, "Bearer secret");
    }

    #[test]
    fn test_sampler_config_uses_poll_interval() {
        let mut config = valid_config();
        config.poll_interval_secs = 10;

        let sampler = config.sampler_config();
        assert_eq!(sampler.interval, Duration::from_secs(10));
        // Channel sizing is not operator-tunable.
        assert_eq!(
            sampler.channel_capacity,
            SamplerConfig::default().channel_capacity
        );
    }

    #[test]
    fn test_reconciler_config_uses_ttl() {
        let mut config = valid_config();
        config.silence_ttl_mins = 45;

        let reconciler = config.reconciler_config();
        assert_eq!(reconciler.silence_ttl, chrono::Duration::minutes(45));
    }
}
