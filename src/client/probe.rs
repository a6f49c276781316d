//! Discover which login path a backend actually serves

use tracing::{info, warn};

use super::api::ApiClient;
use super::config::ClientConfig;
use crate::errors::Result;

/// Login paths tried when none are given
pub const DEFAULT_LOGIN_CANDIDATES: &[&str] = &[
    "/user/login",
    "/api/user/login",
    "/api/user/get_token/",
    "/api/login",
    "/login",
];

/// What one candidate endpoint returned
#[derive(Debug, Clone)]
pub struct ProbeAttempt {
    pub endpoint: String,
    /// `None` on transport failure
    pub status: Option<u16>,
    pub token: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    pub attempts: Vec<ProbeAttempt>,
}

impl ProbeReport {
    /// The first candidate that produced a token
    pub fn found(&self) -> Option<&ProbeAttempt> {
        self.attempts.iter().find(|a| a.token.is_some())
    }
}

/// Try each candidate with a fresh client whose login endpoint is set to it.
///
/// Stops at the first candidate that yields a token. Transport errors are
/// recorded and probing moves on.
pub async fn probe_login_endpoints(config: &ClientConfig, candidates: &[String]) -> Result<ProbeReport> {
    let mut report = ProbeReport::default();

    for endpoint in candidates {
        let mut candidate_config = config.clone();
        candidate_config.login.endpoint = Some(endpoint.clone());
        let mut client = ApiClient::new(candidate_config)?
            .with_span(tracing::info_span!("probe", endpoint = %endpoint));

        let attempt = match client.login_with_config().await {
            Ok(outcome) => ProbeAttempt {
                endpoint: endpoint.clone(),
                status: Some(outcome.response.status),
                token: outcome.token,
                error: None,
            },
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Probe request failed");
                ProbeAttempt {
                    endpoint: endpoint.clone(),
                    status: None,
                    token: None,
                    error: Some(e.to_string()),
                }
            }
        };

        let hit = attempt.token.is_some();
        report.attempts.push(attempt);
        if hit {
            info!(endpoint = %endpoint, "Login endpoint found");
            break;
        }
    }

    Ok(report)
}
