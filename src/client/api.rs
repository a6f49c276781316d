//! The request pipeline: URL resolution, header layering, auth, logging, retry

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde_json::{json, Value as JsonValue};
use std::time::Instant;
use tracing::{error, info, warn, Instrument, Span};
use url::Url;

use super::config::ClientConfig;
use super::redact;
use super::request::ApiRequest;
use super::response::ApiResponse;
use super::session::Session;
use super::url::build_url;
use crate::errors::{HarnessError, Result};
use crate::middleware::Auth;

pub const USER_AGENT_STRING: &str = concat!("qaharness/", env!("CARGO_PKG_VERSION"));

/// Result of a login call
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Access token, `None` when the login was rejected
    pub token: Option<String>,
    pub response: ApiResponse,
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        self.token.is_some()
    }
}

/// HTTP client bound to one backend and one session
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    session: Session,
    span: Span,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT_STRING)
            .connect_timeout(config.timeout)
            .build()?;
        let span = tracing::info_span!("api_client", base_url = %config.base_url);

        Ok(Self {
            http,
            config,
            session: Session::new(),
            span,
        })
    }

    /// Log every request of this client under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Start from an existing session instead of an empty one
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub async fn get(&self, endpoint: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::get(endpoint)).await
    }

    pub async fn post_json(&self, endpoint: &str, body: JsonValue) -> Result<ApiResponse> {
        self.send(ApiRequest::post(endpoint).json(body)).await
    }

    pub async fn post_form<K, V>(
        &self,
        endpoint: &str,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<ApiResponse>
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.send(ApiRequest::post(endpoint).form(pairs)).await
    }

    pub async fn put_json(&self, endpoint: &str, body: JsonValue) -> Result<ApiResponse> {
        self.send(ApiRequest::put(endpoint).json(body)).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<ApiResponse> {
        self.send(ApiRequest::delete(endpoint)).await
    }

    /// Dispatch one request through the pipeline.
    ///
    /// Non-2xx statuses are returned, not raised. A retryable status that
    /// survives every attempt comes back as the last response; a transport
    /// failure that does becomes [`HarnessError::Transport`].
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.dispatch(request).instrument(self.span.clone()).await
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.resolve_url(&request)?;
        let body = request.body.encode()?;
        let headers = self.build_headers(&request, body.as_ref().map(|(ct, _)| *ct))?;

        let policy = &self.config.retry;
        let max_attempts = if policy.allows_method(&request.method) {
            policy.attempts()
        } else {
            1
        };

        info!(method = %request.method, url = %redact::redact_url(&url), "Sending request");
        if let Some(rendered) = request.body.redacted() {
            info!(body = %redact::preview(&rendered, self.config.log_body_limit), "Request body");
        }

        let mut attempt = 1;
        loop {
            let started = Instant::now();
            let outcome = self
                .attempt_once(&request.method, &url, &headers, body.as_ref().map(|(_, b)| b))
                .await;

            match outcome {
                Ok(mut response) => {
                    response.elapsed = started.elapsed();
                    response.attempts = attempt;
                    self.log_response(&response);

                    if attempt < max_attempts && policy.is_retryable_status(response.status) {
                        let delay = policy.delay_for(attempt);
                        warn!(
                            status = response.status,
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            "Retryable status, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if let Some(code) = response.business_code().filter(|c| *c != 0) {
                        warn!(
                            code,
                            message = response.business_message().unwrap_or_default(),
                            "Business error in response"
                        );
                    }
                    return Ok(response);
                }
                Err(e) => {
                    let message = describe_transport_error(&e);
                    if attempt < max_attempts {
                        let delay = policy.delay_for(attempt);
                        warn!(
                            error = %message,
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            "Transport error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    error!(error = %message, attempts = attempt, url = %redact::redact_url(&url), "Request failed");
                    return Err(HarnessError::Transport {
                        attempts: attempt,
                        message,
                    });
                }
            }
        }
    }

    async fn attempt_once(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&Vec<u8>>,
    ) -> std::result::Result<ApiResponse, reqwest::Error> {
        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .headers(headers.clone())
            .timeout(self.config.timeout);
        if let Some(bytes) = body {
            builder = builder.body(bytes.clone());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let response_headers = response.headers().clone();
        let bytes = response.bytes().await?;

        Ok(ApiResponse::new(status, final_url, response_headers, bytes.to_vec()))
    }

    fn log_response(&self, response: &ApiResponse) {
        info!(
            status = response.status,
            elapsed_ms = response.elapsed.as_millis() as u64,
            attempt = response.attempts,
            "Received response"
        );
        if !response.raw_body.is_empty() {
            let rendered = redact::redact_body(&response.raw_body);
            info!(body = %redact::preview(&rendered, self.config.log_body_limit), "Response body");
        }
    }

    fn resolve_url(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = Url::parse(&build_url(&self.config.base_url, &request.endpoint))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Session defaults, then API key, then bearer token, then content type,
    /// then the request's own headers; later layers replace earlier ones
    fn build_headers(&self, request: &ApiRequest, content_type: Option<&'static str>) -> Result<HeaderMap> {
        let mut headers = self.session.header_map()?;

        if let Some(key) = &self.config.credentials.api_key {
            if !key.is_empty() {
                Auth::api_key(self.config.api_key_header.clone(), key.clone()).apply(&mut headers)?;
            }
        }

        if request.auth_required {
            if let Some(auth) = self.session.auth() {
                auth.apply(&mut headers)?;
            }
        }

        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }

        for (name, value) in &request.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| HarnessError::InvalidArgument(format!("Invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| HarnessError::InvalidArgument(format!("Invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Log in with explicit credentials.
    ///
    /// A rejected login clears the session and returns `token: None`. A
    /// transport failure clears the session too and is returned as `Err`.
    pub async fn login(&mut self, number: &str, username: &str, password: &str) -> Result<LoginOutcome> {
        let endpoint = self.config.login.login_endpoint().to_string();
        let flavor = self.config.login.flavor;
        let body = json!({
            "number": number,
            "username": username,
            "password": password,
        });

        info!(parent: &self.span, username, endpoint = %endpoint, flavor = %flavor, "Logging in");

        let response = match self.send(ApiRequest::post(endpoint).json(body).no_auth()).await {
            Ok(response) => response,
            Err(e) => {
                self.session.clear_tokens();
                return Err(e);
            }
        };

        match flavor.extract(&response) {
            Ok(grant) => {
                let token = grant.access.clone();
                self.session.authenticate(grant);
                info!(parent: &self.span, username, "Login succeeded");
                Ok(LoginOutcome {
                    token: Some(token),
                    response,
                })
            }
            Err(reason) => {
                self.session.clear_tokens();
                warn!(parent: &self.span, username, reason = %reason, "Login failed");
                Ok(LoginOutcome {
                    token: None,
                    response,
                })
            }
        }
    }

    /// Log in with the credentials from the client configuration
    pub async fn login_with_config(&mut self) -> Result<LoginOutcome> {
        let credentials = self.config.credentials.clone();
        self.login(
            &credentials.number,
            &credentials.username,
            credentials.password.expose(),
        )
        .await
    }

    /// Notify the backend if a logout endpoint is configured, then drop the tokens
    pub async fn logout(&mut self) {
        if let Some(endpoint) = self.config.login.logout_endpoint.clone() {
            if self.session.is_authenticated() {
                match self.send(ApiRequest::post(endpoint)).await {
                    Ok(response) if !response.is_success() => {
                        warn!(parent: &self.span, status = response.status, "Logout request rejected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(parent: &self.span, error = %e, "Logout request failed");
                    }
                }
            }
        }
        self.session.sign_out();
        info!(parent: &self.span, "Logged out");
    }
}

fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timeout: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        e.to_string()
    }
}
