//! Stateless HTTP request builder and response parser for the auth API.
//!
//! # Design
//! `AuthClient` holds only the base URL and timeouts. Each operation is split
//! into a `build_*` method that produces an `HttpRequest` and a `parse_*`
//! method that consumes an `HttpResponse`. Tokens are passed in explicitly;
//! storing them is `SessionClient`'s job.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{ClientConfig, Timeouts};
use crate::error::{ApiError, Operation};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    AuditLog, ComparisonResponse, Credentials, ErrorBody, HealthStatus, LoginResponse, MessageBody,
    ProfileEnvelope, RefreshResponse, RegisterRequest, UserProfile,
};

/// Which of the service's two parallel API surfaces to call.
///
/// `Primary` is the SQL-backed surface under `/api`, `Alternate` the
/// Redis-backed one under `/api-redis`. Endpoint shapes are identical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Primary,
    Alternate,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Primary, Mode::Alternate];

    pub fn prefix(self) -> &'static str {
        match self {
            Mode::Primary => "/api",
            Mode::Alternate => "/api-redis",
        }
    }

    /// Key of this backend in a comparison result map.
    pub fn comparison_key(self) -> &'static str {
        match self {
            Mode::Primary => "sql",
            Mode::Alternate => "redis",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.comparison_key())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" | "primary" => Ok(Mode::Primary),
            "redis" | "alternate" => Ok(Mode::Alternate),
            other => Err(format!("unknown backend mode: {other}")),
        }
    }
}

/// Request builder and response parser for the auth API.
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    timeouts: Timeouts,
}

impl AuthClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url).with_timeouts(config.timeouts)
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    pub fn build_health(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/api/health", self.base_url),
            headers: Vec::new(),
            body: None,
            timeout: self.timeouts.health,
        }
    }

    pub fn build_register(&self, input: &RegisterRequest) -> Result<HttpRequest, ApiError> {
        self.json_post(
            format!("{}/api/register", self.base_url),
            input,
            self.timeouts.request,
        )
    }

    pub fn build_login(&self, credentials: &Credentials, mode: Mode) -> Result<HttpRequest, ApiError> {
        self.json_post(
            format!("{}{}/login", self.base_url, mode.prefix()),
            credentials,
            self.timeouts.request,
        )
    }

    /// Authenticated with the refresh token, not the access token.
    pub fn build_refresh(&self, mode: Mode, refresh_token: &str) -> HttpRequest {
        self.bearer(
            HttpMethod::Post,
            format!("{}{}/refresh", self.base_url, mode.prefix()),
            refresh_token,
        )
    }

    pub fn build_logout(&self, mode: Mode, access_token: &str) -> HttpRequest {
        self.bearer(
            HttpMethod::Post,
            format!("{}{}/logout", self.base_url, mode.prefix()),
            access_token,
        )
    }

    pub fn build_logout_all(&self, mode: Mode, access_token: &str) -> HttpRequest {
        self.bearer(
            HttpMethod::Post,
            format!("{}{}/logout-all", self.base_url, mode.prefix()),
            access_token,
        )
    }

    pub fn build_profile(&self, access_token: &str) -> HttpRequest {
        self.bearer(
            HttpMethod::Get,
            format!("{}/api/profile", self.base_url),
            access_token,
        )
    }

    pub fn build_audit_log(&self, mode: Mode, access_token: &str, limit: Option<u32>) -> HttpRequest {
        let mut url = format!("{}{}/audit-log", self.base_url, mode.prefix());
        if let Some(limit) = limit {
            url.push_str(&format!("?limit={limit}"));
        }
        self.bearer(HttpMethod::Get, url, access_token)
    }

    pub fn build_compare(&self, credentials: &Credentials) -> Result<HttpRequest, ApiError> {
        self.json_post(
            format!("{}/api/performance/compare", self.base_url),
            credentials,
            self.timeouts.comparison,
        )
    }

    fn json_post<T: Serialize>(
        &self,
        url: String,
        input: &T,
        timeout: Duration,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url,
            headers: vec![json_content_type()],
            body: Some(body),
            timeout,
        })
    }

    fn bearer(&self, method: HttpMethod, url: String, token: &str) -> HttpRequest {
        let mut headers = Vec::with_capacity(2);
        if method == HttpMethod::Post {
            headers.push(json_content_type());
        }
        headers.push(("authorization".to_string(), format!("Bearer {token}")));
        HttpRequest {
            method,
            url,
            headers,
            body: None,
            timeout: self.timeouts.request,
        }
    }

    // -----------------------------------------------------------------------
    // Parsers
    // -----------------------------------------------------------------------

    /// 503 still carries a meaningful "unhealthy" payload, so it parses like
    /// 200. Any other status is rejected without reading the body.
    pub fn parse_health(&self, response: HttpResponse) -> Result<HealthStatus, ApiError> {
        if response.status != 200 && response.status != 503 {
            return Err(ApiError::UnexpectedStatus {
                operation: Operation::Health,
                status: response.status,
            });
        }
        decode(&response, Operation::Health)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 201, Operation::Register)?;
        Ok(message_or(&response, "user registered"))
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        check_status(&response, 200, Operation::Login)?;
        decode(&response, Operation::Login)
    }

    pub fn parse_refresh(&self, response: HttpResponse) -> Result<RefreshResponse, ApiError> {
        check_status(&response, 200, Operation::Refresh)?;
        decode(&response, Operation::Refresh)
    }

    /// Any 200 is a successful logout, whatever the body says.
    pub fn parse_logout(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 200, Operation::Logout)?;
        Ok(message_or(&response, "logged out"))
    }

    pub fn parse_logout_all(&self, response: HttpResponse) -> Result<String, ApiError> {
        check_status(&response, 200, Operation::LogoutAll)?;
        Ok(message_or(&response, "all sessions closed"))
    }

    pub fn parse_profile(&self, response: HttpResponse) -> Result<UserProfile, ApiError> {
        check_status(&response, 200, Operation::Profile)?;
        let envelope: ProfileEnvelope = decode(&response, Operation::Profile)?;
        Ok(envelope.user)
    }

    pub fn parse_audit_log(&self, response: HttpResponse) -> Result<AuditLog, ApiError> {
        check_status(&response, 200, Operation::AuditLog)?;
        decode(&response, Operation::AuditLog)
    }

    pub fn parse_compare(&self, response: HttpResponse) -> Result<ComparisonResponse, ApiError> {
        check_status(&response, 200, Operation::Compare)?;
        decode(&response, Operation::Compare)
    }
}

fn json_content_type() -> (String, String) {
    ("content-type".to_string(), "application/json".to_string())
}

/// Map a status other than `expected` to the server's error payload.
fn check_status(response: &HttpResponse, expected: u16, operation: Operation) -> Result<(), ApiError> {
    if response.status == expected {
        return Ok(());
    }
    Err(server_error(response, operation))
}

/// Turn an error response into `ApiError::Server`, or a malformed-response
/// error if the body is not the expected JSON envelope.
fn server_error(response: &HttpResponse, operation: Operation) -> ApiError {
    match serde_json::from_str::<ErrorBody>(&response.body) {
        Ok(body) => {
            let message = body
                .message
                .or_else(|| body.error.clone())
                .unwrap_or_else(|| format!("request failed with status {}", response.status));
            ApiError::Server {
                status: response.status,
                message,
                code: body.error,
            }
        }
        Err(e) => ApiError::MalformedResponse {
            operation,
            cause: format!("HTTP {}: {e}", response.status),
        },
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse, operation: Operation) -> Result<T, ApiError> {
    serde_json::from_str(&response.body).map_err(|e| ApiError::MalformedResponse {
        operation,
        cause: e.to_string(),
    })
}

fn message_or(response: &HttpResponse, fallback: &str) -> String {
    serde_json::from_str::<MessageBody>(&response.body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| fallback.to_string())
}
