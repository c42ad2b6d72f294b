//! Wire DTOs for the auth API.
//!
//! # Design
//! These types mirror the service's JSON schema but are defined independently
//! of the mock-server crate; integration tests catch drift between the two.
//! Wire names are snake_case. Unknown response fields are ignored so newer
//! servers can add fields without breaking older clients.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Unexpected};
use serde::{Deserialize, Serialize};

/// Username/password pair submitted for login and performance comparison.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request payload for creating a new account.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Server-reported identity of the authenticated principal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// MariaDB-backed servers send `BOOLEAN` columns as `0`/`1`.
    #[serde(default, deserialize_with = "bool_or_int")]
    pub is_active: bool,
}

fn bool_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Int(0) => Ok(false),
        Flag::Int(1) => Ok(true),
        Flag::Int(n) => Err(de::Error::invalid_value(Unexpected::Signed(n), &"a boolean or 0/1")),
    }
}

/// Server liveness as reported by `/api/health`.
///
/// The service omits `database` and `redis` when the health probe itself
/// crashes, so those default to empty strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub redis: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
    #[serde(default)]
    pub response_time_ms: Option<f64>,
}

/// Body of a successful refresh. The refresh token itself is not echoed back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefreshResponse {
    #[serde(default)]
    pub message: String,
    pub access_token: String,
    #[serde(default)]
    pub response_time_ms: Option<f64>,
}

/// Outcome of one backend's timed login inside a comparison run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub success: bool,
    #[serde(default)]
    pub response_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Server-computed summary of a comparison run, passed through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceAnalysis {
    pub faster_system: String,
    pub time_difference_ms: f64,
    pub percentage_difference: f64,
    #[serde(rename = "redis_advantage", default)]
    pub advantage_note: String,
}

/// Body of `/api/performance/compare`.
///
/// `performance_analysis` is only present when both backends succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResponse {
    pub user: UserProfile,
    pub comparison: BTreeMap<String, ComparisonResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_analysis: Option<PerformanceAnalysis>,
}

/// One row of a user's token audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuditEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub user_id: Option<i64>,
    pub action: String,
    #[serde(default)]
    pub token_jti: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `{prefix}/audit-log`, newest entry first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditLog {
    #[serde(rename = "audit_log")]
    pub entries: Vec<AuditEntry>,
    #[serde(default)]
    pub response_time_ms: Option<f64>,
}

/// Error envelope carried by every non-success response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Envelope that only carries a human-readable message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// Envelope of `/api/profile`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileEnvelope {
    pub user: UserProfile,
}
