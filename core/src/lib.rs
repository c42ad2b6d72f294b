//! Async client core for a JWT authentication API.
//!
//! # Overview
//! Wraps every call of the auth service (health, register, login, refresh,
//! logout, profile, audit log, SQL-vs-Redis performance comparison) behind a
//! named async operation, and owns the session's access/refresh token pair.
//!
//! # Design
//! - `AuthClient` is stateless. It builds `HttpRequest` values and parses
//!   `HttpResponse` values without touching the network.
//! - `Transport` performs the round-trip; `ReqwestTransport` is the default.
//! - `SessionClient` ties them together and is the only owner of the
//!   `TokenPair`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod session_client;
pub mod transport;
pub mod types;

pub use client::{AuthClient, Mode};
pub use config::{ClientConfig, Timeouts};
pub use error::{ApiError, ErrorKind, Operation, TokenKind, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::TokenPair;
pub use session_client::SessionClient;
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    AuditEntry, AuditLog, ComparisonResponse, ComparisonResult, Credentials, ErrorBody, HealthStatus,
    LoginResponse, PerformanceAnalysis, RefreshResponse, RegisterRequest, UserProfile,
};
