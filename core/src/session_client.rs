//! Async client that owns the session's tokens.
//!
//! # Design
//! `SessionClient` composes the three pieces of the crate: it checks token
//! preconditions against its `TokenPair`, asks `AuthClient` for a request,
//! hands it to the `Transport`, parses the response, and applies the token
//! side effect of the operation. Only login, refresh, logout, logout-all and
//! `reset` change the tokens.
//!
//! Operations take `&self` and may run concurrently. The token lock is never
//! held across an `.await`, so overlapping mutating calls resolve
//! last-writer-wins in response completion order.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::client::{AuthClient, Mode};
use crate::config::ClientConfig;
use crate::error::{ApiError, Operation, TokenKind, TransportError};
use crate::http::{HttpRequest, HttpResponse};
use crate::session::TokenPair;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    AuditLog, ComparisonResponse, Credentials, HealthStatus, LoginResponse, RefreshResponse,
    RegisterRequest, UserProfile,
};

pub struct SessionClient<T = ReqwestTransport> {
    api: AuthClient,
    transport: T,
    tokens: Mutex<TokenPair>,
}

impl SessionClient<ReqwestTransport> {
    /// Client over a fresh `reqwest` transport.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Ok(Self::new(AuthClient::from_config(config), ReqwestTransport::new()?))
    }
}

impl<T: Transport> SessionClient<T> {
    pub fn new(api: AuthClient, transport: T) -> Self {
        Self {
            api,
            transport,
            tokens: Mutex::new(TokenPair::default()),
        }
    }

    pub fn api(&self) -> &AuthClient {
        &self.api
    }

    // -----------------------------------------------------------------------
    // Token accessors
    // -----------------------------------------------------------------------

    /// Snapshot of the stored tokens.
    pub fn tokens(&self) -> TokenPair {
        self.lock_tokens().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock_tokens().access_token().map(str::to_string)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.lock_tokens().refresh_token().map(str::to_string)
    }

    pub fn has_access_token(&self) -> bool {
        self.lock_tokens().has_access_token()
    }

    /// Forget both tokens without contacting the server.
    pub fn reset(&self) {
        self.lock_tokens().clear();
        info!("session reset");
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    pub async fn check_health(&self) -> Result<HealthStatus, ApiError> {
        let response = self.send(Operation::Health, self.api.build_health()).await?;
        self.api.parse_health(response)
    }

    pub async fn register(&self, input: &RegisterRequest) -> Result<String, ApiError> {
        let request = self.api.build_register(input)?;
        let response = self.send(Operation::Register, request).await?;
        self.api.parse_register(response)
    }

    /// On success the returned tokens replace whatever was stored.
    pub async fn login(&self, credentials: &Credentials, mode: Mode) -> Result<LoginResponse, ApiError> {
        let request = self.api.build_login(credentials, mode)?;
        let response = self.send(Operation::Login, request).await?;
        let login = self.api.parse_login(response)?;

        self.lock_tokens()
            .replace(login.access_token.clone(), login.refresh_token.clone());
        info!(%mode, user = %login.user.username, "logged in; tokens stored");
        Ok(login)
    }

    /// On success only the access token is replaced.
    pub async fn refresh(&self, mode: Mode) -> Result<RefreshResponse, ApiError> {
        let refresh_token = self.require(TokenKind::Refresh, Operation::Refresh)?;
        let request = self.api.build_refresh(mode, &refresh_token);
        let response = self.send(Operation::Refresh, request).await?;
        let refreshed = self.api.parse_refresh(response)?;

        self.lock_tokens().set_access_token(refreshed.access_token.clone());
        info!(%mode, "access token refreshed");
        Ok(refreshed)
    }

    /// On success both tokens are cleared.
    pub async fn logout(&self, mode: Mode) -> Result<String, ApiError> {
        let access_token = self.require(TokenKind::Access, Operation::Logout)?;
        let request = self.api.build_logout(mode, &access_token);
        let response = self.send(Operation::Logout, request).await?;
        let message = self.api.parse_logout(response)?;

        self.lock_tokens().clear();
        info!(%mode, "logged out; tokens cleared");
        Ok(message)
    }

    /// Revoke every session of the current user. On success both local
    /// tokens are cleared.
    pub async fn logout_all(&self, mode: Mode) -> Result<String, ApiError> {
        let access_token = self.require(TokenKind::Access, Operation::LogoutAll)?;
        let request = self.api.build_logout_all(mode, &access_token);
        let response = self.send(Operation::LogoutAll, request).await?;
        let message = self.api.parse_logout_all(response)?;

        self.lock_tokens().clear();
        info!(%mode, "all sessions closed; tokens cleared");
        Ok(message)
    }

    pub async fn get_profile(&self) -> Result<UserProfile, ApiError> {
        let access_token = self.require(TokenKind::Access, Operation::Profile)?;
        let response = self
            .send(Operation::Profile, self.api.build_profile(&access_token))
            .await?;
        self.api.parse_profile(response)
    }

    pub async fn audit_log(&self, mode: Mode, limit: Option<u32>) -> Result<AuditLog, ApiError> {
        let access_token = self.require(TokenKind::Access, Operation::AuditLog)?;
        let request = self.api.build_audit_log(mode, &access_token, limit);
        let response = self.send(Operation::AuditLog, request).await?;
        self.api.parse_audit_log(response)
    }

    /// The server logs in against both backends and times them. Stored
    /// tokens are left untouched.
    pub async fn compare_performance(
        &self,
        credentials: &Credentials,
    ) -> Result<ComparisonResponse, ApiError> {
        let request = self.api.build_compare(credentials)?;
        let response = self.send(Operation::Compare, request).await?;
        self.api.parse_compare(response)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Clone the needed token out of the lock, or fail before any I/O.
    fn require(&self, kind: TokenKind, operation: Operation) -> Result<String, ApiError> {
        let tokens = self.lock_tokens();
        let token = match kind {
            TokenKind::Access => tokens.access_token(),
            TokenKind::Refresh => tokens.refresh_token(),
        };
        match token {
            Some(t) => Ok(t.to_string()),
            None => {
                warn!(%operation, "no {kind} token stored");
                Err(ApiError::MissingToken(kind))
            }
        }
    }

    async fn send(&self, operation: Operation, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, url = %request.url, "dispatching request");
        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|source| ApiError::Transport { operation, source })?;
        debug!(status = response.status, %operation, "request completed");
        Ok(response)
    }

    fn lock_tokens(&self) -> MutexGuard<'_, TokenPair> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
